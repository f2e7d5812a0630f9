pub mod action;
pub mod bridge;
pub mod config;
pub mod error;
pub mod history;
pub mod hub;
pub mod irc;
pub mod routes;
pub mod state;
pub mod supervisor;
pub mod utils {
    pub mod auth;
}
