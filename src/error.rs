use axum::{http::StatusCode, response::IntoResponse};
use std::{fmt::Display, path::PathBuf};

pub type AppResult<T> = Result<T, AppErr>;

#[derive(thiserror::Error, Debug)]
pub enum AppErr {
    #[error("{0}")]
    Config(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not connect to {server}: {source}")]
    Connect {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not append to history file {}: {source}", .path.display())]
    HistoryWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IntoResponse for AppErr {
    fn into_response(self) -> axum::response::Response {
        let (code, body) = match self {
            AppErr::Config(msg) => (StatusCode::BAD_REQUEST, msg),
            other               => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        (code, body).into_response()
    }
}

/* ── helper: turn any displayable error into a config error ── */
pub fn config<E: Display>(e: E) -> AppErr { AppErr::Config(e.to_string()) }
