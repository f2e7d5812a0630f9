use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use irc_viewer::{
    bridge::ChannelEventBridge,
    config::{Cli, Settings},
    history::HistoryStore,
    hub::BroadcastHub,
    irc::IrcConnector,
    routes,
    state::{shared_history, AppState},
    supervisor::ConnectionSupervisor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::from_cli(Cli::parse())?;

    let history = shared_history(HistoryStore::load(&settings.history_file, settings.history_size).await);
    let hub     = BroadcastHub::new();
    let state   = AppState::new(history.clone(), hub.clone(), settings.auth.clone());

    let app = routes::app(state, &settings.static_dir);
    let listener = tokio::net::TcpListener::bind(settings.http_addr)
        .await
        .with_context(|| format!("binding {}", settings.http_addr))?;
    tracing::info!("Starting HTTP server on {}", settings.http_addr);

    let connector = IrcConnector {
        server:   settings.server.clone(),
        channel:  settings.channel.clone(),
        nickname: settings.nickname.clone(),
    };
    let mut supervisor = ConnectionSupervisor::new(connector, ChannelEventBridge::new(history, hub));

    tokio::select! {
        res = axum::serve(listener, app.into_make_service()) => res.context("HTTP server stopped")?,
        res = supervisor.run() => res?,
    }
    Ok(())
}
