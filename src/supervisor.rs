//! Keeps the chat connection alive for the lifetime of the process.
//!
//! Connecting → Connected on success. The very first attempt failing is
//! fatal (Failed). After that, a dropped connection or a failed reconnect
//! goes straight back to Connecting, with no delay and no limit.

use async_trait::async_trait;
use std::io;

use crate::{
    bridge::ChannelEventBridge,
    error::{AppErr, AppResult},
    irc::ChatEvent,
};

#[async_trait]
pub trait Connector: Send {
    type Session: EventSource;

    async fn connect(&mut self) -> io::Result<Self::Session>;

    /// Human-readable target, for logs and errors.
    fn describe(&self) -> String;
}

#[async_trait]
pub trait EventSource: Send {
    /// Next channel event; `Ok(None)` when the remote end closed.
    async fn next_event(&mut self) -> io::Result<Option<ChatEvent>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Failed,
}

pub struct ConnectionSupervisor<C> {
    connector: C,
    bridge:    ChannelEventBridge,
    state:     ConnectionState,
}

impl<C: Connector> ConnectionSupervisor<C> {
    pub fn new(connector: C, bridge: ChannelEventBridge) -> Self {
        Self { connector, bridge, state: ConnectionState::Connecting }
    }

    pub fn state(&self) -> ConnectionState { self.state }

    /// Runs until the first connect attempt fails or an event cannot be
    /// recorded. Never returns `Ok`.
    pub async fn run(&mut self) -> AppResult<()> {
        let mut connected_once = false;
        loop {
            self.state = ConnectionState::Connecting;
            let mut session = match self.connector.connect().await {
                Ok(s) => s,
                Err(source) if !connected_once => {
                    self.state = ConnectionState::Failed;
                    tracing::error!("Could not connect ({source})");
                    return Err(AppErr::Connect { server: self.connector.describe(), source });
                }
                Err(e) => {
                    tracing::warn!("Reconnect failed ({e}), retrying...");
                    // let the HTTP side run between back-to-back failures
                    tokio::task::yield_now().await;
                    continue;
                }
            };
            connected_once = true;
            self.state = ConnectionState::Connected;
            tracing::debug!(server = %self.connector.describe(), "connected");

            let reason = loop {
                match session.next_event().await {
                    Ok(Some(event)) => {
                        if let Err(e) = self.bridge.handle(event).await {
                            self.state = ConnectionState::Failed;
                            return Err(e);
                        }
                    }
                    Ok(None) => break "connection closed by server".to_string(),
                    Err(e) => break e.to_string(),
                }
            };
            tracing::warn!("Lost connection ({reason})");
            tracing::warn!("Reconnecting to server...");
        }
    }
}
