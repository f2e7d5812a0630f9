use std::sync::Arc;

use crate::{
    action::{display_name, Action, Command},
    error::AppResult,
    hub::BroadcastHub,
    irc::ChatEvent,
    state::SharedHistory,
};

/// Records each channel event, then wakes the waiting clients with it.
#[derive(Clone)]
pub struct ChannelEventBridge {
    history: SharedHistory,
    hub:     Arc<BroadcastHub>,
}

impl ChannelEventBridge {
    pub fn new(history: SharedHistory, hub: Arc<BroadcastHub>) -> Self {
        Self { history, hub }
    }

    pub fn history(&self) -> SharedHistory { Arc::clone(&self.history) }
    pub fn hub(&self) -> Arc<BroadcastHub> { Arc::clone(&self.hub) }

    /// The append is finished before publish starts, so a client woken by
    /// this event already finds it in `/history.js`.
    pub async fn handle(&self, event: ChatEvent) -> AppResult<Action> {
        let action = to_action(event);
        log_action(&action);

        self.history.lock().await.append(action.clone()).await?;
        self.hub.publish(&action)?;
        Ok(action)
    }
}

pub fn to_action(event: ChatEvent) -> Action {
    match event {
        ChatEvent::Message { user, text } => Action::now(Command::Message, user, Some(text)),
        ChatEvent::Joined { user } => Action::now(Command::UserJoined, user, None),
        ChatEvent::Left { user } => Action::now(Command::UserLeft, user, None),
        ChatEvent::Quit { user } => Action::now(Command::UserQuit, user, None),
    }
}

fn log_action(action: &Action) {
    let name = display_name(action.user());
    match action.command() {
        Command::Message => tracing::info!("Message from {}: {}", name, action.message().unwrap_or_default()),
        Command::UserJoined => tracing::info!("{name} joined"),
        Command::UserLeft => tracing::info!("{name} left"),
        Command::UserQuit => tracing::info!("{name} quit"),
    }
}
