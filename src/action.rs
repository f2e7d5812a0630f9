//! Channel events as they are persisted and delivered.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Separates a display name from the rest of a hostmask (`nick!user@host`).
pub const HOSTMASK_DELIMITER: char = '!';

const ENTITIES: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('"', "&quot;"),
    ('\'', "&apos;"),
    ('>', "&gt;"),
    ('<', "&lt;"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    #[serde(alias = "privmsg")]
    Message,
    #[serde(alias = "userjoined")]
    UserJoined,
    #[serde(alias = "userleft")]
    UserLeft,
    #[serde(alias = "userquit")]
    UserQuit,
}

/// One channel event. `message` is only ever set for [`Command::Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ActionRecord")]
pub struct Action {
    command: Command,
    user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    timestamp: i64,
}

/* raw shape of a persisted line, before per-command fields are enforced */
#[derive(Deserialize)]
struct ActionRecord {
    command: Command,
    user: String,
    #[serde(default)]
    message: Option<String>,
    timestamp: i64,
}

impl From<ActionRecord> for Action {
    fn from(r: ActionRecord) -> Self {
        Action::at(r.command, r.user, r.message, r.timestamp)
    }
}

impl Action {
    /// Builds an action with an explicit timestamp, dropping `message` for
    /// commands that carry no text.
    pub fn at(
        command: Command,
        user: impl Into<String>,
        message: Option<String>,
        timestamp: i64,
    ) -> Self {
        let message = match command {
            Command::Message => message,
            _ => None,
        };
        Self { command, user: user.into(), message, timestamp }
    }

    /// Builds an action stamped with the current time.
    pub fn now(command: Command, user: impl Into<String>, message: Option<String>) -> Self {
        Self::at(command, user, message, Utc::now().timestamp())
    }

    pub fn command(&self) -> Command { self.command }
    pub fn user(&self) -> &str { &self.user }
    pub fn message(&self) -> Option<&str> { self.message.as_deref() }
    pub fn timestamp(&self) -> i64 { self.timestamp }

    pub fn display_name(&self) -> &str { display_name(&self.user) }

    pub fn sanitize(&self) -> SanitizedAction {
        SanitizedAction {
            command: self.command,
            user: escape_html(self.display_name()),
            message: self.message.as_deref().map(escape_html),
            timestamp: self.timestamp,
        }
    }
}

/// Outbound form of an [`Action`]: display name only, HTML-escaped strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedAction {
    pub command: Command,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: i64,
}

pub fn display_name(user: &str) -> &str {
    match user.split_once(HOSTMASK_DELIMITER) {
        Some((name, _)) => name,
        None => user,
    }
}

/// Escapes `& " ' > <`. An `&` that already starts one of those entities is
/// kept as is, so escaping twice gives the same text as escaping once.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if c == '&' && ENTITIES.iter().any(|(_, e)| text[i..].starts_with(e)) {
            out.push('&');
            continue;
        }
        match ENTITIES.iter().find(|(ch, _)| *ch == c) {
            Some((_, entity)) => out.push_str(entity),
            None => out.push(c),
        }
    }
    out
}
