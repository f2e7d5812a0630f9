//! Just enough IRC to sit in one channel and report what happens there.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::io;
use tokio::net::TcpStream;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Framed};

use crate::{
    action::display_name,
    config::ServerAddr,
    supervisor::{Connector, EventSource},
};

const MAX_LINE: usize = 8 * 1024;

/// A protocol event the bridge turns into an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Message { user: String, text: String },
    Joined { user: String },
    Left { user: String },
    Quit { user: String },
}

/* ---------------- wire message ---------------- */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix:  Option<String>,
    pub command: String,
    pub params:  Vec<String>,
}

impl Message {
    /// Parses `[:prefix] COMMAND [params...] [:trailing]`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (p, r) = stripped.split_once(' ')?;
            prefix = Some(p.to_string());
            rest = r;
        }
        let rest = rest.trim_start_matches(' ');
        let (head, trailing) = match rest.split_once(" :") {
            Some((h, t)) => (h, Some(t)),
            None => (rest, None),
        };
        let mut words = head.split(' ').filter(|w| !w.is_empty());
        let command = words.next()?.to_ascii_uppercase();
        let mut params: Vec<String> = words.map(str::to_string).collect();
        if let Some(t) = trailing {
            params.push(t.to_string());
        }
        Some(Self { prefix, command, params })
    }

    fn param(&self, i: usize) -> Option<&str> { self.params.get(i).map(String::as_str) }
}

/* ---------------- connection ---------------- */

#[derive(Debug, Clone)]
pub struct IrcConnector {
    pub server:   ServerAddr,
    pub channel:  String,
    pub nickname: String,
}

#[async_trait]
impl Connector for IrcConnector {
    type Session = IrcSession;

    async fn connect(&mut self) -> io::Result<IrcSession> {
        let stream = TcpStream::connect((self.server.host.as_str(), self.server.port)).await?;
        IrcSession::start(stream, &self.channel, &self.nickname).await
    }

    fn describe(&self) -> String { self.server.to_string() }
}

pub struct IrcSession {
    framed:     Framed<TcpStream, AnyDelimiterCodec>,
    channel:    String,
    nickname:   String,
    registered: bool,
}

impl IrcSession {
    async fn start(stream: TcpStream, channel: &str, nickname: &str) -> io::Result<Self> {
        let codec = AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\r\n".to_vec(), MAX_LINE);
        let mut session = Self {
            framed: Framed::new(stream, codec),
            channel: channel.to_string(),
            nickname: nickname.to_string(),
            registered: false,
        };
        session.send(&format!("NICK {}", session.nickname)).await?;
        session.send(&format!("USER {} 0 * :{}", session.nickname, session.nickname)).await?;
        Ok(session)
    }

    async fn send(&mut self, line: &str) -> io::Result<()> {
        tracing::trace!(line, "irc >>");
        self.framed.send(line).await.map_err(codec_err)
    }

    fn is_self(&self, prefix: Option<&str>) -> bool {
        prefix.is_some_and(|p| display_name(p).eq_ignore_ascii_case(&self.nickname))
    }

    fn is_our_channel(&self, target: Option<&str>) -> bool {
        target.is_some_and(|t| t.eq_ignore_ascii_case(&self.channel))
    }

    /// Answers protocol housekeeping and maps channel activity to events.
    async fn handle(&mut self, msg: Message) -> io::Result<Option<ChatEvent>> {
        let user = msg.prefix.clone().unwrap_or_default();
        let event = match msg.command.as_str() {
            "PING" => {
                let token = msg.param(0).unwrap_or_default().to_string();
                self.send(&format!("PONG :{token}")).await?;
                None
            }
            "001" => {
                self.registered = true;
                tracing::info!("Connected to server as {}", self.nickname);
                let join = format!("JOIN {}", self.channel);
                self.send(&join).await?;
                None
            }
            "433" if !self.registered => {
                self.nickname.push('_');
                tracing::warn!(nick = %self.nickname, "nickname in use, retrying");
                let nick = format!("NICK {}", self.nickname);
                self.send(&nick).await?;
                None
            }
            "JOIN" if self.is_our_channel(msg.param(0)) => {
                if self.is_self(msg.prefix.as_deref()) {
                    tracing::info!("Joined channel {}", self.channel);
                    None
                } else {
                    Some(ChatEvent::Joined { user })
                }
            }
            "PART" if self.is_our_channel(msg.param(0)) && !self.is_self(msg.prefix.as_deref()) => {
                Some(ChatEvent::Left { user })
            }
            "QUIT" if !self.is_self(msg.prefix.as_deref()) => Some(ChatEvent::Quit { user }),
            "PRIVMSG" if self.is_our_channel(msg.param(0)) => msg
                .param(1)
                .filter(|text| !is_ctcp(text))
                .map(|text| ChatEvent::Message { user, text: text.to_string() }),
            _ => None,
        };
        Ok(event)
    }
}

#[async_trait]
impl EventSource for IrcSession {
    async fn next_event(&mut self) -> io::Result<Option<ChatEvent>> {
        while let Some(chunk) = self.framed.next().await {
            let chunk = chunk.map_err(codec_err)?;
            let line = String::from_utf8_lossy(&chunk);
            tracing::trace!(line = %line, "irc <<");
            let Some(msg) = Message::parse(&line) else { continue };
            if let Some(event) = self.handle(msg).await? {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }
}

/// CTCP requests (`\x01ACTION waves\x01`, `\x01VERSION\x01`) are not channel text.
fn is_ctcp(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('\x01') && text.ends_with('\x01')
}

fn codec_err(e: AnyDelimiterCodecError) -> io::Error {
    match e {
        AnyDelimiterCodecError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
    }
}
