use clap::Parser;
use std::{fmt, net::SocketAddr, path::PathBuf};

use crate::{
    error::{config, AppResult},
    history::DEFAULT_CAPACITY,
    utils::auth::Credentials,
};

pub const DEFAULT_IRC_PORT: u16 = 6667;

/// Relay an IRC channel to web browsers using long-polling.
#[derive(Debug, Parser)]
#[command(name = "irc-viewer", version)]
pub struct Cli {
    /// IRC server as hostname[:port]
    #[arg(env = "IRCVIEWER_SERVER")]
    pub server: String,

    /// Channel to join (leading '#' optional)
    #[arg(env = "IRCVIEWER_CHANNEL")]
    pub channel: String,

    /// Port to run the HTTP server on
    #[arg(short, long, env = "IRCVIEWER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind the HTTP server to
    #[arg(long, env = "IRCVIEWER_BIND", default_value = "0.0.0.0")]
    pub bind: std::net::IpAddr,

    /// IRC bot nickname
    #[arg(short, long, env = "IRCVIEWER_NICK", default_value = "IRCViewer")]
    pub nick: String,

    /// Authentication as user:password
    #[arg(short, long, env = "IRCVIEWER_AUTH")]
    pub auth: Option<String>,

    /// Append-only JSON-lines history log
    #[arg(long, env = "IRCVIEWER_HISTORY_FILE", default_value = "irc-history.log")]
    pub history_file: PathBuf,

    /// Number of recent actions kept in memory and served from /history.js
    #[arg(long, env = "IRCVIEWER_HISTORY_SIZE", default_value_t = DEFAULT_CAPACITY)]
    pub history_size: usize,

    /// Directory served for everything that isn't an API route
    #[arg(long, env = "IRCVIEWER_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
}

impl ServerAddr {
    pub fn parse(s: &str) -> AppResult<Self> {
        let invalid = || config("invalid IRC host/port, use format hostname[:port]");
        let (host, port) = match s.split_once(':') {
            Some((h, p)) => (h, p.parse::<u16>().map_err(|_| invalid())?),
            None => (s, DEFAULT_IRC_PORT),
        };
        if host.is_empty() {
            return Err(invalid());
        }
        Ok(Self { host: host.to_string(), port })
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server:       ServerAddr,
    pub channel:      String,
    pub nickname:     String,
    pub http_addr:    SocketAddr,
    pub auth:         Option<Credentials>,
    pub history_file: PathBuf,
    pub history_size: usize,
    pub static_dir:   PathBuf,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> AppResult<Self> {
        let channel = normalize_channel(&cli.channel)?;
        let auth = cli.auth.as_deref().map(Credentials::parse).transpose()?;
        if cli.nick.trim().is_empty() || cli.nick.contains(' ') {
            return Err(config("invalid nickname"));
        }
        Ok(Self {
            server: ServerAddr::parse(&cli.server)?,
            channel,
            nickname: cli.nick,
            http_addr: SocketAddr::new(cli.bind, cli.port),
            auth,
            history_file: cli.history_file,
            history_size: cli.history_size,
            static_dir: cli.static_dir,
        })
    }
}

pub fn normalize_channel(raw: &str) -> AppResult<String> {
    let name = raw.trim().trim_start_matches('#');
    if name.is_empty() || name.contains([' ', ',']) {
        return Err(config("invalid or missing IRC channel"));
    }
    Ok(format!("#{name}"))
}
