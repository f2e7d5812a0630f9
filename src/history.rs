//! Bounded in-memory history of recent actions, backed by an append-only
//! JSON-lines log that is never truncated.
//!
//! The log is read once at startup. Every later event is appended to the log
//! first and only then pushed into the cache, so the cache is always a suffix
//! of what is on disk.

use std::{
    collections::VecDeque,
    path::PathBuf,
};
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};

use crate::{
    action::Action,
    error::{AppErr, AppResult},
};

pub const DEFAULT_CAPACITY: usize = 500;

#[derive(Debug)]
pub struct HistoryStore {
    path:     PathBuf,
    capacity: usize,
    cache:    VecDeque<Action>,
}

impl HistoryStore {
    /// Reads the whole log and keeps the last `capacity` parseable lines.
    ///
    /// A log that cannot be opened gives an empty history. Lines that are not
    /// a valid action are skipped.
    pub async fn load(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let mut store = Self { path, capacity, cache: VecDeque::new() };

        let file = match File::open(&store.path).await {
            Ok(f) => f,
            Err(e) => {
                tracing::info!(path = %store.path.display(), error = %e, "no history loaded");
                return store;
            }
        };

        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        let (mut parsed, mut skipped) = (0usize, 0usize);
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %store.path.display(), error = %e, "history read stopped early");
                    break;
                }
            }
            match serde_json::from_slice::<Action>(trim_line(&line)) {
                Ok(action) => {
                    parsed += 1;
                    store.push(action);
                }
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(error = %e, "skipping malformed history line");
                }
            }
        }

        tracing::info!(
            path = %store.path.display(),
            parsed, skipped, cached = store.cache.len(),
            "history loaded"
        );
        store
    }

    /// Appends to the log, then to the cache. A failed write leaves the cache
    /// untouched.
    pub async fn append(&mut self, action: Action) -> AppResult<()> {
        let mut line = serde_json::to_vec(&action)?;
        line.push(b'\n');
        self.write_line(&line).await.map_err(|source| AppErr::HistoryWrite {
            path: self.path.clone(),
            source,
        })?;
        self.push(action);
        Ok(())
    }

    /// Cached actions, oldest first.
    pub fn snapshot(&self) -> Vec<Action> {
        self.cache.iter().cloned().collect()
    }

    pub fn len(&self) -> usize { self.cache.len() }
    pub fn is_empty(&self) -> bool { self.cache.is_empty() }

    fn push(&mut self, action: Action) {
        self.cache.push_back(action);
        while self.cache.len() > self.capacity {
            self.cache.pop_front();
        }
    }

    async fn write_line(&self, line: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line).await?;
        file.flush().await
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
