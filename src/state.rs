use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{history::HistoryStore, hub::BroadcastHub, utils::auth::Credentials};

/* ------------ recent channel history -------------- */
pub type SharedHistory = Arc<Mutex<HistoryStore>>;

pub fn shared_history(store: HistoryStore) -> SharedHistory { Arc::new(Mutex::new(store)) }

/* ------------ what the HTTP handlers see -------------- */
#[derive(Clone)]
pub struct AppState {
    pub history: SharedHistory,
    pub hub:     Arc<BroadcastHub>,
    pub auth:    Option<Arc<Credentials>>,
}

impl AppState {
    pub fn new(history: SharedHistory, hub: Arc<BroadcastHub>, auth: Option<Credentials>) -> Self {
        Self { history, hub, auth: auth.map(Arc::new) }
    }

    pub fn credentials(&self) -> Option<&Credentials> { self.auth.as_deref() }
}
