//! Single-shot long-poll fan-out.
//!
//! Each waiting client holds a [`PendingRequest`]. Publishing swaps the whole
//! waiting set out under the lock, then writes to every taken handle after the
//! lock is released. A client registered after the swap waits for the next
//! action instead.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::{action::Action, error::AppResult};

type Waiting = HashMap<Uuid, oneshot::Sender<Arc<str>>>;

#[derive(Debug, Default)]
pub struct BroadcastHub {
    waiting: Mutex<Waiting>,
}

impl BroadcastHub {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    /// Adds a waiting client. Dropping the returned handle unregisters it.
    pub fn register(self: &Arc<Self>) -> PendingRequest {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id, tx);
        tracing::debug!(%id, "long-poll client registered");
        PendingRequest { id, rx, hub: Arc::clone(self) }
    }

    /// Removes a client without delivering anything. Unknown ids are ignored.
    pub fn unregister(&self, id: Uuid) {
        if self.lock().remove(&id).is_some() {
            tracing::debug!(%id, "long-poll client gone");
        }
    }

    /// Delivers `action` to every client waiting right now and empties the
    /// waiting set. Returns how many clients received it.
    pub fn publish(&self, action: &Action) -> AppResult<usize> {
        let payload: Arc<str> = serde_json::to_string(&action.sanitize())?.into();

        let taken = std::mem::take(&mut *self.lock());
        let waiting = taken.len();
        let delivered = taken
            .into_values()
            .map(|tx| tx.send(Arc::clone(&payload)))
            .filter(Result::is_ok)
            .count();

        tracing::debug!(waiting, delivered, "action published");
        Ok(delivered)
    }

    pub fn waiting(&self) -> usize { self.lock().len() }

    fn lock(&self) -> MutexGuard<'_, Waiting> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One open long-poll request.
#[derive(Debug)]
pub struct PendingRequest {
    id:  Uuid,
    rx:  oneshot::Receiver<Arc<str>>,
    hub: Arc<BroadcastHub>,
}

impl PendingRequest {
    pub fn id(&self) -> Uuid { self.id }

    /// Resolves with the serialized sanitized action of the next publish.
    /// `None` only if the hub went away first.
    pub async fn recv(mut self) -> Option<Arc<str>> {
        (&mut self.rx).await.ok()
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Command;
    use std::time::Duration;

    fn action(ts: i64) -> Action {
        Action::at(Command::Message, "alice!a@host", Some("<b>hi</b>".into()), ts)
    }

    #[tokio::test]
    async fn publish_reaches_every_waiting_client_once() {
        let hub = BroadcastHub::new();
        let clients: Vec<_> = (0..3).map(|_| hub.register()).collect();
        assert_eq!(hub.waiting(), 3);

        assert_eq!(hub.publish(&action(1)).unwrap(), 3);
        assert_eq!(hub.waiting(), 0);

        for c in clients {
            let body = c.recv().await.unwrap();
            let v: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(v["user"], "alice");
            assert_eq!(v["message"], "&lt;b&gt;hi&lt;/b&gt;");
            assert_eq!(v["timestamp"], 1);
        }

        // nobody left to deliver to
        assert_eq!(hub.publish(&action(2)).unwrap(), 0);
    }

    #[tokio::test]
    async fn disconnect_before_publish() {
        let hub = BroadcastHub::new();
        let stays = hub.register();
        let leaves = hub.register();
        drop(leaves);
        assert_eq!(hub.waiting(), 1);

        assert_eq!(hub.publish(&action(1)).unwrap(), 1);
        assert!(stays.recv().await.is_some());
    }

    #[tokio::test]
    async fn late_registration_waits_for_next_publish() {
        let hub = BroadcastHub::new();
        let early = hub.register();
        hub.publish(&action(1)).unwrap();

        let late = hub.register();
        assert_eq!(hub.waiting(), 1);
        let late_task = tokio::spawn(late.recv());

        let first: serde_json::Value = serde_json::from_str(&early.recv().await.unwrap()).unwrap();
        assert_eq!(first["timestamp"], 1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!late_task.is_finished());

        hub.publish(&action(2)).unwrap();
        let second: serde_json::Value = serde_json::from_str(&late_task.await.unwrap().unwrap()).unwrap();
        assert_eq!(second["timestamp"], 2);
    }

    #[tokio::test]
    async fn unregister_after_delivery_is_noop() {
        let hub = BroadcastHub::new();
        let c = hub.register();
        let id = c.id();
        hub.publish(&action(1)).unwrap();
        hub.unregister(id);
        hub.unregister(id);
        assert!(c.recv().await.is_some());
        assert_eq!(hub.waiting(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_are_never_lost_or_doubled() {
        let hub = BroadcastHub::new();
        let mut tasks = Vec::new();
        for _ in 0..64 {
            let hub = Arc::clone(&hub);
            tasks.push(tokio::spawn(async move { hub.register().recv().await }));
        }
        // publish repeatedly until every client has been served exactly once
        let mut delivered = 0;
        let mut ts = 0;
        while delivered < 64 {
            ts += 1;
            delivered += hub.publish(&action(ts)).unwrap();
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(delivered, 64);
        for t in tasks {
            assert!(t.await.unwrap().is_some());
        }
        assert_eq!(hub.waiting(), 0);
    }
}
