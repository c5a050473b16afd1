use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::debug;

use crate::path;
use crate::traits::{Snapshot, SnapshotEvent};

/// Unique handle for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

struct Subscriber {
    path: String,
    tx: mpsc::UnboundedSender<SnapshotEvent>,
}

/// Subscription registry shared by a store backend and its handles.
///
/// The backend calls [`Hub::watched_paths`] after a write to learn which
/// paths need a fresh snapshot, then [`Hub::publish`] once per path.
/// Handles unregister themselves on drop.
pub struct Hub {
    subscribers: RwLock<HashMap<SubscriptionId, Subscriber>>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a subscriber on `path` and return its handle.
    ///
    /// Nothing is delivered yet; the backend sends the initial snapshot with
    /// [`Hub::send_to`] while it still holds its data lock.
    pub fn register(self: &Arc<Self>, path: &str) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Subscriber {
                    path: path.to_string(),
                    tx,
                },
            );
        debug!("subscription {} opened on {path}", id.0);
        Subscription {
            id,
            path: path.to_string(),
            rx,
            hub: Arc::clone(self),
        }
    }

    fn unregister(&self, id: SubscriptionId) {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(sub) = removed {
            debug!("subscription {} closed on {}", id.0, sub.path);
        }
    }

    /// Deliver an event to one subscriber.
    pub fn send_to(&self, id: SubscriptionId, event: SnapshotEvent) {
        let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(sub) = subscribers.get(&id) {
            let _ = sub.tx.send(event);
        }
    }

    /// Distinct subscribed paths whose value changes when `changed` is written.
    pub fn watched_paths(&self, changed: &str) -> Vec<String> {
        let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
        let mut paths: Vec<String> = subscribers
            .values()
            .filter(|s| path::affects(changed, &s.path))
            .map(|s| s.path.clone())
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }

    /// Deliver an event to every subscriber of exactly `path`.
    pub fn publish(&self, path: &str, event: SnapshotEvent) {
        let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
        for sub in subscribers.values().filter(|s| s.path == path) {
            // A closed receiver means the handle is mid-drop; it unregisters itself.
            let _ = sub.tx.send(event.clone());
        }
    }

    /// Drop every subscriber's sender so pending `next()` calls return `None`.
    pub fn close(&self) {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        if !subscribers.is_empty() {
            debug!("closing {} subscriptions", subscribers.len());
        }
        subscribers.clear();
    }

    /// Number of open subscriptions.
    pub fn len(&self) -> usize {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A live subscription on one path.
///
/// Yields the current value first, then one snapshot per change. Dropping
/// the handle unsubscribes; there is no other way to end it.
pub struct Subscription {
    id: SubscriptionId,
    path: String,
    rx: mpsc::UnboundedReceiver<SnapshotEvent>,
    hub: Arc<Hub>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wait for the next snapshot. Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.rx.recv().await
    }

    /// Take a snapshot if one is already queued.
    pub fn try_next(&mut self) -> Option<SnapshotEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

/// Build the event for `path` from an optional assembled value.
pub(crate) fn snapshot_event(path: &str, value: Option<serde_json::Value>) -> SnapshotEvent {
    Ok(Snapshot {
        path: path.to_string(),
        value,
    })
}
