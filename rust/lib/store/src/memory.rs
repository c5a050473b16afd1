use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use academy_core::{merge_fields, new_id};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::StoreError;
use crate::hub::{snapshot_event, Hub, Subscription};
use crate::path;
use crate::traits::{ensure_object, BoxFuture, DocumentStore};

/// In-process document store.
///
/// Documents live in a `BTreeMap` keyed by full record path, so a
/// collection is one ordered prefix range. Writes and their fan-out happen
/// under the same lock, which keeps snapshot order equal to write order.
///
/// The store can be switched offline to model an unreachable backend:
/// writes fail with `Unavailable` and new subscriptions receive nothing
/// until the next successful write touches their path.
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Value>>,
    hub: Arc<Hub>,
    offline: AtomicBool,
    /// Count of write calls issued (create/update/remove), successful or not.
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(BTreeMap::new()),
            hub: Hub::new(),
            offline: AtomicBool::new(false),
            writes: AtomicU64::new(0),
        }
    }

    /// Simulate losing (or regaining) the connection to the backend.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of write calls received so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.hub.len()
    }

    fn check_online(&self, action: &str) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            warn!("{action} rejected: store offline");
            return Err(StoreError::Unavailable(format!("{action} while offline")));
        }
        Ok(())
    }

    fn value_at(docs: &BTreeMap<String, Value>, base: &str) -> Option<Value> {
        let entries = docs
            .range(base.to_string()..)
            .take_while(|(k, _)| k.starts_with(base))
            .map(|(k, v)| (k.as_str(), v));
        path::assemble(base, entries)
    }

    /// Push a fresh snapshot to every subscriber affected by `changed`.
    /// Must be called with the docs lock held.
    fn fan_out(&self, docs: &BTreeMap<String, Value>, changed: &str) {
        for watched in self.hub.watched_paths(changed) {
            let value = Self::value_at(docs, &watched);
            self.hub.publish(&watched, snapshot_event(&watched, value));
        }
    }

    fn subscribe_now(&self, raw: &str) -> Result<Subscription, StoreError> {
        let path = path::normalize(raw)?;
        let docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        let sub = self.hub.register(&path);
        if !self.offline.load(Ordering::SeqCst) {
            self.hub
                .send_to(sub.id(), snapshot_event(&path, Self::value_at(&docs, &path)));
        }
        Ok(sub)
    }

    fn get_now(&self, raw: &str) -> Result<Option<Value>, StoreError> {
        let path = path::normalize(raw)?;
        self.check_online("get")?;
        let docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Self::value_at(&docs, &path))
    }

    fn create_now(&self, raw: &str, record: Value) -> Result<String, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let collection = path::normalize(raw)?;
        ensure_object(&record)?;
        self.check_online("create")?;

        let key = new_id();
        let full = path::join(&collection, &key);
        let mut docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        docs.insert(full.clone(), record);
        self.fan_out(&docs, &full);
        Ok(key)
    }

    fn update_now(&self, raw: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let full = path::normalize(raw)?;
        self.check_online("update")?;

        let mut docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        let doc = docs
            .get_mut(&full)
            .ok_or_else(|| StoreError::NotFound(full.clone()))?;
        merge_fields(doc, &fields);
        self.fan_out(&docs, &full);
        Ok(())
    }

    fn remove_now(&self, raw: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let full = path::normalize(raw)?;
        self.check_online("remove")?;

        let mut docs = self.docs.lock().unwrap_or_else(PoisonError::into_inner);
        let doomed: Vec<String> = docs
            .range(full.clone()..)
            .take_while(|(k, _)| k.starts_with(&full))
            .filter(|(k, _)| path::is_under(k, &full))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            docs.remove(key);
        }
        if !doomed.is_empty() {
            self.fan_out(&docs, &full);
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.hub.close();
    }
}

impl DocumentStore for MemoryStore {
    fn subscribe<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Subscription, StoreError>> {
        Box::pin(async move { self.subscribe_now(path) })
    }

    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<Value>, StoreError>> {
        Box::pin(async move { self.get_now(path) })
    }

    fn create_with_generated_key<'a>(
        &'a self,
        collection: &'a str,
        record: Value,
    ) -> BoxFuture<'a, Result<String, StoreError>> {
        Box::pin(async move { self.create_now(collection, record) })
    }

    fn update<'a>(
        &'a self,
        record_path: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move { self.update_now(record_path, fields) })
    }

    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move { self.remove_now(path) })
    }
}
