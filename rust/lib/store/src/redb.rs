use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use academy_core::{merge_fields, new_id};
use redb::{Database, ReadableTable, TableDefinition};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::hub::{snapshot_event, Hub, Subscription};
use crate::path;
use crate::traits::{ensure_object, BoxFuture, DocumentStore};

/// Full record path → JSON document bytes.
const DOCS: TableDefinition<&str, &[u8]> = TableDefinition::new("docs");

/// Persistent document store backed by redb, a pure-Rust embedded
/// key-value database.
///
/// Each record is one row keyed by its full path (`complaints/{key}`).
/// A partial update is a read-merge-write inside one write transaction.
/// Fan-out runs after commit while the store's write lock is still held,
/// so subscribers see snapshots in commit order.
pub struct RedbStore {
    db: Arc<Database>,
    hub: Arc<Hub>,
    write_lock: Mutex<()>,
}

fn storage<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Storage(e.to_string())
}

fn decode(path: &str, bytes: &[u8]) -> Result<Value, StoreError> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Serialization(format!("{path}: {e}")))
}

fn encode(value: &Value) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(storage)?;

        // Ensure the table exists by doing a write transaction.
        let write_txn = db.begin_write().map_err(storage)?;
        {
            let _table = write_txn.open_table(DOCS).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        Ok(Self {
            db: Arc::new(db),
            hub: Hub::new(),
            write_lock: Mutex::new(()),
        })
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.hub.len()
    }

    /// Read every document at or below `base` and assemble its value.
    fn value_at(&self, base: &str) -> Result<Option<Value>, StoreError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(DOCS).map_err(storage)?;

        let mut entries: Vec<(String, Value)> = Vec::new();
        for entry in table.range(base..).map_err(storage)? {
            let (key, value) = entry.map_err(storage)?;
            let key = key.value();
            if !key.starts_with(base) {
                break;
            }
            if path::is_under(key, base) {
                entries.push((key.to_string(), decode(key, value.value())?));
            }
        }
        Ok(path::assemble(
            base,
            entries.iter().map(|(k, v)| (k.as_str(), v)),
        ))
    }

    /// Push fresh snapshots for `changed`. Caller holds `write_lock`.
    fn fan_out(&self, changed: &str) {
        for watched in self.hub.watched_paths(changed) {
            let event = self
                .value_at(&watched)
                .and_then(|value| snapshot_event(&watched, value));
            if let Err(e) = &event {
                tracing::error!("snapshot of {watched} failed: {e}");
            }
            self.hub.publish(&watched, event);
        }
    }

    fn subscribe_now(&self, raw: &str) -> Result<Subscription, StoreError> {
        let path = path::normalize(raw)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let sub = self.hub.register(&path);
        let event = self
            .value_at(&path)
            .and_then(|value| snapshot_event(&path, value));
        self.hub.send_to(sub.id(), event);
        Ok(sub)
    }

    fn create_now(&self, raw: &str, record: Value) -> Result<String, StoreError> {
        let collection = path::normalize(raw)?;
        ensure_object(&record)?;
        let key = new_id();
        let full = path::join(&collection, &key);
        let bytes = encode(&record)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(DOCS).map_err(storage)?;
            table.insert(full.as_str(), bytes.as_slice()).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        self.fan_out(&full);
        Ok(key)
    }

    fn update_now(&self, raw: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let full = path::normalize(raw)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(DOCS).map_err(storage)?;
            let mut doc = match table.get(full.as_str()).map_err(storage)? {
                Some(existing) => decode(&full, existing.value())?,
                None => return Err(StoreError::NotFound(full)),
            };
            merge_fields(&mut doc, &fields);
            let bytes = encode(&doc)?;
            table.insert(full.as_str(), bytes.as_slice()).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        self.fan_out(&full);
        Ok(())
    }

    fn remove_now(&self, raw: &str) -> Result<(), StoreError> {
        let full = path::normalize(raw)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let write_txn = self.db.begin_write().map_err(storage)?;
        let removed = {
            let mut table = write_txn.open_table(DOCS).map_err(storage)?;
            let mut doomed = Vec::new();
            for entry in table.range(full.as_str()..).map_err(storage)? {
                let (key, _) = entry.map_err(storage)?;
                let key = key.value();
                if !key.starts_with(full.as_str()) {
                    break;
                }
                if path::is_under(key, &full) {
                    doomed.push(key.to_string());
                }
            }
            for key in &doomed {
                table.remove(key.as_str()).map_err(storage)?;
            }
            doomed.len()
        };
        write_txn.commit().map_err(storage)?;

        if removed > 0 {
            self.fan_out(&full);
        }
        Ok(())
    }
}

impl Drop for RedbStore {
    fn drop(&mut self) {
        self.hub.close();
    }
}

impl DocumentStore for RedbStore {
    fn subscribe<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Subscription, StoreError>> {
        Box::pin(async move { self.subscribe_now(path) })
    }

    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<Value>, StoreError>> {
        Box::pin(async move {
            let path = path::normalize(path)?;
            self.value_at(&path)
        })
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_temp() -> (RedbStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(&dir.path().join("academy.redb")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn crud_lifecycle() {
        let (store, _dir) = open_temp();

        let key = store
            .create_with_generated_key(
                "countries",
                json!({"countryName": "Jordan", "studentCount": 4, "isActive": true}),
            )
            .await
            .unwrap();
        let path = format!("countries/{key}");

        let mut patch = Map::new();
        patch.insert("isActive".into(), json!(false));
        store.update(&path, patch).await.unwrap();

        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc["isActive"], json!(false));
        assert_eq!(doc["studentCount"], json!(4));

        let all = store.get("countries").await.unwrap().unwrap();
        assert_eq!(all.as_object().unwrap().len(), 1);

        store.remove(&path).await.unwrap();
        assert!(store.get(&path).await.unwrap().is_none());
        assert!(store.get("countries").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let (store, _dir) = open_temp();
        let err = store.update("rules/none", Map::new()).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound("rules/none".into()));
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("academy.redb");
        let key = {
            let store = RedbStore::open(&db_path).unwrap();
            store
                .create_with_generated_key("rules", json!({"title": "No phones"}))
                .await
                .unwrap()
        };
        let store = RedbStore::open(&db_path).unwrap();
        let doc = store.get(&format!("rules/{key}")).await.unwrap().unwrap();
        assert_eq!(doc["title"], "No phones");
    }

    #[tokio::test]
    async fn subscription_sees_writes_in_order() {
        let (store, _dir) = open_temp();
        let mut sub = store.subscribe("invoices").await.unwrap();
        assert!(!sub.next().await.unwrap().unwrap().exists());

        let k1 = store
            .create_with_generated_key("invoices", json!({"amount": 60}))
            .await
            .unwrap();
        let k2 = store
            .create_with_generated_key("invoices", json!({"amount": 120}))
            .await
            .unwrap();

        let s1 = sub.next().await.unwrap().unwrap();
        assert_eq!(s1.children().len(), 1);
        let s2 = sub.next().await.unwrap().unwrap();
        let keys: Vec<String> = s2.children().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&k1) && keys.contains(&k2));
    }

    #[tokio::test]
    async fn remove_prefix_does_not_touch_neighbours() {
        let (store, _dir) = open_temp();
        store
            .create_with_generated_key("test", json!({"a": 1}))
            .await
            .unwrap();
        store
            .create_with_generated_key("testReports", json!({"score": 9}))
            .await
            .unwrap();
        store.remove("test").await.unwrap();
        assert!(store.get("test").await.unwrap().is_none());
        assert!(store.get("testReports").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn drop_subscription_unregisters() {
        let (store, _dir) = open_temp();
        let sub = store.subscribe("rules").await.unwrap();
        assert_eq!(store.subscriber_count(), 1);
        drop(sub);
        assert_eq!(store.subscriber_count(), 0);
    }
}
