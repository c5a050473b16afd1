use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::hub::Subscription;

/// A boxed, `Send`-able future returned by store operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One item on a subscription stream.
pub type SnapshotEvent = Result<Snapshot, StoreError>;

/// The full current value at a subscribed path.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: String,
    /// `None` when nothing is stored at or below `path`.
    pub value: Option<Value>,
}

impl Snapshot {
    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    /// Child entries of an object value, as `(key, value)` pairs.
    ///
    /// For a collection path these are the records keyed by their generated
    /// identity. Non-object values have no children.
    pub fn children(&self) -> Vec<(String, Value)> {
        match &self.value {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Vec::new(),
        }
    }
}

/// The realtime store as consumed by the admin core.
///
/// Every operation is asynchronous: initiating it returns a future and the
/// caller resumes when the store settles. Implementations must deliver
/// snapshots to each subscriber in write order.
pub trait DocumentStore: Send + Sync {
    /// Open a live subscription on `path`.
    ///
    /// The current value is delivered first, then a fresh snapshot after
    /// every change at, below, or above `path`. Dropping the returned handle
    /// unsubscribes.
    fn subscribe<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Subscription, StoreError>>;

    /// One-shot read of the value at `path`.
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<Value>, StoreError>>;

    /// Append `record` under a new opaque key in `collection`; returns the key.
    fn create_with_generated_key<'a>(
        &'a self,
        collection: &'a str,
        record: Value,
    ) -> BoxFuture<'a, Result<String, StoreError>>;

    /// Merge `fields` into the record at `record_path`. Fields not named are
    /// left as they are; a `null` field is removed.
    fn update<'a>(
        &'a self,
        record_path: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Delete the value at `path` and everything below it.
    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// Reject anything but a JSON object as a record body.
pub(crate) fn ensure_object(record: &Value) -> Result<(), StoreError> {
    if record.is_object() {
        Ok(())
    } else {
        Err(StoreError::Serialization(format!(
            "record must be a JSON object, got {record}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_children() {
        let snap = Snapshot {
            path: "rules".into(),
            value: Some(json!({"a": {"title": "x"}, "b": {"title": "y"}})),
        };
        let children = snap.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].0, "a");
        assert!(snap.exists());
    }

    #[test]
    fn empty_snapshot_has_no_children() {
        let snap = Snapshot {
            path: "rules".into(),
            value: None,
        };
        assert!(snap.children().is_empty());
        assert!(!snap.exists());
    }

    #[test]
    fn only_objects_are_records() {
        assert!(ensure_object(&json!({"a": 1})).is_ok());
        assert!(ensure_object(&json!([1, 2])).is_err());
        assert!(ensure_object(&json!("text")).is_err());
    }
}
