//! Realtime document store adapter.
//!
//! A path-addressed JSON document store with live subscriptions, in the
//! shape the admin core consumes:
//!
//! - `subscribe(path)`: full value at `path`, now and after every change
//! - `create_with_generated_key(collection, record)`: append under a new key
//! - `update(record_path, fields)`: shallow merge of partial fields
//! - `remove(path)`: delete a record and everything below it
//!
//! # Path Addressing
//!
//! Paths use `/` as separator: `complaints` is a collection,
//! `complaints/{key}` is one record. A subscriber on `complaints` is
//! notified when any record below it changes; a subscriber on
//! `complaints/{key}` is notified when that record (or the whole
//! collection) is written or removed.
//!
//! Two backends share the same subscription hub: [`MemoryStore`] and the
//! embedded, persistent [`RedbStore`].

pub mod error;
pub mod hub;
pub mod memory;
pub mod path;
pub mod redb;
pub mod traits;

pub use error::StoreError;
pub use hub::{Subscription, SubscriptionId};
pub use memory::MemoryStore;
pub use redb::RedbStore;
pub use traits::{BoxFuture, DocumentStore, Snapshot, SnapshotEvent};
