//! List views: the full set of one collection plus the derived, filtered
//! and sorted view of it.
//!
//! [`ListModel`] is the synchronous state (full set, query, statistics).
//! [`ListView`] owns a live subscription and feeds each snapshot into a
//! shared model from a background task.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use academy_core::ServiceError;
use academy_store::{DocumentStore, Snapshot, Subscription};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::entity::{compare, Entity, Keyed, Label};

/// Filter value meaning "no constraint".
pub const ALL: &str = "all";

// ---------------------------------------------------------------------------
// Query and statistics
// ---------------------------------------------------------------------------

/// Search text plus per-field filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: String,
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.filters.is_empty()
    }
}

/// Counts over the full set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    /// One bucket per partition label; sums to `total`.
    pub by_status: BTreeMap<String, usize>,
    /// Only for entities with a priority or severity.
    pub by_priority: BTreeMap<String, usize>,
}

impl Stats {
    pub fn status(&self, label: &str) -> usize {
        self.by_status.get(label).copied().unwrap_or(0)
    }

    pub fn priority(&self, label: &str) -> usize {
        self.by_priority.get(label).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// ListModel
// ---------------------------------------------------------------------------

struct Row<E> {
    item: Keyed<E>,
    /// Encoded fields, kept for search and filter matching.
    fields: Map<String, Value>,
}

/// Derived-view state of one collection.
pub struct ListModel<E: Entity> {
    rows: Vec<Row<E>>,
    full: Vec<Keyed<E>>,
    visible: Vec<usize>,
    query: ListQuery,
    stats: Stats,
}

impl<E: Entity> Default for ListModel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> ListModel<E> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            full: Vec::new(),
            visible: Vec::new(),
            query: ListQuery::default(),
            stats: Stats::default(),
        }
    }

    /// Replace the full set with the records of a collection snapshot.
    pub fn load_snapshot(&mut self, snapshot: &Snapshot) {
        self.load_value(snapshot.value.as_ref());
    }

    /// Replace the full set from the raw collection value (`key → record`).
    ///
    /// Records that fail to decode are logged and skipped.
    pub fn load_value(&mut self, value: Option<&Value>) {
        let mut rows = Vec::new();
        if let Some(Value::Object(children)) = value {
            for (key, raw) in children {
                let fields = match raw {
                    Value::Object(map) => map.clone(),
                    _ => {
                        warn!("{}/{key}: not a record, skipped", E::COLLECTION.path());
                        continue;
                    }
                };
                match E::decode(raw.clone()) {
                    Ok(record) => rows.push(Row {
                        item: Keyed::new(key.clone(), record),
                        fields,
                    }),
                    Err(e) => warn!("{}/{key}: undecodable record skipped: {e}", E::COLLECTION.path()),
                }
            }
        }
        rows.sort_by(|a, b| compare(&a.item, &b.item));
        self.rows = rows;
        self.full = self.rows.iter().map(|r| r.item.clone()).collect();
        self.stats = self.compute_stats();
        self.refilter();
    }

    /// Empty the full set (after a subscription failure).
    pub fn clear(&mut self) {
        self.load_value(None);
    }

    pub fn set_search(&mut self, text: &str) {
        self.query.search = text.to_string();
        self.refilter();
    }

    /// Constrain `field` to `value`. `"all"` or an empty value removes the
    /// constraint.
    pub fn set_filter(&mut self, field: &str, value: &str) -> Result<(), ServiceError> {
        if !E::FILTER_FIELDS.contains(&field) {
            return Err(ServiceError::Validation(format!(
                "{} cannot be filtered by '{field}'; filters: {}",
                E::COLLECTION.path(),
                E::FILTER_FIELDS.join(", ")
            )));
        }
        let value = value.trim();
        if value.is_empty() || value == ALL {
            self.query.filters.remove(field);
        } else {
            self.query.filters.insert(field.to_string(), value.to_string());
        }
        self.refilter();
        Ok(())
    }

    /// Drop the search text and every filter.
    pub fn reset_filters(&mut self) {
        self.query = ListQuery::default();
        self.refilter();
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    /// Every decoded record, in list order.
    pub fn full(&self) -> &[Keyed<E>] {
        &self.full
    }

    /// Records matching the current query, in list order.
    pub fn filtered(&self) -> Vec<&Keyed<E>> {
        self.visible.iter().map(|&i| &self.rows[i].item).collect()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.full.len()
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Keyed<E>> {
        self.full.iter().find(|k| k.key == key)
    }

    fn refilter(&mut self) {
        let needle = self.query.search.trim().to_lowercase();
        self.visible = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| self.matches_search(row, &needle) && self.matches_filters(row))
            .map(|(i, _)| i)
            .collect();
    }

    fn matches_search(&self, row: &Row<E>, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        E::SEARCH_FIELDS.iter().any(|field| {
            field_text(row, field).is_some_and(|text| text.to_lowercase().contains(needle))
        })
    }

    fn matches_filters(&self, row: &Row<E>) -> bool {
        self.query
            .filters
            .iter()
            .all(|(field, want)| field_text(row, field).as_deref() == Some(want.as_str()))
    }

    fn compute_stats(&self) -> Stats {
        let mut stats = Stats {
            total: self.rows.len(),
            ..Default::default()
        };
        for row in &self.rows {
            *stats
                .by_status
                .entry(row.item.record.partition().to_string())
                .or_default() += 1;
            if let Some(p) = row.item.record.priority() {
                *stats.by_priority.entry(p.as_str().to_string()).or_default() += 1;
            }
        }
        stats
    }
}

/// Text of a stored or derived field, for matching.
fn field_text<E: Entity>(row: &Row<E>, field: &str) -> Option<String> {
    if let Some(derived) = row.item.record.derived(field) {
        return Some(derived);
    }
    match row.fields.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// ListView
// ---------------------------------------------------------------------------

/// Where a list view is in its load lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Subscribed, no snapshot yet.
    Loading,
    /// At least one snapshot applied. May be an empty set.
    Ready,
    /// No snapshot arrived within the loading timeout. A late snapshot still
    /// moves the view to `Ready`.
    TimedOut,
    /// The subscription failed; the set is empty and no retry is made.
    Failed(String),
}

impl LoadState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Loading)
    }
}

struct Shared<E: Entity> {
    model: Mutex<ListModel<E>>,
    state: Mutex<LoadState>,
    version: watch::Sender<u64>,
}

impl<E: Entity> Shared<E> {
    fn model(&self) -> std::sync::MutexGuard<'_, ListModel<E>> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> LoadState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_state(&self, next: LoadState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
        self.bump();
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

/// A live list of one collection.
///
/// Dropping the view cancels its task, which drops the subscription.
pub struct ListView<E: Entity> {
    shared: Arc<Shared<E>>,
    cancel: CancellationToken,
}

impl<E: Entity> ListView<E> {
    /// Subscribe to the entity's collection and start tracking it.
    ///
    /// Must be called inside a tokio runtime. A subscribe failure does not
    /// error: the view starts out `Failed`.
    pub async fn activate(store: Arc<dyn DocumentStore>, loading_timeout: Duration) -> Self {
        let (version, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            model: Mutex::new(ListModel::new()),
            state: Mutex::new(LoadState::Loading),
            version,
        });
        let cancel = CancellationToken::new();
        let path = E::COLLECTION.path();

        match store.subscribe(path).await {
            Ok(sub) => {
                debug!("list view on {path} activated");
                tokio::spawn(track(
                    Arc::clone(&shared),
                    sub,
                    cancel.clone(),
                    loading_timeout,
                ));
            }
            Err(e) => {
                error!("subscribe to {path} failed: {e}");
                shared.set_state(LoadState::Failed(e.to_string()));
            }
        }
        Self { shared, cancel }
    }

    pub fn state(&self) -> LoadState {
        self.shared.state()
    }

    /// Clone of the full set, in list order.
    pub fn full(&self) -> Vec<Keyed<E>> {
        self.shared.model().full().to_vec()
    }

    /// Clone of the filtered set, in list order.
    pub fn filtered(&self) -> Vec<Keyed<E>> {
        self.shared.model().filtered().into_iter().cloned().collect()
    }

    pub fn stats(&self) -> Stats {
        self.shared.model().stats().clone()
    }

    pub fn query(&self) -> ListQuery {
        self.shared.model().query().clone()
    }

    pub fn set_search(&self, text: &str) {
        self.shared.model().set_search(text);
        self.shared.bump();
    }

    pub fn set_filter(&self, field: &str, value: &str) -> Result<(), ServiceError> {
        self.shared.model().set_filter(field, value)?;
        self.shared.bump();
        Ok(())
    }

    pub fn reset_filters(&self) {
        self.shared.model().reset_filters();
        self.shared.bump();
    }

    /// Run `f` against the current model.
    pub fn with_model<R>(&self, f: impl FnOnce(&ListModel<E>) -> R) -> R {
        f(&self.shared.model())
    }

    /// Wait until `pred` holds for the model and load state.
    pub async fn wait_until(&self, pred: impl Fn(&ListModel<E>, &LoadState) -> bool) {
        let mut rx = self.shared.version.subscribe();
        loop {
            let state = self.shared.state();
            if pred(&self.shared.model(), &state) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Wait for the first settled state (ready, timed out, or failed).
    pub async fn settled(&self) -> LoadState {
        self.wait_until(|_, state| state.is_settled()).await;
        self.state()
    }
}

impl<E: Entity> Drop for ListView<E> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Feed snapshots into the shared model until cancelled or the stream ends.
async fn track<E: Entity>(
    shared: Arc<Shared<E>>,
    mut sub: Subscription,
    cancel: CancellationToken,
    loading_timeout: Duration,
) {
    let path = E::COLLECTION.path();
    let deadline = tokio::time::sleep(loading_timeout);
    tokio::pin!(deadline);
    let mut waiting = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("list view on {path} cancelled");
                break;
            }
            _ = &mut deadline, if waiting => {
                waiting = false;
                warn!("no snapshot for {path} within {loading_timeout:?}");
                shared.set_state(LoadState::TimedOut);
            }
            event = sub.next() => match event {
                Some(Ok(snapshot)) => {
                    waiting = false;
                    shared.model().load_snapshot(&snapshot);
                    let was = shared.state();
                    if was != LoadState::Ready {
                        info!("{path} ready: {} records", shared.model().len());
                    }
                    shared.set_state(LoadState::Ready);
                }
                Some(Err(e)) => {
                    error!("subscription on {path} failed: {e}");
                    shared.model().clear();
                    shared.set_state(LoadState::Failed(e.to_string()));
                    break;
                }
                None => {
                    debug!("store closed subscription on {path}");
                    break;
                }
            }
        }
    }
}
