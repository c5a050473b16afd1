//! Form controller: one draft, validated and written with a single store call.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use academy_core::{now_rfc3339, ServiceError};
use academy_store::DocumentStore;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::collection::Collection;
use crate::entity::{Entity, Keyed, CREATED_AT, UPDATED_AT};

/// Whether the form creates a new record or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { key: String, created_at: String },
}

struct FormState {
    mode: FormMode,
    draft: Map<String, Value>,
}

/// Resets the in-flight flag when a submit finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Draft state and submit logic for one entity type.
pub struct FormController<E: Entity> {
    store: Arc<dyn DocumentStore>,
    state: Mutex<FormState>,
    in_flight: AtomicBool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> FormController<E> {
    /// A form for a new record, with the entity's default draft.
    pub fn create(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            state: Mutex::new(FormState {
                mode: FormMode::Create,
                draft: E::defaults(),
            }),
            in_flight: AtomicBool::new(false),
            _entity: PhantomData,
        }
    }

    /// A form editing the stored record `key`, drafted from its current fields.
    pub async fn edit(store: Arc<dyn DocumentStore>, key: &str) -> Result<Self, ServiceError> {
        let current = Keyed::<E>::fetch(store.as_ref(), key).await?;
        Self::edit_from(store, &current)
    }

    /// A form editing a record already held by a list view.
    pub fn edit_from(store: Arc<dyn DocumentStore>, current: &Keyed<E>) -> Result<Self, ServiceError> {
        let created_at = current.record.created_at().to_string();
        let draft = editable::<E>(current.record.to_fields()?);
        Ok(Self {
            store,
            state: Mutex::new(FormState {
                mode: FormMode::Edit {
                    key: current.key.clone(),
                    created_at,
                },
                draft,
            }),
            in_flight: AtomicBool::new(false),
            _entity: PhantomData,
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> FormMode {
        self.state().mode.clone()
    }

    pub fn draft(&self) -> Map<String, Value> {
        self.state().draft.clone()
    }

    /// Set a draft field to a JSON value. `null` clears it.
    pub fn set(&self, field: &str, value: Value) -> Result<(), ServiceError> {
        E::field(field)?;
        let mut state = self.state();
        if value.is_null() {
            state.draft.remove(field);
        } else {
            state.draft.insert(field.to_string(), value);
        }
        Ok(())
    }

    /// Set a draft field from raw text, coerced by the field's kind.
    pub fn assign(&self, field: &str, raw: &str) -> Result<(), ServiceError> {
        let value = E::field(field)?.coerce(raw)?;
        self.set(field, value)
    }

    /// Merge every field of `fields` into the draft. Nothing is merged if
    /// any key is not an editable field.
    pub fn extend(&self, fields: Map<String, Value>) -> Result<(), ServiceError> {
        for field in fields.keys() {
            E::field(field)?;
        }
        for (field, value) in fields {
            self.set(&field, value)?;
        }
        Ok(())
    }

    /// Validate the current draft without writing anything.
    pub fn validate(&self) -> Result<E, ServiceError> {
        E::from_draft(&self.state().draft)
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Discard the draft and return to creating a new record.
    pub fn reset(&self) {
        let mut state = self.state();
        state.mode = FormMode::Create;
        state.draft = E::defaults();
    }

    /// Validate and write the draft. Returns the record key.
    ///
    /// Exactly one store write is issued on a valid draft and none on an
    /// invalid one. The draft resets on success and is kept on failure.
    pub async fn submit(&self) -> Result<String, ServiceError> {
        let noun = E::COLLECTION.noun();
        let _guard = InFlight::acquire(&self.in_flight)
            .ok_or_else(|| ServiceError::Busy(format!("{noun} is already being saved")))?;

        let (mode, record) = {
            let state = self.state();
            (state.mode.clone(), E::from_draft(&state.draft)?)
        };

        let result = match &mode {
            FormMode::Create => insert(self.store.as_ref(), &record).await,
            FormMode::Edit { key, created_at } => {
                replace(self.store.as_ref(), key, created_at, &record)
                    .await
                    .map(|()| key.clone())
            }
        };

        match result {
            Ok(key) => {
                self.reset();
                Ok(key)
            }
            Err(e) => {
                warn!("{noun} form kept after failed submit: {e}");
                Err(e)
            }
        }
    }
}

/// Create `record` under a generated key, stamping both timestamps.
pub(crate) async fn insert<E: Entity>(
    store: &dyn DocumentStore,
    record: &E,
) -> Result<String, ServiceError> {
    let noun = E::COLLECTION.noun();
    let now = now_rfc3339();
    let mut fields = record.to_fields()?;
    fields.insert(CREATED_AT.into(), Value::from(now.as_str()));
    fields.insert(UPDATED_AT.into(), Value::from(now));

    let key = store
        .create_with_generated_key(E::COLLECTION.path(), Value::Object(fields))
        .await
        .map_err(|e| ServiceError::from(e).during(&format!("create {noun}")))?;
    info!("created {noun} {key}");
    Ok(key)
}

/// Replace every editable field of `key`, keeping its original `createdAt`.
async fn replace<E: Entity>(
    store: &dyn DocumentStore,
    key: &str,
    created_at: &str,
    record: &E,
) -> Result<(), ServiceError> {
    let noun = E::COLLECTION.noun();
    // Status and workflow stamps belong to the transition table.
    let mut fields = editable::<E>(record.to_fields()?);
    // Editable fields the draft no longer carries are cleared.
    for def in E::FIELDS {
        fields.entry(def.name).or_insert(Value::Null);
    }
    if created_at.is_empty() {
        fields.remove(CREATED_AT);
    } else {
        fields.insert(CREATED_AT.into(), Value::from(created_at));
    }
    fields.insert(UPDATED_AT.into(), Value::from(now_rfc3339()));

    store
        .update(&E::COLLECTION.record_path(key), fields)
        .await
        .map_err(|e| ServiceError::from(e).during(&format!("update {noun}")))?;
    info!("updated {noun} {key}");
    Ok(())
}

/// Keep only the fields a form may write.
fn editable<E: Entity>(mut fields: Map<String, Value>) -> Map<String, Value> {
    fields.retain(|name, _| E::FIELDS.iter().any(|f| f.name == name.as_str()));
    fields
}

/// Physically delete one record. The caller confirms with the user first.
pub async fn delete(
    store: &dyn DocumentStore,
    collection: Collection,
    key: &str,
) -> Result<(), ServiceError> {
    let noun = collection.noun();
    let path = collection.record_path(key);
    let action = format!("delete {noun}");
    let exists = store
        .get(&path)
        .await
        .map_err(|e| ServiceError::from(e).during(&action))?
        .is_some();
    if !exists {
        return Err(ServiceError::NotFound(format!("{noun} {key} does not exist")));
    }
    store
        .remove(&path)
        .await
        .map_err(|e| ServiceError::from(e).during(&action))?;
    info!("deleted {noun} {key}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Complaint, Country, Employee, Invoice, InvoiceStatus, Rule};
    use crate::workflow::{apply, ActionContext};
    use academy_store::MemoryStore;
    use serde_json::json;

    fn employee_form(store: &Arc<MemoryStore>) -> FormController<Employee> {
        let form = FormController::<Employee>::create(store.clone());
        for (field, raw) in [
            ("name", "Sara Haddad"),
            ("email", "sara@academy.test"),
            ("phone", "555-0101"),
            ("position", "Teacher"),
            ("department", "Quran"),
            ("salary", "900"),
        ] {
            form.assign(field, raw).unwrap();
        }
        form
    }

    #[tokio::test]
    async fn create_stamps_and_resets() {
        let store = Arc::new(MemoryStore::new());
        let form = employee_form(&store);
        let key = form.submit().await.unwrap();

        let doc = store.get(&format!("employees/{key}")).await.unwrap().unwrap();
        assert_eq!(doc["name"], json!("Sara Haddad"));
        assert_eq!(doc["salary"], json!(900.0));
        assert_eq!(doc["status"], json!("active"));
        assert_eq!(doc["createdAt"], doc["updatedAt"]);
        assert_eq!(store.write_count(), 1);

        assert_eq!(form.draft(), Employee::defaults());
        assert_eq!(form.mode(), FormMode::Create);
    }

    #[tokio::test]
    async fn missing_required_field_never_writes() {
        let store = Arc::new(MemoryStore::new());
        let form = employee_form(&store);
        form.assign("salary", "").unwrap();

        let err = form.submit().await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert!(err.to_string().contains("salary"));
        assert_eq!(store.write_count(), 0);
        assert_eq!(form.draft()["name"], json!("Sara Haddad"));
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn failed_write_keeps_draft_and_names_action() {
        let store = Arc::new(MemoryStore::new());
        let form = employee_form(&store);
        store.set_offline(true);

        let err = form.submit().await.unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(err.to_string().starts_with("create employee:"));
        assert_eq!(form.draft()["department"], json!("Quran"));

        store.set_offline(false);
        assert!(form.submit().await.is_ok());
    }

    #[tokio::test]
    async fn edit_replaces_fields_and_keeps_created_at() {
        let store = Arc::new(MemoryStore::new());
        let key = store
            .create_with_generated_key(
                "rules",
                json!({
                    "title": "Phones", "description": "Off in class", "severity": "high",
                    "isActive": true, "createdAt": "2026-01-01T00:00:00+00:00"
                }),
            )
            .await
            .unwrap();

        let form = FormController::<Rule>::edit(store.clone(), &key).await.unwrap();
        assert_eq!(
            form.mode(),
            FormMode::Edit {
                key: key.clone(),
                created_at: "2026-01-01T00:00:00+00:00".into()
            }
        );
        form.assign("title", "Phones off").unwrap();
        form.set("severity", Value::Null).unwrap();
        assert_eq!(form.submit().await.unwrap(), key);

        let doc = store.get(&format!("rules/{key}")).await.unwrap().unwrap();
        assert_eq!(doc["title"], json!("Phones off"));
        assert_eq!(doc["severity"], json!("medium"));
        assert_eq!(doc["createdAt"], json!("2026-01-01T00:00:00+00:00"));
        assert_ne!(doc["updatedAt"], doc["createdAt"]);
    }

    #[tokio::test]
    async fn assign_rejects_unknown_fields_and_bad_choices() {
        let store = Arc::new(MemoryStore::new());
        let form = FormController::<Country>::create(store);
        assert!(form.assign("flag", "x").is_err());
        assert!(form.assign("isActive", "maybe").is_err());
        form.assign("isActive", "false").unwrap();
        assert_eq!(form.draft()["isActive"], json!(false));
    }

    async fn stored_complaint(store: &MemoryStore, status: &str) -> String {
        store
            .create_with_generated_key(
                "complaints",
                json!({
                    "complainantName": "Parent", "subject": "Schedule",
                    "description": "Class moved", "status": status, "priority": "high",
                    "resolvedAt": "2026-10-02T09:00:00+00:00",
                    "createdAt": "2026-10-01T09:00:00+00:00"
                }),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn edit_cannot_reopen_resolved_complaint() {
        let store = Arc::new(MemoryStore::new());
        let key = stored_complaint(&store, "resolved").await;

        let form = FormController::<Complaint>::edit(store.clone(), &key).await.unwrap();
        assert!(!form.draft().contains_key("status"));
        assert!(!form.draft().contains_key("resolvedAt"));
        let err = form.set("status", json!("pending")).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert!(form.assign("status", "pending").is_err());
        assert!(form.assign("resolvedAt", "").is_err());

        form.assign("subject", "Schedule change").unwrap();
        form.submit().await.unwrap();

        let doc = store.get(&format!("complaints/{key}")).await.unwrap().unwrap();
        assert_eq!(doc["subject"], json!("Schedule change"));
        assert_eq!(doc["status"], json!("resolved"));
        assert_eq!(doc["resolvedAt"], json!("2026-10-02T09:00:00+00:00"));
    }

    #[tokio::test]
    async fn create_starts_in_initial_status() {
        let store = Arc::new(MemoryStore::new());
        let form = FormController::<Complaint>::create(store.clone());
        let draft = json!({"subject": "Schedule", "status": "resolved"});
        assert!(form.extend(draft.as_object().cloned().unwrap()).is_err());
        // Nothing from a rejected batch is merged.
        assert!(!form.draft().contains_key("subject"));

        form.assign("complainantName", "Parent").unwrap();
        form.assign("subject", "Schedule").unwrap();
        form.assign("description", "Class moved").unwrap();
        let key = form.submit().await.unwrap();

        let doc = store.get(&format!("complaints/{key}")).await.unwrap().unwrap();
        assert_eq!(doc["status"], json!("pending"));
        assert!(doc.get("resolvedAt").is_none());
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn paid_invoice_edit_keeps_payment() {
        let store = Arc::new(MemoryStore::new());
        let key = store
            .create_with_generated_key(
                "invoices",
                json!({
                    "familyId": "f1", "familyName": "Haddad", "amount": 120, "month": 10,
                    "year": 2026, "dueDate": "2026-10-15", "status": "pending",
                    "createdAt": "2026-10-01T09:00:00+00:00"
                }),
            )
            .await
            .unwrap();
        let paid = apply::<Invoice>(store.as_ref(), &key, "pay", &ActionContext::new("admin"))
            .await
            .unwrap();
        assert_eq!(paid, InvoiceStatus::Paid);
        let paid_at = store.get(&format!("invoices/{key}")).await.unwrap().unwrap()["paidAt"].clone();
        assert!(paid_at.is_string());

        let form = FormController::<Invoice>::edit(store.clone(), &key).await.unwrap();
        assert!(form.assign("status", "pending").is_err());
        form.assign("notes", "Paid in cash").unwrap();
        form.submit().await.unwrap();

        let doc = store.get(&format!("invoices/{key}")).await.unwrap().unwrap();
        assert_eq!(doc["notes"], json!("Paid in cash"));
        assert_eq!(doc["status"], json!("paid"));
        assert_eq!(doc["paidAt"], paid_at);
    }

    #[tokio::test]
    async fn stale_edit_does_not_undo_transition() {
        let store = Arc::new(MemoryStore::new());
        let key = stored_complaint(&store, "pending").await;
        let form = FormController::<Complaint>::edit(store.clone(), &key).await.unwrap();

        apply::<Complaint>(store.as_ref(), &key, "review", &ActionContext::new("admin"))
            .await
            .unwrap();
        form.assign("description", "Class moved to Monday").unwrap();
        form.submit().await.unwrap();

        let doc = store.get(&format!("complaints/{key}")).await.unwrap().unwrap();
        assert_eq!(doc["status"], json!("in_review"));
        assert_eq!(doc["description"], json!("Class moved to Monday"));
    }

    #[test]
    fn draft_with_status_is_rejected() {
        let draft = json!({
            "complainantName": "Parent", "subject": "Schedule",
            "description": "Class moved", "status": "resolved"
        });
        let err = Complaint::from_draft(draft.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("status"));
    }

    #[tokio::test]
    async fn delete_requires_existing_record() {
        let store = MemoryStore::new();
        let key = store
            .create_with_generated_key("rules", json!({"title": "A", "description": "B"}))
            .await
            .unwrap();
        delete(&store, Collection::Rules, &key).await.unwrap();
        assert!(store.get(&format!("rules/{key}")).await.unwrap().is_none());

        let err = delete(&store, Collection::Rules, &key).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn guard_resets_flag() {
        let flag = AtomicBool::new(false);
        {
            let _g = InFlight::acquire(&flag).unwrap();
            assert!(InFlight::acquire(&flag).is_none());
        }
        assert!(InFlight::acquire(&flag).is_some());
    }
}
