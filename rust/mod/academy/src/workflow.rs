//! Status workflows as declarative transition tables.
//!
//! Each workflow entity lists its legal moves once, as a `Transition` table.
//! Applying an action never replaces the record: it issues a single partial
//! update carrying the new status, `updatedAt`, and whatever the transition's
//! effects stamp.

use academy_core::{now_rfc3339, ServiceError};
use academy_store::DocumentStore;
use serde_json::{Map, Value};
use tracing::info;

use crate::entity::{Entity, Keyed, Label, UPDATED_AT};
use crate::model::{Student, StudentStatus};

/// Extra field written when a transition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Set the named field to the current time.
    Stamp(&'static str),
    /// Set the named field to the acting operator.
    Actor(&'static str),
    /// Record the supplied response text and its author, if a response was given.
    Respond,
}

/// One legal move: `from` any listed status, via `action`, into `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S: 'static> {
    pub from: &'static [S],
    pub action: &'static str,
    pub to: S,
    pub effects: &'static [Effect],
}

/// An entity whose `status` field is governed by a transition table.
pub trait Workflow: Entity {
    type Status: Label;
    const TRANSITIONS: &'static [Transition<Self::Status>];

    fn status(&self) -> Self::Status;
}

/// Who is acting and what they said.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionContext {
    pub actor: String,
    pub response: Option<String>,
}

impl ActionContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            response: None,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    fn response_text(&self) -> Option<&str> {
        self.response.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }
}

/// Actions legal from `current`, in table order.
pub fn available_actions<W: Workflow>(current: W::Status) -> Vec<&'static str> {
    W::TRANSITIONS
        .iter()
        .filter(|t| t.from.contains(&current))
        .map(|t| t.action)
        .collect()
}

/// Look up the transition for `action` from `current`.
pub fn plan<W: Workflow>(
    current: W::Status,
    action: &str,
) -> Result<&'static Transition<W::Status>, ServiceError> {
    W::TRANSITIONS
        .iter()
        .find(|t| t.action == action && t.from.contains(&current))
        .ok_or_else(|| {
            let legal = available_actions::<W>(current);
            ServiceError::InvalidTransition(format!(
                "{} cannot '{action}' from {}; allowed: {}",
                W::COLLECTION.noun(),
                current.as_str(),
                if legal.is_empty() { "none".to_string() } else { legal.join(", ") }
            ))
        })
}

/// Look up a transition by its target status instead of its action name.
pub fn plan_to<W: Workflow>(
    current: W::Status,
    target: W::Status,
) -> Result<&'static Transition<W::Status>, ServiceError> {
    W::TRANSITIONS
        .iter()
        .find(|t| t.to == target && t.from.contains(&current))
        .ok_or_else(|| {
            ServiceError::InvalidTransition(format!(
                "{} cannot move from {} to {}",
                W::COLLECTION.noun(),
                current.as_str(),
                target.as_str()
            ))
        })
}

/// The partial update a transition writes.
pub fn patch_for<S: Label>(
    transition: &Transition<S>,
    ctx: &ActionContext,
    now: &str,
) -> Map<String, Value> {
    let mut patch = Map::new();
    patch.insert("status".into(), Value::from(transition.to.as_str()));
    patch.insert(UPDATED_AT.into(), Value::from(now));
    for effect in transition.effects {
        match effect {
            Effect::Stamp(field) => {
                patch.insert((*field).into(), Value::from(now));
            }
            Effect::Actor(field) => {
                patch.insert((*field).into(), Value::from(ctx.actor.as_str()));
            }
            Effect::Respond => {
                if let Some(text) = ctx.response_text() {
                    patch.insert("response".into(), Value::from(text));
                    patch.insert("resolvedBy".into(), Value::from(ctx.actor.as_str()));
                }
            }
        }
    }
    patch
}

/// Apply `action` to the stored record `key`.
///
/// Reads the current status, rejects illegal moves without writing, and
/// otherwise issues one partial update. Returns the new status.
pub async fn apply<W: Workflow>(
    store: &dyn DocumentStore,
    key: &str,
    action: &str,
    ctx: &ActionContext,
) -> Result<W::Status, ServiceError> {
    let current = Keyed::<W>::fetch(store, key).await?;
    let transition = plan::<W>(current.record.status(), action)?;
    write_transition::<W>(store, &current, transition, ctx).await
}

/// Move the stored record `key` into `target`, if a table entry allows it.
pub async fn apply_to<W: Workflow>(
    store: &dyn DocumentStore,
    key: &str,
    target: W::Status,
    ctx: &ActionContext,
) -> Result<W::Status, ServiceError> {
    let current = Keyed::<W>::fetch(store, key).await?;
    let transition = plan_to::<W>(current.record.status(), target)?;
    write_transition::<W>(store, &current, transition, ctx).await
}

async fn write_transition<W: Workflow>(
    store: &dyn DocumentStore,
    current: &Keyed<W>,
    transition: &Transition<W::Status>,
    ctx: &ActionContext,
) -> Result<W::Status, ServiceError> {
    let noun = W::COLLECTION.noun();
    let patch = patch_for(transition, ctx, &now_rfc3339());
    store
        .update(&current.path(), patch)
        .await
        .map_err(|e| ServiceError::from(e).during(&format!("{} {noun}", transition.action)))?;
    info!(
        "{noun} {} {} -> {} by {}",
        current.key,
        current.record.status().as_str(),
        transition.to.as_str(),
        ctx.actor
    );
    Ok(transition.to)
}

// ---------------------------------------------------------------------------
// Free-form status fields
// ---------------------------------------------------------------------------

/// An entity with an `isActive` flag that can be flipped.
pub trait Toggle: Entity {
    fn is_active(&self) -> bool;
}

/// Flip `isActive` on the stored record. Writes only `isActive` and
/// `updatedAt`; returns the new value.
pub async fn toggle_active<E: Toggle>(
    store: &dyn DocumentStore,
    key: &str,
) -> Result<bool, ServiceError> {
    let current = Keyed::<E>::fetch(store, key).await?;
    let next = !current.record.is_active();

    let mut patch = Map::new();
    patch.insert("isActive".into(), Value::Bool(next));
    patch.insert(UPDATED_AT.into(), Value::from(now_rfc3339()));
    store.update(&current.path(), patch).await.map_err(|e| {
        ServiceError::from(e).during(&format!("toggle {}", E::COLLECTION.noun()))
    })?;
    info!("{} {key} isActive -> {next}", E::COLLECTION.noun());
    Ok(next)
}

/// Set a student's status. Any status may follow any other.
pub async fn set_student_status(
    store: &dyn DocumentStore,
    key: &str,
    status: StudentStatus,
) -> Result<(), ServiceError> {
    let mut patch = Map::new();
    patch.insert("status".into(), Value::from(status.as_str()));
    patch.insert(UPDATED_AT.into(), Value::from(now_rfc3339()));
    store
        .update(&Student::COLLECTION.record_path(key), patch)
        .await
        .map_err(|e| ServiceError::from(e).during("update student status"))?;
    info!("student {key} status -> {status}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Complaint, ComplaintStatus, Invoice, InvoiceStatus, Request, RequestStatus, TestPhase, TestStatus};
    use academy_store::MemoryStore;
    use serde_json::json;

    #[test]
    fn complaint_table() {
        assert_eq!(
            available_actions::<Complaint>(ComplaintStatus::Pending),
            vec!["review", "reject"]
        );
        assert_eq!(
            available_actions::<Complaint>(ComplaintStatus::InReview),
            vec!["resolve", "reject"]
        );
        assert!(available_actions::<Complaint>(ComplaintStatus::Resolved).is_empty());

        let err = plan::<Complaint>(ComplaintStatus::Resolved, "review").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("allowed: none"));
        assert!(plan_to::<Complaint>(ComplaintStatus::Resolved, ComplaintStatus::Pending).is_err());
        assert!(plan::<Complaint>(ComplaintStatus::Pending, "resolve").is_err());
    }

    #[test]
    fn test_status_cancel_only_before_terminal() {
        for phase in [TestPhase::Scheduled, TestPhase::InProgress, TestPhase::Completed] {
            assert_eq!(plan::<TestStatus>(phase, "cancel").unwrap().to, TestPhase::Cancelled);
        }
        assert!(plan::<TestStatus>(TestPhase::Graded, "cancel").is_err());
        assert!(plan::<TestStatus>(TestPhase::Cancelled, "cancel").is_err());
        assert!(plan::<TestStatus>(TestPhase::Scheduled, "grade").is_err());
    }

    #[test]
    fn invoice_table() {
        assert_eq!(plan::<Invoice>(InvoiceStatus::Overdue, "pay").unwrap().to, InvoiceStatus::Paid);
        assert!(plan::<Invoice>(InvoiceStatus::Paid, "pay").is_err());
        assert!(plan::<Invoice>(InvoiceStatus::Overdue, "mark_overdue").is_err());
    }

    #[test]
    fn resolve_patch_carries_response_and_author() {
        let t = plan::<Complaint>(ComplaintStatus::InReview, "resolve").unwrap();
        let ctx = ActionContext::new("admin").with_response("Refund issued");
        let patch = patch_for(t, &ctx, "2026-10-19T10:00:00+00:00");
        assert_eq!(
            Value::Object(patch),
            json!({
                "status": "resolved",
                "updatedAt": "2026-10-19T10:00:00+00:00",
                "resolvedAt": "2026-10-19T10:00:00+00:00",
                "response": "Refund issued",
                "resolvedBy": "admin",
            })
        );

        let bare = patch_for(t, &ActionContext::new("admin").with_response("  "), "t");
        assert!(!bare.contains_key("response"));
        assert!(!bare.contains_key("resolvedBy"));
    }

    #[test]
    fn request_decisions_always_record_actor() {
        let t = plan::<Request>(RequestStatus::InProgress, "reject").unwrap();
        let patch = patch_for(t, &ActionContext::new("mona"), "t");
        assert_eq!(patch["resolvedBy"], json!("mona"));
        assert_eq!(patch["resolvedAt"], json!("t"));
        assert!(!patch.contains_key("response"));
    }

    #[tokio::test]
    async fn apply_writes_partial_patch() {
        let store = MemoryStore::new();
        let key = store
            .create_with_generated_key(
                "complaints",
                json!({
                    "complainantName": "Layla", "subject": "Late bus",
                    "description": "Twice this week", "status": "pending",
                    "createdAt": "2026-10-01T08:00:00+00:00"
                }),
            )
            .await
            .unwrap();

        let ctx = ActionContext::new("admin");
        let status = apply::<Complaint>(&store, &key, "review", &ctx).await.unwrap();
        assert_eq!(status, ComplaintStatus::InReview);

        let doc = store.get(&format!("complaints/{key}")).await.unwrap().unwrap();
        assert_eq!(doc["status"], json!("in_review"));
        assert_eq!(doc["subject"], json!("Late bus"));
        assert_eq!(doc["createdAt"], json!("2026-10-01T08:00:00+00:00"));
        assert!(doc.get("updatedAt").is_some());
    }

    #[tokio::test]
    async fn illegal_action_issues_no_write() {
        let store = MemoryStore::new();
        let key = store
            .create_with_generated_key(
                "complaints",
                json!({
                    "complainantName": "Layla", "subject": "Late bus",
                    "description": "x", "status": "resolved"
                }),
            )
            .await
            .unwrap();
        let before = store.write_count();

        let err = apply::<Complaint>(&store, &key, "review", &ActionContext::new("admin"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        let err = apply_to::<Complaint>(
            &store,
            &key,
            ComplaintStatus::Pending,
            &ActionContext::new("admin"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert_eq!(store.write_count(), before);
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = apply::<TestStatus>(&store, "nope", "start", &ActionContext::new("t"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn student_status_is_free_form() {
        let store = MemoryStore::new();
        let key = store
            .create_with_generated_key("children", json!({"name": "Omar", "familyId": "f1", "status": "inactive"}))
            .await
            .unwrap();
        for status in [StudentStatus::OnHold, StudentStatus::Active, StudentStatus::Break] {
            set_student_status(&store, &key, status).await.unwrap();
            let s = Keyed::<Student>::fetch(&store, &key).await.unwrap();
            assert_eq!(s.record.status, status);
        }
        let err = set_student_status(&store, "ghost", StudentStatus::Leave).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
