use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::entity::{label_enum, Entity, FieldDef, FieldKind, Label, Priority, SortOrder};
use crate::workflow::{Effect, Transition, Workflow};

// ---------------------------------------------------------------------------
// Complaint
// ---------------------------------------------------------------------------

label_enum! {
    /// Complaint lifecycle.
    ///
    /// ```text
    /// pending → in_review → resolved
    ///                     → rejected
    ///         → rejected
    /// ```
    pub enum ComplaintStatus {
        Pending = "pending",
        InReview = "in_review",
        Resolved = "resolved",
        Rejected = "rejected",
    }
    default Pending
}

label_enum! {
    pub enum ComplaintCategory {
        Service = "service",
        Teacher = "teacher",
        Billing = "billing",
        Technical = "technical",
        Other = "other",
    }
    default Other
}

/// A complaint raised by a parent or student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub complainant_name: String,
    pub subject: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complainant_email: Option<String>,
    #[serde(default)]
    pub category: ComplaintCategory,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: ComplaintStatus,

    // --- resolution ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl Entity for Complaint {
    const COLLECTION: Collection = Collection::Complaints;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("complainantName", FieldKind::Text),
        FieldDef::required("subject", FieldKind::Text),
        FieldDef::required("description", FieldKind::Text),
        FieldDef::optional("complainantEmail", FieldKind::Text),
        FieldDef::optional("category", FieldKind::Choice(ComplaintCategory::NAMES)),
        FieldDef::optional("priority", FieldKind::Choice(Priority::NAMES)),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["complainantName", "subject", "description"];
    const FILTER_FIELDS: &'static [&'static str] = &["status", "category", "priority"];
    const ORDER: SortOrder = SortOrder::Severity;

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn partition(&self) -> &'static str {
        self.status.as_str()
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.priority)
    }

    fn display_name(&self) -> &str {
        &self.subject
    }
}

impl Workflow for Complaint {
    type Status = ComplaintStatus;
    const TRANSITIONS: &'static [Transition<ComplaintStatus>] = &[
        Transition {
            from: &[ComplaintStatus::Pending],
            action: "review",
            to: ComplaintStatus::InReview,
            effects: &[],
        },
        Transition {
            from: &[ComplaintStatus::InReview],
            action: "resolve",
            to: ComplaintStatus::Resolved,
            effects: &[Effect::Stamp("resolvedAt"), Effect::Respond],
        },
        Transition {
            from: &[ComplaintStatus::Pending, ComplaintStatus::InReview],
            action: "reject",
            to: ComplaintStatus::Rejected,
            effects: &[Effect::Stamp("resolvedAt")],
        },
    ];

    fn status(&self) -> ComplaintStatus {
        self.status
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

label_enum! {
    /// Request lifecycle.
    ///
    /// ```text
    /// pending → in_progress → approved | rejected
    ///         → approved | rejected
    /// ```
    pub enum RequestStatus {
        Pending = "pending",
        InProgress = "in_progress",
        Approved = "approved",
        Rejected = "rejected",
    }
    default Pending
}

/// A request (leave, schedule change, refund, ...) awaiting a decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub requester_name: String,
    pub subject: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: RequestStatus,

    // --- decision ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl Entity for Request {
    const COLLECTION: Collection = Collection::Requests;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("requesterName", FieldKind::Text),
        FieldDef::required("subject", FieldKind::Text),
        FieldDef::required("description", FieldKind::Text),
        FieldDef::optional("requesterEmail", FieldKind::Text),
        FieldDef::optional("requestType", FieldKind::Text),
        FieldDef::optional("priority", FieldKind::Choice(Priority::NAMES)),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["requesterName", "subject", "description"];
    const FILTER_FIELDS: &'static [&'static str] = &["status", "priority", "requestType"];
    const ORDER: SortOrder = SortOrder::Severity;

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn partition(&self) -> &'static str {
        self.status.as_str()
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.priority)
    }

    fn display_name(&self) -> &str {
        &self.subject
    }
}

const DECIDE: &[Effect] = &[
    Effect::Stamp("resolvedAt"),
    Effect::Actor("resolvedBy"),
    Effect::Respond,
];

impl Workflow for Request {
    type Status = RequestStatus;
    const TRANSITIONS: &'static [Transition<RequestStatus>] = &[
        Transition {
            from: &[RequestStatus::Pending],
            action: "start",
            to: RequestStatus::InProgress,
            effects: &[],
        },
        Transition {
            from: &[RequestStatus::Pending, RequestStatus::InProgress],
            action: "approve",
            to: RequestStatus::Approved,
            effects: DECIDE,
        },
        Transition {
            from: &[RequestStatus::Pending, RequestStatus::InProgress],
            action: "reject",
            to: RequestStatus::Rejected,
            effects: DECIDE,
        },
    ];

    fn status(&self) -> RequestStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn complaint_defaults() {
        let d = Complaint::defaults();
        assert!(!d.contains_key("status"));
        assert_eq!(d.get("priority"), Some(&json!("medium")));
        assert_eq!(d.get("category"), Some(&json!("other")));
    }

    #[test]
    fn complaint_status_names() {
        assert_eq!(
            ComplaintStatus::NAMES,
            &["pending", "in_review", "resolved", "rejected"]
        );
        assert!(serde_json::from_value::<Complaint>(json!({
            "complainantName": "A", "subject": "B", "description": "C", "status": "closed"
        }))
        .is_err());
    }

    #[test]
    fn request_priority_is_its_sort_key() {
        let r = Request {
            priority: Priority::Critical,
            ..Default::default()
        };
        assert_eq!(r.priority(), Some(Priority::Critical));
        assert_eq!(Request::ORDER, SortOrder::Severity);
    }
}
