use academy_core::ServiceError;
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::entity::{
    ensure_date, ensure_non_negative, label_enum, ActiveStatus, Entity, FieldDef, FieldKind,
    Label,
};

// ---------------------------------------------------------------------------
// Family
// ---------------------------------------------------------------------------

/// A paying household. Invoices are raised per family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub parent_name: String,
    pub email: String,
    pub phone: String,
    /// Fee per enrolled student per month.
    pub monthly_fee: f64,

    /// Number of enrolled students; multiplies `monthly_fee` on invoices.
    #[serde(default)]
    pub student_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl Family {
    /// What one month costs this family.
    pub fn monthly_total(&self) -> f64 {
        self.monthly_fee * f64::from(self.student_count)
    }
}

impl Entity for Family {
    const COLLECTION: Collection = Collection::Families;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("parentName", FieldKind::Text),
        FieldDef::required("email", FieldKind::Text),
        FieldDef::required("phone", FieldKind::Text),
        FieldDef::required("monthlyFee", FieldKind::Number),
        FieldDef::optional("studentCount", FieldKind::Integer),
        FieldDef::optional("country", FieldKind::Text),
        FieldDef::optional("address", FieldKind::Text),
        FieldDef::optional("status", FieldKind::Choice(ActiveStatus::NAMES)),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["parentName", "email", "phone"];
    const FILTER_FIELDS: &'static [&'static str] = &["country", "status"];

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn partition(&self) -> &'static str {
        self.status.as_str()
    }

    fn display_name(&self) -> &str {
        &self.parent_name
    }

    fn check(&self) -> Result<(), ServiceError> {
        ensure_non_negative("monthlyFee", self.monthly_fee)
    }
}

// ---------------------------------------------------------------------------
// Student
// ---------------------------------------------------------------------------

label_enum! {
    /// Enrollment status. Free-form: any status may follow any other.
    pub enum StudentStatus {
        Active = "active",
        Suspended = "suspended",
        Leave = "leave",
        Break = "break",
        OnHold = "on-hold",
        Inactive = "inactive",
    }
    default Active
}

/// An enrolled child, stored under `children`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub name: String,
    /// Key of the owning family. Not checked for existence.
    pub family_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_date: Option<String>,
    #[serde(default)]
    pub status: StudentStatus,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl Entity for Student {
    const COLLECTION: Collection = Collection::Students;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("name", FieldKind::Text),
        FieldDef::required("familyId", FieldKind::Text),
        FieldDef::optional("familyName", FieldKind::Text),
        FieldDef::optional("teacherId", FieldKind::Text),
        FieldDef::optional("subject", FieldKind::Text),
        FieldDef::optional("age", FieldKind::Integer),
        FieldDef::optional("enrollmentDate", FieldKind::Date),
        FieldDef::optional("status", FieldKind::Choice(StudentStatus::NAMES)),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "subject"];
    const FILTER_FIELDS: &'static [&'static str] = &["status", "subject", "familyId"];

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn partition(&self) -> &'static str {
        self.status.as_str()
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> Result<(), ServiceError> {
        if let Some(date) = &self.enrollment_date {
            ensure_date("enrollmentDate", date)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn monthly_total_multiplies_fee() {
        let f = Family {
            monthly_fee: 60.0,
            student_count: 3,
            ..Default::default()
        };
        assert_eq!(f.monthly_total(), 180.0);
    }

    #[test]
    fn family_defaults_keep_optional_counters() {
        let d = Family::defaults();
        assert_eq!(d.get("studentCount"), Some(&json!(0)));
        assert_eq!(d.get("status"), Some(&json!("active")));
        assert!(!d.contains_key("monthlyFee"));
    }

    #[test]
    fn student_status_labels() {
        assert_eq!(StudentStatus::NAMES.len(), 6);
        assert_eq!(StudentStatus::parse("on-hold"), Some(StudentStatus::OnHold));
        let s: Student = serde_json::from_value(json!({
            "name": "Omar", "familyId": "f1", "status": "break"
        }))
        .unwrap();
        assert_eq!(s.partition(), "break");
    }

    #[test]
    fn student_requires_family() {
        let d = json!({"name": "Omar"}).as_object().cloned().unwrap();
        assert_eq!(Student::missing_required(&d), vec!["familyId"]);
    }
}
