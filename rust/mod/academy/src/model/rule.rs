use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::entity::{active_label, label_enum, Entity, FieldDef, FieldKind, Priority, SortOrder};
use crate::workflow::Toggle;

label_enum! {
    pub enum RuleCategory {
        General = "general",
        Attendance = "attendance",
        Conduct = "conduct",
        Academic = "academic",
        Payment = "payment",
    }
    default General
}

/// An academy rule shown to parents and students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub title: String,
    pub description: String,

    #[serde(default)]
    pub category: RuleCategory,
    #[serde(default)]
    pub severity: Priority,
    #[serde(default = "super::default_true", alias = "active")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: RuleCategory::default(),
            severity: Priority::default(),
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

impl Entity for Rule {
    const COLLECTION: Collection = Collection::Rules;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("title", FieldKind::Text),
        FieldDef::required("description", FieldKind::Text),
        FieldDef::optional("category", FieldKind::Choice(RuleCategory::NAMES)),
        FieldDef::optional("severity", FieldKind::Choice(Priority::NAMES)),
        FieldDef::optional("isActive", FieldKind::Bool),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["title", "description"];
    const FILTER_FIELDS: &'static [&'static str] = &["category", "severity", "status"];
    const ORDER: SortOrder = SortOrder::Severity;

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn partition(&self) -> &'static str {
        active_label(self.is_active)
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.severity)
    }

    fn display_name(&self) -> &str {
        &self.title
    }

    fn derived(&self, field: &str) -> Option<String> {
        (field == "status").then(|| self.partition().to_string())
    }
}

impl Toggle for Rule {
    fn is_active(&self) -> bool {
        self.is_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Label;
    use serde_json::json;

    #[test]
    fn defaults_are_active_general_medium() {
        let d = Rule::defaults();
        assert_eq!(d.get("isActive"), Some(&json!(true)));
        assert_eq!(d.get("category"), Some(&json!("general")));
        assert_eq!(d.get("severity"), Some(&json!("medium")));
    }

    #[test]
    fn severity_drives_priority_stats() {
        let r: Rule = serde_json::from_value(json!({
            "title": "Phones off", "description": "During class", "severity": "critical"
        }))
        .unwrap();
        assert_eq!(r.priority(), Some(Priority::Critical));
        assert_eq!(r.partition(), "active");
        assert_eq!(RuleCategory::parse("payment"), Some(RuleCategory::Payment));
    }
}
