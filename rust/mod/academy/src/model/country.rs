use academy_core::ServiceError;
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::entity::{active_label, Entity, FieldDef, FieldKind, SortOrder};
use crate::workflow::Toggle;

/// A country the academy enrolls students from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub country_name: String,
    /// ISO-style code, stored uppercase.
    pub country_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_count: Option<u32>,
    /// Older records store this flag as `active`.
    #[serde(default = "super::default_true", alias = "active")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl Default for Country {
    fn default() -> Self {
        Self {
            country_name: String::new(),
            country_code: String::new(),
            timezone: None,
            currency: None,
            student_count: None,
            teacher_count: None,
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

impl Entity for Country {
    const COLLECTION: Collection = Collection::Countries;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("countryName", FieldKind::Text),
        FieldDef::required("countryCode", FieldKind::Text),
        FieldDef::optional("timezone", FieldKind::Text),
        FieldDef::optional("currency", FieldKind::Text),
        FieldDef::optional("studentCount", FieldKind::Integer),
        FieldDef::optional("teacherCount", FieldKind::Integer),
        FieldDef::optional("isActive", FieldKind::Bool),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["countryName", "countryCode"];
    const FILTER_FIELDS: &'static [&'static str] = &["status"];
    const ORDER: SortOrder = SortOrder::Alphabetical;

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn partition(&self) -> &'static str {
        active_label(self.is_active)
    }

    fn display_name(&self) -> &str {
        &self.country_name
    }

    fn derived(&self, field: &str) -> Option<String> {
        (field == "status").then(|| self.partition().to_string())
    }

    fn normalize(&mut self) {
        self.country_code = self.country_code.trim().to_uppercase();
        if let Some(currency) = self.currency.as_mut() {
            *currency = currency.trim().to_uppercase();
        }
    }

    fn check(&self) -> Result<(), ServiceError> {
        if !self.country_code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ServiceError::Validation(format!(
                "countryCode must be letters only, got '{}'",
                self.country_code
            )));
        }
        Ok(())
    }
}

impl Toggle for Country {
    fn is_active(&self) -> bool {
        self.is_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn draft_defaults_to_active() {
        assert_eq!(Country::defaults(), json!({"isActive": true}).as_object().cloned().unwrap());
    }

    #[test]
    fn code_is_uppercased() {
        let mut d = Country::defaults();
        d.insert("countryName".into(), json!("Jordan"));
        d.insert("countryCode".into(), json!(" jo "));
        let c = Country::from_draft(&d).unwrap();
        assert_eq!(c.country_code, "JO");
        assert!(c.is_active);
        assert_eq!(c.timezone, None);
    }

    #[test]
    fn legacy_active_flag_is_accepted() {
        let c: Country = serde_json::from_value(json!({
            "countryName": "Oman", "countryCode": "OM", "active": false
        }))
        .unwrap();
        assert!(!c.is_active);
        assert_eq!(c.derived("status").as_deref(), Some("inactive"));
        let out = serde_json::to_value(&c).unwrap();
        assert_eq!(out["isActive"], json!(false));
        assert!(out.get("active").is_none());
    }

    #[test]
    fn missing_flag_means_active() {
        let c: Country =
            serde_json::from_value(json!({"countryName": "Qatar", "countryCode": "QA"})).unwrap();
        assert!(c.is_active);
    }

    #[test]
    fn code_must_be_letters() {
        let mut d = Country::defaults();
        d.insert("countryName".into(), json!("Nowhere"));
        d.insert("countryCode".into(), json!("N0"));
        assert!(Country::from_draft(&d).is_err());
    }
}
