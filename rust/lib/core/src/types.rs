use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Generate a new random key (UUIDv4, no dashes).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}

/// Get the current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Merge partial fields into a record, one level deep.
///
/// For each key in `fields`:
/// - `null` removes the key from `base`.
/// - any other value replaces the key wholesale (nested objects are not
///   merged recursively).
///
/// Keys absent from `fields` are left untouched. A non-object `base` is
/// replaced by an empty object first.
pub fn merge_fields(base: &mut Value, fields: &Map<String, Value>) {
    if !base.is_object() {
        *base = Value::Object(Map::new());
    }
    if let Some(obj) = base.as_object_mut() {
        for (key, value) in fields {
            if value.is_null() {
                obj.remove(key);
            } else {
                obj.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_id() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
        assert_ne!(id, new_id());
    }

    #[test]
    fn test_now_rfc3339() {
        let ts = now_rfc3339();
        assert!(ts.contains('T'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2026-10-05"), NaiveDate::from_ymd_opt(2026, 10, 5));
        assert_eq!(parse_date(" 2026-01-31 "), NaiveDate::from_ymd_opt(2026, 1, 31));
        assert!(parse_date("05/10/2026").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_merge_fields_shallow() {
        let mut base = json!({"a": 1, "b": 2, "c": {"d": 3}});
        let patch = json!({"b": null, "c": {"e": 4}, "f": 5});
        merge_fields(&mut base, patch.as_object().unwrap());
        assert_eq!(base, json!({"a": 1, "c": {"e": 4}, "f": 5}));
    }

    #[test]
    fn test_merge_fields_into_non_object() {
        let mut base = Value::Null;
        let patch = json!({"isActive": false});
        merge_fields(&mut base, patch.as_object().unwrap());
        assert_eq!(base, json!({"isActive": false}));
    }
}
