//! Path helpers shared by the store backends.

use serde_json::{Map, Value};

use crate::error::StoreError;

/// Characters a path segment may not contain.
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']'];

/// Normalize a path: strip leading/trailing `/`, reject empty or
/// forbidden segments.
pub fn normalize(path: &str) -> Result<String, StoreError> {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(StoreError::InvalidPath(format!("'{path}' is empty")));
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() {
            return Err(StoreError::InvalidPath(format!("'{path}' has an empty segment")));
        }
        if segment.contains(FORBIDDEN) {
            return Err(StoreError::InvalidPath(format!(
                "'{path}' contains one of {FORBIDDEN:?}"
            )));
        }
    }
    Ok(trimmed.to_string())
}

/// Join a collection path and a record key.
pub fn join(collection: &str, key: &str) -> String {
    format!("{collection}/{key}")
}

/// Whether `path` equals `ancestor` or lies below it.
pub fn is_under(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || (path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path.as_bytes()[ancestor.len()] == b'/')
}

/// Whether a change at `changed` alters the value seen at `watched`.
pub fn affects(changed: &str, watched: &str) -> bool {
    is_under(changed, watched) || is_under(watched, changed)
}

/// Assemble the value at `base` from stored `(full_path, document)` entries.
///
/// The document stored exactly at `base` (if any) is the starting object;
/// documents stored below `base` are nested in by their relative segments.
/// Returns `None` if no entry lies at or below `base`.
pub fn assemble<'a, I>(base: &str, entries: I) -> Option<Value>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut root: Option<Value> = None;
    for (full, doc) in entries {
        if full == base {
            match root.as_mut() {
                // Descendants seen first; fold them into the document.
                Some(Value::Object(children)) => {
                    let mut merged = doc.clone();
                    if let Some(obj) = merged.as_object_mut() {
                        for (k, v) in std::mem::take(children) {
                            obj.entry(k).or_insert(v);
                        }
                    }
                    root = Some(merged);
                }
                _ => root = Some(doc.clone()),
            }
            continue;
        }
        if !is_under(full, base) {
            continue;
        }
        let relative = &full[base.len() + 1..];
        let node = root.get_or_insert_with(|| Value::Object(Map::new()));
        insert_nested(node, relative, doc.clone());
    }
    root
}

fn insert_nested(node: &mut Value, relative: &str, doc: Value) {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(obj) = node else {
        return;
    };
    match relative.split_once('/') {
        None => {
            obj.insert(relative.to_string(), doc);
        }
        Some((head, rest)) => {
            let child = obj
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            insert_nested(child, rest, doc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_trims_slashes() {
        assert_eq!(normalize("/complaints/").unwrap(), "complaints");
        assert_eq!(normalize("complaints/abc").unwrap(), "complaints/abc");
    }

    #[test]
    fn normalize_rejects_bad_paths() {
        assert!(normalize("").is_err());
        assert!(normalize("///").is_err());
        assert!(normalize("a//b").is_err());
        assert!(normalize("rules/a.b").is_err());
        assert!(normalize("rules/$x").is_err());
    }

    #[test]
    fn is_under_respects_segment_boundary() {
        assert!(is_under("countries/abc", "countries"));
        assert!(is_under("countries", "countries"));
        assert!(!is_under("countries-x/abc", "countries"));
        assert!(!is_under("countriesabc", "countries"));
        assert!(!is_under("countries", "countries/abc"));
    }

    #[test]
    fn affects_both_directions() {
        assert!(affects("countries/abc", "countries"));
        assert!(affects("countries", "countries/abc"));
        assert!(!affects("rules/abc", "countries"));
    }

    #[test]
    fn assemble_collection() {
        let a = json!({"name": "A"});
        let b = json!({"name": "B"});
        let entries = vec![("rules/1", &a), ("rules/2", &b)];
        let v = assemble("rules", entries).unwrap();
        assert_eq!(v, json!({"1": {"name": "A"}, "2": {"name": "B"}}));
    }

    #[test]
    fn assemble_exact_record() {
        let a = json!({"name": "A"});
        let v = assemble("rules/1", vec![("rules/1", &a)]).unwrap();
        assert_eq!(v, a);
    }

    #[test]
    fn assemble_nothing() {
        let a = json!({"name": "A"});
        assert!(assemble("countries", vec![("rules/1", &a)]).is_none());
    }

    #[test]
    fn assemble_record_with_descendants() {
        let fam = json!({"parentName": "Huda"});
        let note = json!({"text": "call back"});
        let v = assemble("families/f1", vec![("families/f1", &fam), ("families/f1/notes/n1", &note)])
            .unwrap();
        assert_eq!(
            v,
            json!({"parentName": "Huda", "notes": {"n1": {"text": "call back"}}})
        );
    }
}
