use std::cmp::Ordering;
use std::fmt::Debug;

use academy_core::{parse_date, ServiceError};
use academy_store::DocumentStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::collection::Collection;

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

// ---------------------------------------------------------------------------
// Field schema
// ---------------------------------------------------------------------------

/// Value type of a form field, used to coerce raw text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Integer,
    Bool,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// One of a closed set of labels.
    Choice(&'static [&'static str]),
}

/// One editable field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldDef {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: true }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: false }
    }

    pub fn find(fields: &'static [FieldDef], name: &str) -> Option<&'static FieldDef> {
        fields.iter().find(|f| f.name == name)
    }

    /// Turn raw text input into the JSON value stored for this field.
    ///
    /// Blank input yields `Value::Null`, which clears the field.
    pub fn coerce(&self, raw: &str) -> Result<Value, ServiceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Value::Null);
        }
        let bad = |what: &str| {
            ServiceError::Validation(format!("{}: '{raw}' is not {what}", self.name))
        };
        match self.kind {
            FieldKind::Text => Ok(Value::String(raw.to_string())),
            FieldKind::Number => {
                let n: f64 = raw.parse().map_err(|_| bad("a number"))?;
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .ok_or_else(|| bad("a finite number"))
            }
            FieldKind::Integer => {
                let n: i64 = raw.parse().map_err(|_| bad("a whole number"))?;
                Ok(Value::from(n))
            }
            FieldKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Value::Bool(true)),
                "false" | "no" | "0" | "off" => Ok(Value::Bool(false)),
                _ => Err(bad("true or false")),
            },
            FieldKind::Date => parse_date(raw)
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .ok_or_else(|| bad("a YYYY-MM-DD date")),
            FieldKind::Choice(options) => {
                if options.contains(&raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(ServiceError::Validation(format!(
                        "{}: '{raw}' is not one of {}",
                        self.name,
                        options.join(", ")
                    )))
                }
            }
        }
    }

    fn is_textual(&self) -> bool {
        matches!(self.kind, FieldKind::Text | FieldKind::Date | FieldKind::Choice(_))
    }
}

/// Whether a draft value counts as filled in for a required field.
pub fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Labels (closed enumerations)
// ---------------------------------------------------------------------------

/// A closed enumeration stored as a fixed string label.
pub trait Label: Copy + Eq + Debug + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

/// Declare a label enum: serde names, `Label`, `Display`, `Default`, and an
/// inherent `NAMES` list for field schemas.
macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident = $text:literal),+ $(,)? }
        default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant,)+
        }

        impl $name {
            pub const NAMES: &'static [&'static str] = &[$($text),+];
        }

        impl $crate::entity::Label for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::entity::Label::as_str(self))
            }
        }
    };
}
pub(crate) use label_enum;

label_enum! {
    /// Shared priority/severity scale. Declaration order is the sort rank.
    pub enum Priority {
        Critical = "critical",
        High = "high",
        Medium = "medium",
        Low = "low",
    }
    default Medium
}

impl Priority {
    /// Sort rank: critical first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

label_enum! {
    /// Two-state status used by employees and families.
    pub enum ActiveStatus {
        Active = "active",
        Inactive = "inactive",
    }
    default Active
}

impl ActiveStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Partition label for `isActive` records.
pub fn active_label(is_active: bool) -> &'static str {
    if is_active { "active" } else { "inactive" }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// How a list of records is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// `createdAt` descending.
    NewestFirst,
    /// Priority rank ascending, then `createdAt` descending.
    Severity,
    /// Display name, case-insensitive.
    Alphabetical,
}

/// A record type stored in one collection.
///
/// Implementors are plain serde structs; the associated constants describe
/// the form schema and the list behaviour shared by every entity.
pub trait Entity:
    Serialize + DeserializeOwned + Default + Clone + Debug + PartialEq + Send + Sync + 'static
{
    const COLLECTION: Collection;
    /// Editable fields, in form order.
    const FIELDS: &'static [FieldDef];
    /// Fields matched by free-text search.
    const SEARCH_FIELDS: &'static [&'static str];
    /// Fields accepted by list filters.
    const FILTER_FIELDS: &'static [&'static str];
    const ORDER: SortOrder = SortOrder::NewestFirst;

    fn created_at(&self) -> &str;

    /// Status label this record is counted under. Exactly one per record.
    fn partition(&self) -> &'static str;

    fn priority(&self) -> Option<Priority> {
        None
    }

    fn display_name(&self) -> &str;

    /// Value of a computed field (not stored) used by filters.
    fn derived(&self, _field: &str) -> Option<String> {
        None
    }

    /// Canonicalise field values in place.
    fn normalize(&mut self) {}

    /// Semantic checks beyond required fields.
    fn check(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Draft for a new record: type defaults of the optional editable fields.
    fn defaults() -> Map<String, Value> {
        let mut map = blank::<Self>();
        map.retain(|name, _| Self::FIELDS.iter().any(|f| f.name == name.as_str() && !f.required));
        map
    }

    /// Schema of an editable field. Anything else (status, workflow stamps,
    /// timestamps) is not settable through a draft.
    fn field(name: &str) -> Result<&'static FieldDef, ServiceError> {
        FieldDef::find(Self::FIELDS, name).ok_or_else(|| {
            ServiceError::Validation(format!(
                "{} has no editable field '{name}'",
                Self::COLLECTION.noun()
            ))
        })
    }

    /// Required fields that are missing or blank in `draft`.
    fn missing_required(draft: &Map<String, Value>) -> Vec<&'static str> {
        Self::FIELDS
            .iter()
            .filter(|f| f.required && !is_filled(draft.get(f.name)))
            .map(|f| f.name)
            .collect()
    }

    /// Validate a draft and build the typed record from it.
    fn from_draft(draft: &Map<String, Value>) -> Result<Self, ServiceError> {
        let missing = Self::missing_required(draft);
        if !missing.is_empty() {
            return Err(ServiceError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        for name in draft.keys() {
            Self::field(name)?;
        }

        // Non-editable fields start from the type defaults.
        let mut map = blank::<Self>();
        for field in Self::FIELDS {
            map.remove(field.name);
        }
        map.extend(draft.clone());
        for field in Self::FIELDS.iter().filter(|f| f.is_textual()) {
            let trimmed = match map.get(field.name) {
                Some(Value::String(s)) => s.trim().to_string(),
                _ => continue,
            };
            if trimmed.is_empty() {
                map.remove(field.name);
            } else {
                map.insert(field.name.to_string(), Value::String(trimmed));
            }
        }

        let mut record: Self = serde_json::from_value(Value::Object(map)).map_err(|e| {
            ServiceError::Validation(format!("invalid {}: {e}", Self::COLLECTION.noun()))
        })?;
        record.normalize();
        record.check()?;
        Ok(record)
    }

    /// Decode a stored record.
    fn decode(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Encode as the JSON object written to the store.
    fn to_fields(&self) -> Result<Map<String, Value>, ServiceError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ServiceError::Internal(format!(
                "{} encoded as non-object: {other}",
                Self::COLLECTION.noun()
            ))),
            Err(e) => Err(ServiceError::Internal(format!(
                "encode {}: {e}",
                Self::COLLECTION.noun()
            ))),
        }
    }
}

/// `E::default()` as a JSON object, without timestamps.
fn blank<E: Entity>() -> Map<String, Value> {
    let mut map = match serde_json::to_value(E::default()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    map.remove(CREATED_AT);
    map.remove(UPDATED_AT);
    map
}

/// Fail validation when a money or score field is negative.
pub fn ensure_non_negative(field: &str, value: f64) -> Result<(), ServiceError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ServiceError::Validation(format!(
            "{field} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

/// Fail validation when an optional date is present but malformed.
pub fn ensure_date(field: &str, value: &str) -> Result<(), ServiceError> {
    if parse_date(value).is_none() {
        return Err(ServiceError::Validation(format!(
            "{field} must be a YYYY-MM-DD date, got '{value}'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Keyed
// ---------------------------------------------------------------------------

/// A record paired with its store-generated key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyed<E> {
    pub key: String,
    #[serde(flatten)]
    pub record: E,
}

impl<E: Entity> Keyed<E> {
    pub fn new(key: impl Into<String>, record: E) -> Self {
        Self { key: key.into(), record }
    }

    pub fn path(&self) -> String {
        E::COLLECTION.record_path(&self.key)
    }

    /// Read one record by key.
    pub async fn fetch(store: &dyn DocumentStore, key: &str) -> Result<Self, ServiceError> {
        let noun = E::COLLECTION.noun();
        let path = E::COLLECTION.record_path(key);
        let value = store
            .get(&path)
            .await
            .map_err(|e| ServiceError::from(e).during(&format!("load {noun}")))?
            .ok_or_else(|| ServiceError::NotFound(format!("{noun} {key} does not exist")))?;
        let record = E::decode(value)
            .map_err(|e| ServiceError::Internal(format!("decode {noun} {key}: {e}")))?;
        Ok(Self::new(key, record))
    }

    /// Read a whole collection, in list order. Undecodable records are skipped.
    pub async fn fetch_all(store: &dyn DocumentStore) -> Result<Vec<Self>, ServiceError> {
        let value = store.get(E::COLLECTION.path()).await.map_err(|e| {
            ServiceError::from(e).during(&format!("load {}", E::COLLECTION.path()))
        })?;
        let mut model = crate::view::ListModel::<E>::new();
        model.load_value(value.as_ref());
        Ok(model.full().to_vec())
    }
}

/// List order for `E`, with the key as final tie-breaker.
pub fn compare<E: Entity>(a: &Keyed<E>, b: &Keyed<E>) -> Ordering {
    let newest_first = || b.record.created_at().cmp(a.record.created_at());
    let primary = match E::ORDER {
        SortOrder::NewestFirst => newest_first(),
        SortOrder::Severity => {
            let rank = |k: &Keyed<E>| k.record.priority().map_or(u8::MAX, |p| p.rank());
            rank(a).cmp(&rank(b)).then_with(newest_first)
        }
        SortOrder::Alphabetical => a
            .record
            .display_name()
            .to_lowercase()
            .cmp(&b.record.display_name().to_lowercase()),
    };
    primary.then_with(|| a.key.cmp(&b.key))
}
