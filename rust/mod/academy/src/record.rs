use academy_core::ServiceError;
use serde::Serialize;
use serde_json::Value;

use crate::collection::Collection;
use crate::entity::Entity;
use crate::model::{
    Complaint, Country, Employee, Family, Invoice, Request, Rule, Salary, SmsMessage, Student,
    TestReport, TestStatus,
};

/// Run `$body` with `$E` bound to the entity type stored in `$collection`.
///
/// ```ignore
/// let n = with_entity!(collection, E => E::FIELDS.len());
/// ```
#[macro_export]
macro_rules! with_entity {
    ($collection:expr, $E:ident => $body:expr) => {
        match $collection {
            $crate::Collection::Employees => { type $E = $crate::model::Employee; $body }
            $crate::Collection::Families => { type $E = $crate::model::Family; $body }
            $crate::Collection::Students => { type $E = $crate::model::Student; $body }
            $crate::Collection::Countries => { type $E = $crate::model::Country; $body }
            $crate::Collection::Invoices => { type $E = $crate::model::Invoice; $body }
            $crate::Collection::Salaries => { type $E = $crate::model::Salary; $body }
            $crate::Collection::Rules => { type $E = $crate::model::Rule; $body }
            $crate::Collection::Requests => { type $E = $crate::model::Request; $body }
            $crate::Collection::Complaints => { type $E = $crate::model::Complaint; $body }
            $crate::Collection::SmsMessages => { type $E = $crate::model::SmsMessage; $body }
            $crate::Collection::TestReports => { type $E = $crate::model::TestReport; $body }
            $crate::Collection::TestStatus => { type $E = $crate::model::TestStatus; $body }
        }
    };
}

/// Any stored record, tagged by its entity type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "camelCase")]
pub enum Record {
    Employee(Employee),
    Family(Family),
    Student(Student),
    Country(Country),
    Invoice(Invoice),
    Salary(Salary),
    Rule(Rule),
    Request(Request),
    Complaint(Complaint),
    SmsMessage(SmsMessage),
    TestReport(TestReport),
    TestStatus(TestStatus),
}

macro_rules! each_record {
    ($self:expr, $r:ident => $body:expr) => {
        match $self {
            Record::Employee($r) => $body,
            Record::Family($r) => $body,
            Record::Student($r) => $body,
            Record::Country($r) => $body,
            Record::Invoice($r) => $body,
            Record::Salary($r) => $body,
            Record::Rule($r) => $body,
            Record::Request($r) => $body,
            Record::Complaint($r) => $body,
            Record::SmsMessage($r) => $body,
            Record::TestReport($r) => $body,
            Record::TestStatus($r) => $body,
        }
    };
}

impl Record {
    /// Decode a raw stored value as the entity of `collection`.
    pub fn decode(collection: Collection, value: Value) -> Result<Self, ServiceError> {
        let decoded = match collection {
            Collection::Employees => Employee::decode(value).map(Self::Employee),
            Collection::Families => Family::decode(value).map(Self::Family),
            Collection::Students => Student::decode(value).map(Self::Student),
            Collection::Countries => Country::decode(value).map(Self::Country),
            Collection::Invoices => Invoice::decode(value).map(Self::Invoice),
            Collection::Salaries => Salary::decode(value).map(Self::Salary),
            Collection::Rules => Rule::decode(value).map(Self::Rule),
            Collection::Requests => Request::decode(value).map(Self::Request),
            Collection::Complaints => Complaint::decode(value).map(Self::Complaint),
            Collection::SmsMessages => SmsMessage::decode(value).map(Self::SmsMessage),
            Collection::TestReports => TestReport::decode(value).map(Self::TestReport),
            Collection::TestStatus => TestStatus::decode(value).map(Self::TestStatus),
        };
        decoded.map_err(|e| ServiceError::Validation(format!("invalid {}: {e}", collection.noun())))
    }

    pub fn collection(&self) -> Collection {
        each_record!(self, r => entity_collection(r))
    }

    pub fn created_at(&self) -> &str {
        each_record!(self, r => r.created_at())
    }

    pub fn display_name(&self) -> &str {
        each_record!(self, r => r.display_name())
    }

    pub fn partition(&self) -> &'static str {
        each_record!(self, r => r.partition())
    }

    /// The stored JSON object.
    pub fn to_value(&self) -> Result<Value, ServiceError> {
        each_record!(self, r => r.to_fields().map(Value::Object))
    }
}

fn entity_collection<E: Entity>(_: &E) -> Collection {
    E::COLLECTION
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_dispatches_on_collection() {
        let r = Record::decode(
            Collection::Countries,
            json!({"countryName": "Oman", "countryCode": "OM"}),
        )
        .unwrap();
        assert!(matches!(r, Record::Country(_)));
        assert_eq!(r.collection(), Collection::Countries);
        assert_eq!(r.display_name(), "Oman");
        assert_eq!(r.partition(), "active");
    }

    #[test]
    fn decode_rejects_unknown_status() {
        let err = Record::decode(
            Collection::TestStatus,
            json!({"studentName": "Omar", "subject": "Math", "scheduledDate": "2026-10-01",
                   "status": "postponed"}),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert!(err.to_string().starts_with("invalid test status"));
    }

    #[test]
    fn tagged_serialization() {
        let r = Record::decode(Collection::Rules, json!({"title": "A", "description": "B"})).unwrap();
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["kind"], json!("rule"));
        assert_eq!(v["record"]["isActive"], json!(true));
    }

    #[test]
    fn with_entity_binds_the_type() {
        for c in Collection::ALL {
            let path = with_entity!(*c, E => E::COLLECTION.path());
            assert_eq!(path, c.path());
        }
    }
}
