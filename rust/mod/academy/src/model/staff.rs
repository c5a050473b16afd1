use academy_core::ServiceError;
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::entity::{
    ensure_date, ensure_non_negative, label_enum, ActiveStatus, Entity, FieldDef, FieldKind,
    Label,
};
use crate::workflow::{Effect, Transition, Workflow};

// ---------------------------------------------------------------------------
// Employee
// ---------------------------------------------------------------------------

/// A member of staff (teacher, coordinator, accountant, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub department: String,
    /// Monthly salary.
    pub salary: f64,

    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl Entity for Employee {
    const COLLECTION: Collection = Collection::Employees;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("name", FieldKind::Text),
        FieldDef::required("email", FieldKind::Text),
        FieldDef::required("phone", FieldKind::Text),
        FieldDef::required("position", FieldKind::Text),
        FieldDef::required("department", FieldKind::Text),
        FieldDef::required("salary", FieldKind::Number),
        FieldDef::optional("status", FieldKind::Choice(ActiveStatus::NAMES)),
        FieldDef::optional("joinDate", FieldKind::Date),
        FieldDef::optional("address", FieldKind::Text),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "email", "position"];
    const FILTER_FIELDS: &'static [&'static str] = &["department", "status"];

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
        ensure_non_negative("salary", self.salary)?;
        if let Some(date) = &self.join_date {
            ensure_date("joinDate", date)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Salary
// ---------------------------------------------------------------------------

label_enum! {
    /// Payment state of a salary record.
    ///
    /// ```text
    /// pending → paid
    /// ```
    pub enum SalaryStatus {
        Pending = "pending",
        Paid = "paid",
    }
    default Pending
}

/// One month's salary for one employee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Salary {
    pub employee_id: String,
    pub employee_name: String,
    pub amount: f64,
    pub month: u32,
    pub year: i32,

    #[serde(default)]
    pub status: SalaryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl Entity for Salary {
    const COLLECTION: Collection = Collection::Salaries;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("employeeId", FieldKind::Text),
        FieldDef::required("employeeName", FieldKind::Text),
        FieldDef::required("amount", FieldKind::Number),
        FieldDef::required("month", FieldKind::Integer),
        FieldDef::required("year", FieldKind::Integer),
        FieldDef::optional("position", FieldKind::Text),
        FieldDef::optional("department", FieldKind::Text),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["employeeName", "month"];
    const FILTER_FIELDS: &'static [&'static str] = &["status", "month", "year"];

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn partition(&self) -> &'static str {
        self.status.as_str()
    }

    fn display_name(&self) -> &str {
        &self.employee_name
    }

    fn check(&self) -> Result<(), ServiceError> {
        ensure_non_negative("amount", self.amount)?;
        super::ensure_month(self.month)
    }
}

impl Workflow for Salary {
    type Status = SalaryStatus;
    const TRANSITIONS: &'static [Transition<SalaryStatus>] = &[Transition {
        from: &[SalaryStatus::Pending],
        action: "pay",
        to: SalaryStatus::Paid,
        effects: &[Effect::Stamp("paidAt")],
    }];

    fn status(&self) -> SalaryStatus {
        self.status
    }
}
