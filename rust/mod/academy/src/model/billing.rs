use academy_core::{parse_date, ServiceError};
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::entity::{
    ensure_date, ensure_non_negative, label_enum, Entity, FieldDef, FieldKind, Keyed, Label,
};
use crate::workflow::{Effect, Transition, Workflow};

label_enum! {
    /// Payment state of an invoice.
    ///
    /// ```text
    /// pending → paid
    ///         → overdue → paid
    /// ```
    pub enum InvoiceStatus {
        Paid = "paid",
        Pending = "pending",
        Overdue = "overdue",
    }
    default Pending
}

/// A monthly bill raised against a family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub family_id: String,
    pub family_name: String,
    /// Snapshot of `monthly_fee × student_count` at generation time.
    pub amount: f64,
    pub month: u32,
    pub year: i32,
    pub due_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_count: Option<u32>,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl Invoice {
    /// Recompute the amount from the fee and head count, when both are known.
    pub fn computed_amount(&self) -> Option<f64> {
        Some(self.monthly_fee? * f64::from(self.student_count?))
    }

    /// Whether this invoice bills `family_id` for the given month.
    pub fn covers(&self, family_id: &str, month: u32, year: i32) -> bool {
        self.family_id == family_id && self.month == month && self.year == year
    }
}

impl Entity for Invoice {
    const COLLECTION: Collection = Collection::Invoices;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("familyId", FieldKind::Text),
        FieldDef::required("familyName", FieldKind::Text),
        FieldDef::required("amount", FieldKind::Number),
        FieldDef::required("month", FieldKind::Integer),
        FieldDef::required("year", FieldKind::Integer),
        FieldDef::required("dueDate", FieldKind::Date),
        FieldDef::optional("issueDate", FieldKind::Date),
        FieldDef::optional("monthlyFee", FieldKind::Number),
        FieldDef::optional("studentCount", FieldKind::Integer),
        FieldDef::optional("notes", FieldKind::Text),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["familyName", "month"];
    const FILTER_FIELDS: &'static [&'static str] = &["status", "month", "year"];

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn partition(&self) -> &'static str {
        self.status.as_str()
    }

    fn display_name(&self) -> &str {
        &self.family_name
    }

    fn check(&self) -> Result<(), ServiceError> {
        ensure_non_negative("amount", self.amount)?;
        if let Some(fee) = self.monthly_fee {
            ensure_non_negative("monthlyFee", fee)?;
        }
        super::ensure_month(self.month)?;
        ensure_date("dueDate", &self.due_date)?;
        if let Some(issue) = &self.issue_date {
            ensure_date("issueDate", issue)?;
            if parse_date(&self.due_date) < parse_date(issue) {
                return Err(ServiceError::Validation(format!(
                    "dueDate {} is before issueDate {issue}",
                    self.due_date
                )));
            }
        }
        Ok(())
    }
}

impl Workflow for Invoice {
    type Status = InvoiceStatus;
    const TRANSITIONS: &'static [Transition<InvoiceStatus>] = &[
        Transition {
            from: &[InvoiceStatus::Pending, InvoiceStatus::Overdue],
            action: "pay",
            to: InvoiceStatus::Paid,
            effects: &[Effect::Stamp("paidAt")],
        },
        Transition {
            from: &[InvoiceStatus::Pending],
            action: "mark_overdue",
            to: InvoiceStatus::Overdue,
            effects: &[],
        },
    ];

    fn status(&self) -> InvoiceStatus {
        self.status
    }
}

// ---------------------------------------------------------------------------
// Revenue summary
// ---------------------------------------------------------------------------

/// Invoice amounts summed by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct InvoiceTotals {
    pub paid: f64,
    pub pending: f64,
    pub overdue: f64,
    pub total: f64,
}

/// Sum invoice amounts by status over the full set.
pub fn invoice_totals<'a>(invoices: impl IntoIterator<Item = &'a Keyed<Invoice>>) -> InvoiceTotals {
    let mut totals = InvoiceTotals::default();
    for inv in invoices {
        let amount = inv.record.amount;
        match inv.record.status {
            InvoiceStatus::Paid => totals.paid += amount,
            InvoiceStatus::Pending => totals.pending += amount,
            InvoiceStatus::Overdue => totals.overdue += amount,
        }
        totals.total += amount;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn draft(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn invoice(amount: f64, status: InvoiceStatus) -> Keyed<Invoice> {
        Keyed::new(
            format!("k{amount}"),
            Invoice {
                amount,
                status,
                ..Default::default()
            },
        )
    }

    #[test]
    fn computed_amount_needs_both_inputs() {
        let mut inv = Invoice {
            monthly_fee: Some(60.0),
            student_count: Some(2),
            ..Default::default()
        };
        assert_eq!(inv.computed_amount(), Some(120.0));
        inv.student_count = None;
        assert_eq!(inv.computed_amount(), None);
    }

    #[test]
    fn due_date_may_not_precede_issue_date() {
        let base = json!({
            "familyId": "f1", "familyName": "Haddad", "amount": 60,
            "month": 10, "year": 2026, "dueDate": "2026-10-01", "issueDate": "2026-10-05"
        });
        let err = Invoice::from_draft(&draft(base.clone())).unwrap_err();
        assert!(err.to_string().contains("before issueDate"));

        let mut ok = draft(base);
        ok.insert("dueDate".into(), json!("2026-10-05"));
        assert!(Invoice::from_draft(&ok).is_ok());
    }

    #[test]
    fn totals_by_status() {
        let list = vec![
            invoice(60.0, InvoiceStatus::Paid),
            invoice(120.0, InvoiceStatus::Pending),
            invoice(180.0, InvoiceStatus::Overdue),
            invoice(40.0, InvoiceStatus::Pending),
        ];
        let t = invoice_totals(&list);
        assert_eq!(t.paid, 60.0);
        assert_eq!(t.pending, 160.0);
        assert_eq!(t.overdue, 180.0);
        assert_eq!(t.total, 400.0);
    }

    #[test]
    fn covers_matches_family_and_period() {
        let inv = Invoice {
            family_id: "f1".into(),
            month: 10,
            year: 2026,
            ..Default::default()
        };
        assert!(inv.covers("f1", 10, 2026));
        assert!(!inv.covers("f1", 11, 2026));
        assert!(!inv.covers("f2", 10, 2026));
    }
}
