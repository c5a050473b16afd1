//! Bulk record generation: monthly invoices, salaries, SMS.
//!
//! One create per selected recipient. Runs are not transactional: every
//! recipient is attempted, successes are never rolled back, and the
//! [`BatchReport`] says exactly what happened to whom.

use academy_core::{parse_date, ServiceError};
use academy_store::DocumentStore;
use serde::Serialize;
use tracing::{info, warn};

use crate::entity::{Entity, Keyed};
use crate::form::insert;
use crate::model::{
    render_template, Employee, Family, Invoice, InvoiceStatus, Salary,
    SalaryStatus, SmsMessage, SmsStatus,
};

/// A billing month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub month: u32,
    pub year: i32,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Result<Self, ServiceError> {
        crate::model::ensure_month(month)?;
        Ok(Self { month, year })
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Options shared by the generators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Skip recipients that already have a record for the period.
    pub skip_existing: bool,
}

/// A record created for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Created {
    pub recipient: String,
    pub key: String,
}

/// A recipient whose record could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub recipient: String,
    pub error: String,
}

/// Outcome of one bulk run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub created: Vec<Created>,
    pub failed: Vec<Failure>,
    /// Recipients deliberately not written to.
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.created.len() + self.failed.len()
    }

    async fn create<E: Entity>(&mut self, store: &dyn DocumentStore, recipient: &str, mut record: E) {
        record.normalize();
        let outcome = match record.check() {
            Ok(()) => insert(store, &record).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(key) => self.created.push(Created {
                recipient: recipient.to_string(),
                key,
            }),
            Err(e) => {
                warn!("{} for {recipient} failed: {e}", E::COLLECTION.noun());
                self.failed.push(Failure {
                    recipient: recipient.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn log(&self, what: &str) {
        info!(
            "{what}: {} created, {} failed, {} skipped",
            self.created.len(),
            self.failed.len(),
            self.skipped.len()
        );
    }
}

/// Dates stamped on every invoice of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRun {
    pub period: Period,
    pub issue_date: String,
    pub due_date: String,
}

impl InvoiceRun {
    pub fn new(
        period: Period,
        issue_date: impl Into<String>,
        due_date: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let run = Self {
            period,
            issue_date: issue_date.into(),
            due_date: due_date.into(),
        };
        match (parse_date(&run.issue_date), parse_date(&run.due_date)) {
            (Some(issue), Some(due)) if due >= issue => Ok(run),
            (Some(_), Some(_)) => Err(ServiceError::Validation(format!(
                "dueDate {} is before issueDate {}",
                run.due_date, run.issue_date
            ))),
            _ => Err(ServiceError::Validation(format!(
                "issue and due dates must be YYYY-MM-DD, got '{}' and '{}'",
                run.issue_date, run.due_date
            ))),
        }
    }
}

/// One pending invoice per family: `amount = monthlyFee × studentCount`.
pub async fn generate_monthly_invoices(
    store: &dyn DocumentStore,
    families: &[Keyed<Family>],
    run: &InvoiceRun,
    options: BatchOptions,
) -> Result<BatchReport, ServiceError> {
    let existing = if options.skip_existing {
        Keyed::<Invoice>::fetch_all(store).await?
    } else {
        Vec::new()
    };
    let Period { month, year } = run.period;

    let mut report = BatchReport::default();
    for family in families {
        if existing.iter().any(|inv| inv.record.covers(&family.key, month, year)) {
            report.skipped.push(family.key.clone());
            continue;
        }
        let f = &family.record;
        let invoice = Invoice {
            family_id: family.key.clone(),
            family_name: f.parent_name.clone(),
            amount: f.monthly_total(),
            month,
            year,
            due_date: run.due_date.clone(),
            issue_date: Some(run.issue_date.clone()),
            monthly_fee: Some(f.monthly_fee),
            student_count: Some(f.student_count),
            status: InvoiceStatus::Pending,
            ..Default::default()
        };
        report.create(store, &family.key, invoice).await;
    }
    report.log(&format!("invoices for {}", run.period));
    Ok(report)
}

/// One pending salary per active employee, at their current salary.
pub async fn generate_salaries(
    store: &dyn DocumentStore,
    employees: &[Keyed<Employee>],
    period: Period,
    options: BatchOptions,
) -> Result<BatchReport, ServiceError> {
    let existing = if options.skip_existing {
        Keyed::<Salary>::fetch_all(store).await?
    } else {
        Vec::new()
    };

    let mut report = BatchReport::default();
    for employee in employees {
        let e = &employee.record;
        let already = existing.iter().any(|s| {
            s.record.employee_id == employee.key
                && s.record.month == period.month
                && s.record.year == period.year
        });
        if !e.status.is_active() || already {
            report.skipped.push(employee.key.clone());
            continue;
        }
        let salary = Salary {
            employee_id: employee.key.clone(),
            employee_name: e.name.clone(),
            amount: e.salary,
            month: period.month,
            year: period.year,
            status: SalaryStatus::Pending,
            position: Some(e.position.clone()),
            department: Some(e.department.clone()),
            ..Default::default()
        };
        report.create(store, &employee.key, salary).await;
    }
    report.log(&format!("salaries for {period}"));
    Ok(report)
}

/// Queue one SMS per family, with `{name}` replaced by the parent's name.
pub async fn send_bulk_sms(
    store: &dyn DocumentStore,
    families: &[Keyed<Family>],
    template: &str,
) -> Result<BatchReport, ServiceError> {
    if template.trim().is_empty() {
        return Err(ServiceError::Validation("message is required".into()));
    }

    let mut report = BatchReport::default();
    for family in families {
        let f = &family.record;
        if f.phone.trim().is_empty() {
            report.skipped.push(family.key.clone());
            continue;
        }
        let sms = SmsMessage {
            recipient_phone: f.phone.trim().to_string(),
            message: render_template(template.trim(), &f.parent_name),
            recipient_name: Some(f.parent_name.clone()),
            family_id: Some(family.key.clone()),
            status: SmsStatus::Pending,
            ..Default::default()
        };
        report.create(store, &family.key, sms).await;
    }
    report.log("bulk sms");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ActiveStatus;
    use academy_store::MemoryStore;

    fn family(key: &str, name: &str, fee: f64, count: u32) -> Keyed<Family> {
        Keyed::new(
            key,
            Family {
                parent_name: name.into(),
                email: format!("{key}@families.test"),
                phone: "555-0100".into(),
                monthly_fee: fee,
                student_count: count,
                ..Default::default()
            },
        )
    }

    #[test]
    fn period_validation_and_display() {
        assert_eq!(Period::new(3, 2026).unwrap().to_string(), "2026-03");
        assert!(Period::new(0, 2026).is_err());
        assert!(Period::new(13, 2026).is_err());
    }

    #[test]
    fn invoice_run_checks_dates() {
        let p = Period::new(10, 2026).unwrap();
        assert!(InvoiceRun::new(p, "2026-10-01", "2026-10-10").is_ok());
        assert!(InvoiceRun::new(p, "2026-10-10", "2026-10-01").is_err());
        assert!(InvoiceRun::new(p, "2026-10-01", "soon").is_err());
    }

    #[tokio::test]
    async fn skip_existing_avoids_duplicate_invoices() {
        let store = MemoryStore::new();
        let families = vec![family("f1", "Haddad", 60.0, 1), family("f2", "Nasser", 60.0, 2)];
        let run = InvoiceRun::new(Period::new(10, 2026).unwrap(), "2026-10-01", "2026-10-10").unwrap();

        let first = generate_monthly_invoices(&store, &families[..1], &run, BatchOptions::default())
            .await
            .unwrap();
        assert_eq!(first.created.len(), 1);

        let second = generate_monthly_invoices(
            &store,
            &families,
            &run,
            BatchOptions { skip_existing: true },
        )
        .await
        .unwrap();
        assert_eq!(second.skipped, vec!["f1".to_string()]);
        assert_eq!(second.created.len(), 1);
        assert_eq!(second.created[0].recipient, "f2");

        let all = Keyed::<Invoice>::fetch_all(&store).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn salaries_only_for_active_staff() {
        let store = MemoryStore::new();
        let staff = vec![
            Keyed::new(
                "e1",
                Employee {
                    name: "Sara".into(),
                    position: "Teacher".into(),
                    department: "Quran".into(),
                    salary: 900.0,
                    ..Default::default()
                },
            ),
            Keyed::new(
                "e2",
                Employee {
                    name: "Ali".into(),
                    salary: 500.0,
                    status: ActiveStatus::Inactive,
                    ..Default::default()
                },
            ),
        ];
        let report = generate_salaries(&store, &staff, Period::new(10, 2026).unwrap(), BatchOptions::default())
            .await
            .unwrap();
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.skipped, vec!["e2".to_string()]);

        let salaries = Keyed::<Salary>::fetch_all(&store).await.unwrap();
        assert_eq!(salaries[0].record.amount, 900.0);
        assert_eq!(salaries[0].record.employee_id, "e1");
        assert_eq!(salaries[0].record.status, SalaryStatus::Pending);
    }

    #[tokio::test]
    async fn sms_template_is_personalised() {
        let store = MemoryStore::new();
        let families = vec![family("f1", "Mrs Haddad", 60.0, 1), family("f2", "Mr Nasser", 60.0, 1)];
        let report = send_bulk_sms(&store, &families, "Dear {name}, fees are due.")
            .await
            .unwrap();
        assert_eq!(report.created.len(), 2);

        let mut messages: Vec<String> = Keyed::<SmsMessage>::fetch_all(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.record.message)
            .collect();
        messages.sort();
        assert_eq!(
            messages,
            vec!["Dear Mr Nasser, fees are due.", "Dear Mrs Haddad, fees are due."]
        );
    }

    #[tokio::test]
    async fn blank_template_writes_nothing() {
        let store = MemoryStore::new();
        let err = send_bulk_sms(&store, &[family("f1", "A", 1.0, 1)], "  ")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn invalid_recipient_is_reported_not_fatal() {
        let store = MemoryStore::new();
        let families = vec![family("f1", "Haddad", -60.0, 1), family("f2", "Nasser", 60.0, 1)];
        let run = InvoiceRun::new(Period::new(10, 2026).unwrap(), "2026-10-01", "2026-10-10").unwrap();
        let report = generate_monthly_invoices(&store, &families, &run, BatchOptions::default())
            .await
            .unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].recipient, "f1");
        assert_eq!(report.created.len(), 1);
        assert!(!report.is_complete());
        assert_eq!(report.attempted(), 2);
    }
}
