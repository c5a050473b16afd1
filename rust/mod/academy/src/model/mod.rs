//! Entity records, one serde struct per collection.

mod billing;
mod country;
mod family;
mod feedback;
mod messaging;
mod rule;
mod staff;
mod testing;

use academy_core::ServiceError;

pub use billing::{invoice_totals, Invoice, InvoiceStatus, InvoiceTotals};
pub use country::Country;
pub use family::{Family, Student, StudentStatus};
pub use feedback::{Complaint, ComplaintCategory, ComplaintStatus, Request, RequestStatus};
pub use messaging::{render_template, SmsMessage, SmsStatus, MAX_MESSAGE_CHARS};
pub use rule::{Rule, RuleCategory};
pub use staff::{Employee, Salary, SalaryStatus};
pub use testing::{Grade, TestPhase, TestReport, TestStatus};

pub(crate) fn ensure_month(month: u32) -> Result<(), ServiceError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "month must be between 1 and 12, got {month}"
        )))
    }
}

pub(crate) fn default_true() -> bool {
    true
}
