//! Admin core of the academy: typed records for every collection, live list
//! views, draft forms, status workflows and bulk generation, all running
//! against an [`academy_store::DocumentStore`].

pub mod batch;
pub mod collection;
pub mod entity;
pub mod form;
pub mod model;
pub mod record;
pub mod view;
pub mod workflow;

pub use batch::{
    generate_monthly_invoices, generate_salaries, send_bulk_sms, BatchOptions, BatchReport,
    InvoiceRun, Period,
};
pub use collection::{ensure_can_manage, menu_for, Collection};
pub use entity::{ActiveStatus, Entity, FieldDef, FieldKind, Keyed, Label, Priority, SortOrder};
pub use form::{delete, FormController, FormMode};
pub use record::Record;
pub use view::{ListModel, ListQuery, ListView, LoadState, Stats};
pub use workflow::{
    apply, apply_to, available_actions, plan, set_student_status, toggle_active, ActionContext,
    Toggle, Workflow,
};
