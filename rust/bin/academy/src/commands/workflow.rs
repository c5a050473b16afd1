//! Status changes: workflow actions, active toggles and student status.

use academy::model::{Complaint, Country, Invoice, Request, Rule, Salary, StudentStatus, TestStatus};
use academy::{
    apply, apply_to, set_student_status, toggle_active, ActionContext, Collection, Label, Toggle,
    Workflow,
};
use academy_core::ServiceError;
use anyhow::Result;

use super::context::App;

/// Run `action` on `key`. A status name is accepted in place of an action.
async fn run<W: Workflow>(
    app: &App,
    key: &str,
    action: &str,
    ctx: &ActionContext,
) -> Result<&'static str, ServiceError> {
    let store = app.store.as_ref();
    let is_action = W::TRANSITIONS.iter().any(|t| t.action == action);
    let next = match W::Status::parse(action) {
        Some(target) if !is_action => apply_to::<W>(store, key, target, ctx).await?,
        _ => apply::<W>(store, key, action, ctx).await?,
    };
    Ok(next.as_str())
}

pub async fn transition(
    app: &App,
    name: &str,
    key: &str,
    action: &str,
    response: Option<String>,
) -> Result<()> {
    let collection = app.manage(name)?;
    let ctx = app.action_context(response);
    let next = match collection {
        Collection::Complaints => run::<Complaint>(app, key, action, &ctx).await?,
        Collection::Requests => run::<Request>(app, key, action, &ctx).await?,
        Collection::TestStatus => run::<TestStatus>(app, key, action, &ctx).await?,
        Collection::Invoices => run::<Invoice>(app, key, action, &ctx).await?,
        Collection::Salaries => run::<Salary>(app, key, action, &ctx).await?,
        other => anyhow::bail!("{other} has no status workflow"),
    };
    println!("{} {key} is now {next}.", collection.noun());
    Ok(())
}

async fn flip<E: Toggle>(app: &App, key: &str) -> Result<bool, ServiceError> {
    toggle_active::<E>(app.store.as_ref(), key).await
}

pub async fn toggle(app: &App, name: &str, key: &str) -> Result<()> {
    let collection = app.manage(name)?;
    let active = match collection {
        Collection::Rules => flip::<Rule>(app, key).await?,
        Collection::Countries => flip::<Country>(app, key).await?,
        other => anyhow::bail!("{other} cannot be toggled"),
    };
    let label = if active { "active" } else { "inactive" };
    println!("{} {key} is now {label}.", collection.noun());
    Ok(())
}

pub async fn student_status(app: &App, key: &str, status: &str) -> Result<()> {
    app.manage(Collection::Students.path())?;
    let status = StudentStatus::parse(status).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown student status '{status}'; expected one of: {}",
            StudentStatus::NAMES.join(", ")
        )
    })?;
    set_student_status(app.store.as_ref(), key, status).await?;
    println!("student {key} is now {status}.");
    Ok(())
}
