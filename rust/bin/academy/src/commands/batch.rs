//! Bulk generation commands.

use academy::model::{Employee, Family};
use academy::{
    generate_monthly_invoices, generate_salaries, send_bulk_sms, BatchOptions, BatchReport,
    Collection, InvoiceRun, Keyed, Period,
};
use academy_store::DocumentStore;
use anyhow::Result;

use super::context::App;

/// The named families, or every active family when none are named.
async fn select_families(store: &dyn DocumentStore, keys: &[String]) -> Result<Vec<Keyed<Family>>> {
    if keys.is_empty() {
        let all = Keyed::<Family>::fetch_all(store).await?;
        return Ok(all.into_iter().filter(|f| f.record.status.is_active()).collect());
    }
    let mut families = Vec::with_capacity(keys.len());
    for key in keys {
        families.push(Keyed::<Family>::fetch(store, key).await?);
    }
    Ok(families)
}

pub async fn invoices(
    app: &App,
    month: u32,
    year: i32,
    issue: Option<&str>,
    due: &str,
    family_keys: &[String],
    skip_existing: bool,
) -> Result<BatchReport> {
    app.manage(Collection::Invoices.path())?;
    let issue = match issue {
        Some(date) => date.to_string(),
        None => chrono::Local::now().date_naive().format("%Y-%m-%d").to_string(),
    };
    let run = InvoiceRun::new(Period::new(month, year)?, issue, due)?;
    let store = app.store.as_ref();
    let families = select_families(store, family_keys).await?;
    if families.is_empty() {
        anyhow::bail!("No families selected.");
    }
    let report = generate_monthly_invoices(store, &families, &run, BatchOptions { skip_existing }).await?;
    Ok(report)
}

pub async fn salaries(app: &App, month: u32, year: i32, skip_existing: bool) -> Result<BatchReport> {
    app.manage(Collection::Salaries.path())?;
    let period = Period::new(month, year)?;
    let store = app.store.as_ref();
    let employees = Keyed::<Employee>::fetch_all(store).await?;
    let report = generate_salaries(store, &employees, period, BatchOptions { skip_existing }).await?;
    Ok(report)
}

pub async fn sms(app: &App, message: &str, family_keys: &[String]) -> Result<BatchReport> {
    app.manage(Collection::SmsMessages.path())?;
    let store = app.store.as_ref();
    let families = select_families(store, family_keys).await?;
    let report = send_bulk_sms(store, &families, message).await?;
    Ok(report)
}
