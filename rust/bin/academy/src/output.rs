//! Table and JSON rendering.

use academy::model::InvoiceTotals;
use academy::{BatchReport, Entity, Keyed, Record, Stats};
use anyhow::Result;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Output {
    Table,
    Json,
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn short_date(ts: &str) -> &str {
    ts.get(..10).unwrap_or(ts)
}

pub fn print_list<E: Entity>(rows: &[Keyed<E>], stats: &Stats, out: Output) -> Result<()> {
    if out == Output::Json {
        return print_json(&json!({ "items": rows, "stats": stats }));
    }

    println!("{:<34} {:<12} {:<28} CREATED", "KEY", "STATUS", "NAME");
    for row in rows {
        println!(
            "{:<34} {:<12} {:<28} {}",
            row.key,
            row.record.partition(),
            row.record.display_name(),
            short_date(row.record.created_at())
        );
    }
    println!();
    println!("{} of {} shown", rows.len(), stats.total);
    let by_status: Vec<String> = stats.by_status.iter().map(|(k, n)| format!("{k}={n}")).collect();
    if !by_status.is_empty() {
        println!("status:   {}", by_status.join(" "));
    }
    let by_priority: Vec<String> = stats.by_priority.iter().map(|(k, n)| format!("{k}={n}")).collect();
    if !by_priority.is_empty() {
        println!("priority: {}", by_priority.join(" "));
    }
    Ok(())
}

pub fn print_totals(totals: &InvoiceTotals, currency: &str, out: Output) -> Result<()> {
    if out == Output::Json {
        return print_json(&json!({ "totals": totals, "currency": currency }));
    }
    println!(
        "revenue:  paid {:.2} / pending {:.2} / overdue {:.2} / total {:.2} {currency}",
        totals.paid, totals.pending, totals.overdue, totals.total
    );
    Ok(())
}

pub fn print_record(key: &str, record: &Record, out: Output) -> Result<()> {
    let fields = record.to_value()?;
    if out == Output::Json {
        return print_json(&json!({ "key": key, "kind": record.collection().noun(), "record": fields }));
    }
    println!("{:<16} {key}", "key");
    if let Some(map) = fields.as_object() {
        for (field, value) in map {
            let text = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            println!("{field:<16} {text}");
        }
    }
    Ok(())
}

pub fn print_report(report: &BatchReport, out: Output) -> Result<()> {
    if out == Output::Json {
        return print_json(report);
    }
    for created in &report.created {
        println!("created  {:<34} -> {}", created.recipient, created.key);
    }
    for skipped in &report.skipped {
        println!("skipped  {skipped}");
    }
    for failure in &report.failed {
        println!("FAILED   {:<34} {}", failure.recipient, failure.error);
    }
    println!(
        "{} created, {} failed, {} skipped",
        report.created.len(),
        report.failed.len(),
        report.skipped.len()
    );
    if !report.is_complete() {
        anyhow::bail!("{} recipient(s) failed", report.failed.len());
    }
    Ok(())
}
