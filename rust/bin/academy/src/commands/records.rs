//! Generic record commands: list, get, create, edit, delete.

use academy::model::{invoice_totals, Invoice};
use academy::{with_entity, Collection, Entity, FormController, ListView, LoadState, Record};
use academy_core::ServiceError;
use anyhow::Result;
use serde_json::{Map, Value};
use tracing::warn;

use super::context::App;
use crate::output::{self, Output};

/// Field input from `--set k=v` pairs and an optional `--json` object.
#[derive(Debug, Default)]
pub struct Fields {
    json: Map<String, Value>,
    raw: Vec<(String, String)>,
}

/// Split `field=value`.
pub fn split_pair(pair: &str) -> Result<(&str, &str)> {
    pair.split_once('=')
        .map(|(k, v)| (k.trim(), v))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Expected field=value, got '{pair}'"))
}

pub fn parse_fields(set: &[String], json_body: Option<&str>) -> Result<Fields> {
    let json = match json_body {
        Some(body) => match serde_json::from_str(body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => anyhow::bail!("--json must be a JSON object"),
            Err(e) => anyhow::bail!("Invalid JSON: {e}"),
        },
        None => Map::new(),
    };
    let raw = set
        .iter()
        .map(|pair| split_pair(pair).map(|(k, v)| (k.to_string(), v.to_string())))
        .collect::<Result<Vec<_>>>()?;
    if json.is_empty() && raw.is_empty() {
        anyhow::bail!("Provide --set field=value or --json.");
    }
    Ok(Fields { json, raw })
}

fn fill<E: Entity>(form: &FormController<E>, fields: Fields) -> Result<(), ServiceError> {
    form.extend(fields.json)?;
    for (field, raw) in &fields.raw {
        form.assign(field, raw)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list / get
// ---------------------------------------------------------------------------

async fn open_view<E: Entity>(
    app: &App,
    search: Option<&str>,
    filters: &[String],
) -> Result<ListView<E>> {
    let view = ListView::<E>::activate(app.store.clone(), app.config.loading_timeout()).await;
    match view.settled().await {
        LoadState::Ready | LoadState::Loading => {}
        LoadState::TimedOut => {
            warn!("{} did not load in time", E::COLLECTION);
            anyhow::bail!("Timed out loading {}.", E::COLLECTION);
        }
        LoadState::Failed(msg) => anyhow::bail!("Loading {} failed: {msg}", E::COLLECTION),
    }
    if let Some(text) = search {
        view.set_search(text);
    }
    for pair in filters {
        let (field, value) = split_pair(pair)?;
        view.set_filter(field, value)?;
    }
    Ok(view)
}

pub async fn list(
    app: &App,
    name: &str,
    search: Option<&str>,
    filters: &[String],
    out: Output,
) -> Result<()> {
    let collection = app.collection(name)?;
    match collection {
        Collection::Invoices => {
            let view = open_view::<Invoice>(app, search, filters).await?;
            output::print_list(&view.filtered(), &view.stats(), out)?;
            let totals = invoice_totals(&view.full());
            output::print_totals(&totals, &app.config.currency, out)?;
        }
        other => with_entity!(other, E => {
            let view = open_view::<E>(app, search, filters).await?;
            output::print_list(&view.filtered(), &view.stats(), out)?;
        }),
    }
    Ok(())
}

pub async fn get(app: &App, name: &str, key: &str, out: Output) -> Result<()> {
    let collection = app.collection(name)?;
    let value = app
        .store
        .get(&collection.record_path(key))
        .await?
        .ok_or_else(|| anyhow::anyhow!("{} {key} does not exist", collection.noun()))?;
    let record = Record::decode(collection, value)?;
    output::print_record(key, &record, out)
}

// ---------------------------------------------------------------------------
// create / edit / delete
// ---------------------------------------------------------------------------

async fn submit_create<E: Entity>(app: &App, fields: Fields) -> Result<String, ServiceError> {
    let form = FormController::<E>::create(app.store.clone());
    fill(&form, fields)?;
    form.submit().await
}

async fn submit_edit<E: Entity>(app: &App, key: &str, fields: Fields) -> Result<String, ServiceError> {
    let form = FormController::<E>::edit(app.store.clone(), key).await?;
    fill(&form, fields)?;
    form.submit().await
}

pub async fn create(app: &App, name: &str, fields: Fields) -> Result<()> {
    let collection = app.manage(name)?;
    let key = with_entity!(collection, E => submit_create::<E>(app, fields).await)?;
    println!("{} {key} created.", collection.noun());
    Ok(())
}

pub async fn edit(app: &App, name: &str, key: &str, fields: Fields) -> Result<()> {
    let collection = app.manage(name)?;
    with_entity!(collection, E => submit_edit::<E>(app, key, fields).await)?;
    println!("{} {key} updated.", collection.noun());
    Ok(())
}

pub async fn delete(app: &App, name: &str, key: &str) -> Result<()> {
    let collection = app.manage(name)?;
    academy::delete(app.store.as_ref(), collection, key).await?;
    println!("{} {key} deleted.", collection.noun());
    Ok(())
}
