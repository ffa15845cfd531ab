use crate::archive::{create_write_once, run_stamp};
use crate::errors::PipelineError;
use crate::types::ScoredRow;
use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_HEADER: [&str; 12] = [
    "name",
    "title",
    "price",
    "miles",
    "link",
    "location",
    "price_value",
    "miles_value",
    "model_year",
    "age",
    "predicted_price",
    "residual",
];

fn fixed_columns(row: &ScoredRow) -> Vec<String> {
    let listing = &row.features.listing;
    let text = |field: &Option<String>| field.clone().unwrap_or_default();
    vec![
        text(&listing.name),
        text(&listing.title),
        text(&listing.price),
        text(&listing.miles),
        text(&listing.link),
        text(&listing.location),
        row.features.price_value.to_string(),
        row.features.miles_value.to_string(),
        row.features.model_year.to_string(),
        row.features.age.to_string(),
        row.predicted_price.to_string(),
        row.residual.to_string(),
    ]
}

/// Strings unquoted, null or missing as empty, anything else as compact JSON.
fn extra_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Input fields outside the fixed columns, sorted by name. A field whose
/// name shadows a computed column is left out.
fn extra_columns(deals: &[ScoredRow]) -> Vec<&str> {
    let names: BTreeSet<&str> = deals
        .iter()
        .flat_map(|deal| deal.features.listing.extra_fields().map(|(key, _)| key))
        .filter(|key| !REPORT_HEADER.contains(key))
        .collect();
    names.into_iter().collect()
}

/// Writes `<stamp>_best_deals.csv`: the fixed [`REPORT_HEADER`] columns,
/// then one trailing column per extra input field seen among `deals`. An
/// empty deal list still produces a file holding just the fixed header.
pub fn write_report(
    dir: &Path,
    deals: &[ScoredRow],
    run_at: &DateTime<Local>,
) -> Result<PathBuf, PipelineError> {
    let stem = format!("{}_best_deals", run_stamp(run_at));
    let (file, path) = create_write_once(dir, &stem, "csv").map_err(|source| PipelineError::Report {
        path: dir.join(format!("{}.csv", stem)),
        source,
    })?;

    let to_report_err = |path: &Path, e: csv::Error| PipelineError::Report {
        path: path.to_path_buf(),
        source: io::Error::other(e),
    };

    let extras = extra_columns(deals);
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer
        .write_record(REPORT_HEADER.iter().chain(extras.iter()))
        .map_err(|e| to_report_err(&path, e))?;
    for deal in deals {
        let original = &deal.features.listing.original;
        let mut record = fixed_columns(deal);
        record.extend(extras.iter().map(|key| extra_cell(original.get(*key))));
        writer
            .write_record(&record)
            .map_err(|e| to_report_err(&path, e))?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| PipelineError::Report {
            path: path.clone(),
            source: io::Error::new(e.error().kind(), e.error().to_string()),
        })?;
    file.sync_all()
        .map_err(|source| PipelineError::Report { path: path.clone(), source })?;

    info!("[Report] Saved {} deal(s) to {}", deals.len(), path.display());
    Ok(path)
}
