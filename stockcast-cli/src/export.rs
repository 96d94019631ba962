//! Forecast export: CSV rows or a JSON document with a report summary.
//!
//! The format is picked from the file extension (`.csv` or `.json`).

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use stockcast_core::data::DataSource;
use stockcast_core::{ForecastRow, GateReport};

/// Bumped whenever the JSON layout changes.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => bail!(
                "cannot infer export format from {} (use .csv or .json)",
                path.display()
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportSummary<'a> {
    schema_version: u32,
    symbol: &'a str,
    source: DataSource,
    horizon_years: u32,
    horizon_days: u32,
    window_start: NaiveDate,
    window_end: NaiveDate,
    raw_rows: usize,
    training_rows: usize,
    forecast_rows: usize,
    generated_at: NaiveDate,
}

#[derive(Debug, Serialize)]
struct ForecastDocument<'a> {
    report: ReportSummary<'a>,
    forecast: &'a [ForecastRow],
}

/// Serialize forecast rows as CSV with a header row.
pub fn forecast_csv(rows: &[ForecastRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row).context("failed to write forecast row")?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Serialize the report summary and every forecast row as pretty JSON.
pub fn forecast_json(report: &GateReport, generated_at: NaiveDate) -> Result<String> {
    let doc = ForecastDocument {
        report: ReportSummary {
            schema_version: SCHEMA_VERSION,
            symbol: &report.symbol,
            source: report.raw.source,
            horizon_years: report.horizon.years(),
            horizon_days: report.horizon.days(),
            window_start: report.start,
            window_end: report.end,
            raw_rows: report.raw.len(),
            training_rows: report.training.len(),
            forecast_rows: report.forecast.len(),
            generated_at,
        },
        forecast: report.forecast.rows(),
    };
    serde_json::to_string_pretty(&doc).context("failed to serialize forecast to JSON")
}

/// Write `report` to `path` in the format its extension names.
pub fn write_export(path: &Path, report: &GateReport, generated_at: NaiveDate) -> Result<()> {
    let content = match ExportFormat::from_path(path)? {
        ExportFormat::Csv => forecast_csv(report.forecast.rows())?,
        ExportFormat::Json => forecast_json(report, generated_at)?,
    };
    std::fs::write(path, content)
        .with_context(|| format!("failed to write export {}", path.display()))
}
