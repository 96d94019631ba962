//! CSV import provider.
//!
//! Reads price history exported from a finance site, one file per symbol:
//! `{dir}/{SYMBOL}.csv` with a `Date,Open,High,Low,Close[,Adj Close,Volume]`
//! header. Blank, `null` and `NaN` cells become missing values; the gate
//! decides later whether what remains is usable.

use super::provider::{DataError, DataProvider, DataSource, RawBar, RawSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date", alias = "date")]
    date: String,
    #[serde(rename = "Open", alias = "open", default)]
    open: Option<String>,
    #[serde(rename = "High", alias = "high", default)]
    high: Option<String>,
    #[serde(rename = "Low", alias = "low", default)]
    low: Option<String>,
    #[serde(rename = "Close", alias = "close", default)]
    close: Option<String>,
    #[serde(rename = "Volume", alias = "volume", default)]
    volume: Option<String>,
}

/// Provider backed by a directory of per-symbol CSV files.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the CSV file for a symbol: `{dir}/{SYMBOL}.csv`.
    pub fn symbol_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Read every bar in a CSV file, sorted by date ascending.
    pub fn read_file(path: &Path) -> Result<Vec<RawBar>, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .map_err(|e| match e.kind() {
                csv::ErrorKind::Io(io) => DataError::Io(format!("{}: {io}", path.display())),
                _ => DataError::Csv(format!("{}: {e}", path.display())),
            })?;

        let mut bars = Vec::new();
        for (line, record) in reader.deserialize::<CsvRow>().enumerate() {
            let row = record.map_err(|e| DataError::Csv(format!("row {}: {e}", line + 2)))?;
            bars.push(parse_row(row, line + 2)?);
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn parse_row(row: CsvRow, line: usize) -> Result<RawBar, DataError> {
    // Exports carry either a bare date or a timestamp with a time suffix.
    let date_part = row.date.get(..10).unwrap_or(&row.date);
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| DataError::Csv(format!("row {line}: invalid date '{}': {e}", row.date)))?;

    Ok(RawBar {
        date,
        open: parse_price(row.open.as_deref()),
        high: parse_price(row.high.as_deref()),
        low: parse_price(row.low.as_deref()),
        close: parse_price(row.close.as_deref()),
        volume: parse_price(row.volume.as_deref())
            .filter(|v| *v >= 0.0)
            .map(|v| v as u64),
    })
}

fn parse_price(raw: Option<&str>) -> Option<f64> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, DataError> {
        let path = self.symbol_path(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let bars: Vec<RawBar> = Self::read_file(&path)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();

        Ok(RawSeries::new(symbol, bars, DataSource::CsvImport))
    }
}
