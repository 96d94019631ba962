//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over price sources (Yahoo Finance, CSV
//! export, synthetic walk) so the readiness gate can swap implementations and
//! tests can script exactly what a retrieval returns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw daily bar from a data provider, before any cleaning.
///
/// Prices are optional: providers report gaps (halted sessions, partial rows)
/// as `None` instead of inventing a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl RawBar {
    /// Close price if present and finite.
    pub fn usable_close(&self) -> Option<f64> {
        self.close.filter(|c| c.is_finite())
    }
}

/// Structured error types for data operations.
///
/// These are displayable as-is in the CLI; the readiness gate folds all of
/// them into a single "data unavailable" outcome.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("HTTP {status} for {symbol}")]
    Http { status: u16, symbol: String },

    #[error("csv error: {0}")]
    Csv(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
    Cache,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataSource::YahooFinance => "yahoo_finance",
            DataSource::CsvImport => "csv_import",
            DataSource::Synthetic => "synthetic",
            DataSource::Cache => "cache",
        };
        f.write_str(name)
    }
}

/// Ordered daily bars for one symbol, as returned by a provider.
///
/// Immutable once fetched and scoped to a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    pub symbol: String,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
}

impl RawSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<RawBar>, source: DataSource) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
            source,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The last `n` bars (fewer if the series is shorter).
    pub fn tail(&self, n: usize) -> &[RawBar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    /// Number of bars whose close is missing or not finite.
    pub fn missing_close_count(&self) -> usize {
        self.bars
            .iter()
            .filter(|b| b.usable_close().is_none())
            .count()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

/// Trait for data providers (Yahoo Finance, CSV import, etc).
///
/// Implementations handle the specifics of one source. Caching sits above
/// this trait (see `CachedProvider`); providers don't know about it.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for a symbol over an inclusive date range.
    ///
    /// Unknown symbols and network failures must come back as `Err`, never
    /// as a panic.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<RawSeries, DataError>;
}

impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, DataError> {
        (**self).fetch(symbol, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: Option<f64>) -> RawBar {
        RawBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: Some(1_000),
        }
    }

    #[test]
    fn usable_close_rejects_nan_and_missing() {
        assert_eq!(bar(2, Some(10.0)).usable_close(), Some(10.0));
        assert_eq!(bar(2, None).usable_close(), None);
        assert_eq!(bar(2, Some(f64::NAN)).usable_close(), None);
        assert_eq!(bar(2, Some(f64::INFINITY)).usable_close(), None);
    }

    #[test]
    fn tail_clamps_to_length() {
        let series = RawSeries::new(
            "SPY",
            vec![bar(2, Some(1.0)), bar(3, Some(2.0)), bar(4, None)],
            DataSource::Synthetic,
        );
        assert_eq!(series.tail(2).len(), 2);
        assert_eq!(series.tail(10).len(), 3);
        assert_eq!(series.tail(2)[0].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(series.missing_close_count(), 1);
    }

    #[test]
    fn data_source_display_is_snake_case() {
        assert_eq!(DataSource::YahooFinance.to_string(), "yahoo_finance");
        assert_eq!(
            serde_json::to_string(&DataSource::CsvImport).unwrap(),
            "\"csv_import\""
        );
    }
}
