//! Readiness gate: decides whether fetched data may proceed to forecasting.
//!
//! One request runs through
//! `Idle -> Validating -> Retrieving -> Checking -> Reshaping -> Forecasting -> Done`,
//! leaving early on invalid input, unavailable data, or insufficient data.
//! Every failure is terminal for the request; nothing is retried.

use crate::data::{DataProvider, RawSeries};
use crate::forecast::{ForecastError, ForecastTable, Forecaster};
use crate::horizon::ForecastHorizon;
use crate::series::TrainingSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// Minimum usable rows before a series is handed to the forecaster.
///
/// Seasonal terms need several weeks of sessions to be estimated at all.
pub const DEFAULT_MIN_ROWS: usize = 30;

/// Longest accepted ticker, in characters.
pub const MAX_SYMBOL_LEN: usize = 15;

/// First day of the default retrieval window.
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Which terminal failure a request ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    InvalidInput,
    DataUnavailable,
    InsufficientData,
    Forecast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateStage {
    Idle,
    Validating,
    Retrieving,
    Checking,
    Reshaping,
    Forecasting,
    Done,
    Failed(FailureKind),
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("no data available for '{symbol}' ({reason}); try another ticker")]
    DataUnavailable { symbol: String, reason: String },

    #[error(
        "not enough data for '{symbol}': {rows} usable rows, need at least {required}; try another ticker"
    )]
    InsufficientData {
        symbol: String,
        rows: usize,
        required: usize,
    },

    #[error("forecast failed for '{symbol}': {source}")]
    Forecast {
        symbol: String,
        #[source]
        source: ForecastError,
    },
}

impl GateError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GateError::InvalidInput { .. } => FailureKind::InvalidInput,
            GateError::DataUnavailable { .. } => FailureKind::DataUnavailable,
            GateError::InsufficientData { .. } => FailureKind::InsufficientData,
            GateError::Forecast { .. } => FailureKind::Forecast,
        }
    }

    /// True for failures the user fixes by editing their input.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, GateError::InvalidInput { .. })
    }

    fn invalid(reason: impl Into<String>) -> Self {
        GateError::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// Gate settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub start_date: NaiveDate,
    /// Values below 1 behave as 1: an empty series never passes.
    pub min_rows: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            min_rows: DEFAULT_MIN_ROWS,
        }
    }
}

/// One user action: a ticker and a horizon in years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub symbol: String,
    pub years: u32,
}

impl ForecastRequest {
    pub fn new(symbol: impl Into<String>, years: u32) -> Self {
        Self {
            symbol: symbol.into(),
            years,
        }
    }

    /// Parse `SYMBOL [YEARS]`. A missing year count uses `default_years`.
    ///
    /// A blank line yields an empty symbol so the gate can reject it.
    pub fn parse_line(line: &str, default_years: u32) -> Result<Self, GateError> {
        let mut parts = line.split_whitespace();
        let symbol = parts.next().unwrap_or("").to_string();
        let years = match parts.next() {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| GateError::invalid(format!("'{raw}' is not a whole number of years")))?,
            None => default_years,
        };
        if let Some(extra) = parts.next() {
            return Err(GateError::invalid(format!("unexpected argument '{extra}'")));
        }
        Ok(Self { symbol, years })
    }
}

/// Everything a successful request produced, for display and export.
#[derive(Debug, Clone)]
pub struct GateReport {
    pub symbol: String,
    pub horizon: ForecastHorizon,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub raw: RawSeries,
    pub training: TrainingSeries,
    pub forecast: ForecastTable,
    pub stages: Vec<GateStage>,
}

/// Normalize and check a user-typed ticker.
///
/// Trims, upper-cases, and accepts `A-Z 0-9 . - ^ =` up to
/// [`MAX_SYMBOL_LEN`] characters.
pub fn validate_symbol(raw: &str) -> Result<String, GateError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GateError::invalid("please enter a ticker symbol"));
    }

    let symbol = trimmed.to_ascii_uppercase();
    if symbol.chars().count() > MAX_SYMBOL_LEN {
        return Err(GateError::invalid(format!(
            "ticker '{trimmed}' is longer than {MAX_SYMBOL_LEN} characters"
        )));
    }
    if let Some(bad) = symbol
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
    {
        return Err(GateError::invalid(format!(
            "ticker '{trimmed}' contains unsupported character '{bad}'"
        )));
    }
    Ok(symbol)
}

/// Count usable rows and fail if there are fewer than `min_rows`.
pub fn check_usability(raw: &RawSeries, min_rows: usize) -> Result<usize, GateError> {
    let required = min_rows.max(1);
    let rows = raw.len() - raw.missing_close_count();
    if rows < required {
        return Err(GateError::InsufficientData {
            symbol: raw.symbol.clone(),
            rows,
            required,
        });
    }
    Ok(rows)
}

struct Trace {
    symbol: String,
    stages: Vec<GateStage>,
}

impl Trace {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            stages: vec![GateStage::Idle],
        }
    }

    fn enter(&mut self, stage: GateStage) {
        log::debug!("gate[{}]: {:?} -> {:?}", self.symbol, self.current(), stage);
        self.stages.push(stage);
    }

    fn current(&self) -> GateStage {
        self.stages.last().copied().unwrap_or(GateStage::Idle)
    }

    fn fail(&mut self, err: GateError) -> GateError {
        self.enter(GateStage::Failed(err.kind()));
        log::warn!("gate[{}]: {err}", self.symbol);
        err
    }
}

/// The readiness gate over a data provider and a forecaster.
pub struct ReadinessGate<P, F> {
    provider: P,
    forecaster: F,
    config: GateConfig,
}

impl<P: DataProvider, F: Forecaster> ReadinessGate<P, F> {
    pub fn new(provider: P, forecaster: F, config: GateConfig) -> Self {
        Self {
            provider,
            forecaster,
            config,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn forecaster(&self) -> &F {
        &self.forecaster
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Handle one request with a window ending today.
    pub fn handle(&self, request: &ForecastRequest) -> Result<GateReport, GateError> {
        self.run_on(
            &request.symbol,
            request.years,
            chrono::Local::now().date_naive(),
        )
    }

    /// Run the gate with an explicit end-of-window date.
    pub fn run_on(
        &self,
        symbol: &str,
        years: u32,
        today: NaiveDate,
    ) -> Result<GateReport, GateError> {
        self.run_traced(symbol, years, today).0
    }

    /// Like [`run_on`](Self::run_on), also returning every stage entered.
    ///
    /// On failure the trace ends in `GateStage::Failed(kind)`.
    pub fn run_traced(
        &self,
        symbol: &str,
        years: u32,
        today: NaiveDate,
    ) -> (Result<GateReport, GateError>, Vec<GateStage>) {
        let mut trace = Trace::new(symbol.trim());
        let result = self.run_stages(&mut trace, symbol, years, today);
        (result, trace.stages)
    }

    fn run_stages(
        &self,
        trace: &mut Trace,
        symbol: &str,
        years: u32,
        today: NaiveDate,
    ) -> Result<GateReport, GateError> {
        // Step 1: validate input before touching the provider.
        trace.enter(GateStage::Validating);
        let symbol = validate_symbol(symbol).map_err(|e| trace.fail(e))?;
        let horizon = ForecastHorizon::from_years(years)
            .map_err(|e| trace.fail(GateError::invalid(e.to_string())))?;
        trace.symbol = symbol.clone();

        // Step 2: retrieve. Errors, panics and empty results all mean "unavailable".
        trace.enter(GateStage::Retrieving);
        let start = self.config.start_date;
        let raw = self
            .retrieve(&symbol, start, today)
            .map_err(|reason| {
                trace.fail(GateError::DataUnavailable {
                    symbol: symbol.clone(),
                    reason,
                })
            })?;
        log::info!(
            "retrieved {} rows for {symbol} from {} ({start}..{today})",
            raw.len(),
            raw.source
        );

        // Step 3: usability.
        trace.enter(GateStage::Checking);
        let usable = check_usability(&raw, self.config.min_rows).map_err(|e| trace.fail(e))?;

        // Step 4: reshape.
        trace.enter(GateStage::Reshaping);
        let training = TrainingSeries::from_raw(&raw);
        debug_assert_eq!(training.len(), usable);

        // Step 5: hand off.
        trace.enter(GateStage::Forecasting);
        let forecast = self
            .forecaster
            .fit(&training)
            .and_then(|model| self.forecaster.predict(&model, horizon))
            .map_err(|source| {
                trace.fail(GateError::Forecast {
                    symbol: symbol.clone(),
                    source,
                })
            })?;

        trace.enter(GateStage::Done);
        log::info!(
            "forecast for {symbol}: {} training rows, {} output rows, horizon {horizon}",
            training.len(),
            forecast.len()
        );

        Ok(GateReport {
            symbol,
            horizon,
            start,
            end: today,
            raw,
            training,
            forecast,
            stages: trace.stages.clone(),
        })
    }

    fn retrieve(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<RawSeries, String> {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.provider.fetch(symbol, start, end)
        }));

        match outcome {
            Ok(Ok(series)) if series.is_empty() => Err("provider returned no rows".into()),
            Ok(Ok(series)) => Ok(series),
            Ok(Err(e)) => Err(e.to_string()),
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                Err(format!("provider {} panicked: {detail}", self.provider.name()))
            }
        }
    }
}
