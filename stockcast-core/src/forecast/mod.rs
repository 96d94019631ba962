//! Forecasting collaborator interface and output table.
//!
//! The gate only talks to forecasters through [`Forecaster`]: fit on a
//! [`TrainingSeries`], then predict a [`ForecastTable`] for a horizon. The
//! table covers every history timestamp followed by one row per future
//! calendar day.

pub mod baseline;

use crate::horizon::ForecastHorizon;
use crate::series::TrainingSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use baseline::{TrendSeasonalForecaster, TrendSeasonalModel};

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("need at least {required} observations to fit, got {found}")]
    TooFewPoints { required: usize, found: usize },

    #[error("interval width must be strictly between 0 and 1, got {0}")]
    InvalidIntervalWidth(f64),

    #[error("cannot fit model: {0}")]
    Degenerate(String),
}

/// A time-series forecaster: fit once, predict for a horizon.
pub trait Forecaster {
    type Model;

    fn fit(&self, series: &TrainingSeries) -> Result<Self::Model, ForecastError>;

    fn predict(
        &self,
        model: &Self::Model,
        horizon: ForecastHorizon,
    ) -> Result<ForecastTable, ForecastError>;
}

impl<F: Forecaster + ?Sized> Forecaster for &F {
    type Model = F::Model;

    fn fit(&self, series: &TrainingSeries) -> Result<Self::Model, ForecastError> {
        (**self).fit(series)
    }

    fn predict(
        &self,
        model: &Self::Model,
        horizon: ForecastHorizon,
    ) -> Result<ForecastTable, ForecastError> {
        (**self).predict(model, horizon)
    }
}

/// One predicted timestamp with its uncertainty band and components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
    pub weekly: f64,
}

/// Forecaster output: fitted history rows followed by future rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    rows: Vec<ForecastRow>,
    history_len: usize,
}

impl ForecastTable {
    /// `history_len` is clamped to the number of rows.
    pub fn new(rows: Vec<ForecastRow>, history_len: usize) -> Self {
        let history_len = history_len.min(rows.len());
        Self { rows, history_len }
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows at history timestamps.
    pub fn history(&self) -> &[ForecastRow] {
        &self.rows[..self.history_len]
    }

    /// Rows past the last history timestamp.
    pub fn future(&self) -> &[ForecastRow] {
        &self.rows[self.history_len..]
    }

    pub fn tail(&self, n: usize) -> &[ForecastRow] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }

    pub fn last(&self) -> Option<&ForecastRow> {
        self.rows.last()
    }
}
