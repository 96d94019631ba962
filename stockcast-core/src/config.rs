//! Configuration loaded from an optional TOML file.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Dates are quoted strings: `start_date = "2015-01-01"`.

use crate::data::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::forecast::baseline::DEFAULT_INTERVAL_WIDTH;
use crate::forecast::{ForecastError, TrendSeasonalForecaster};
use crate::gate::{default_start_date, GateConfig, DEFAULT_MIN_ROWS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Tickers offered when the user has not typed one.
pub const DEFAULT_TICKERS: [&str; 4] = ["GOOG", "AAPL", "MSFT", "GME"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {message}")]
    Io { path: String, message: String },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StockcastConfig {
    /// First day of every retrieval window.
    pub start_date: NaiveDate,
    /// Minimum usable rows before a series may be forecast.
    pub min_rows: usize,
    /// Preset ticker selection.
    pub tickers: Vec<String>,
    pub cache: CacheConfig,
    pub forecast: ForecastConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    pub interval_width: f64,
    pub weekly_seasonality: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for StockcastConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            min_rows: DEFAULT_MIN_ROWS,
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            cache: CacheConfig::default(),
            forecast: ForecastConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_TTL.as_secs(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            interval_width: DEFAULT_INTERVAL_WIDTH,
            weekly_seasonality: true,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl StockcastConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_rows == 0 {
            return Err(ConfigError::Invalid("min_rows must be at least 1".into()));
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache.capacity must be at least 1".into()));
        }
        let width = self.forecast.interval_width;
        if !(width > 0.0 && width < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "forecast.interval_width must be strictly between 0 and 1, got {width}"
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            start_date: self.start_date,
            min_rows: self.min_rows,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn forecaster(&self) -> Result<TrendSeasonalForecaster, ForecastError> {
        TrendSeasonalForecaster::new(
            self.forecast.interval_width,
            self.forecast.weekly_seasonality,
        )
    }
}
