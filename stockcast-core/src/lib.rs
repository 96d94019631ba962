//! Stockcast Core: readiness gate, price data providers, fetch cache, and
//! the forecasting collaborator interface.
//!
//! This crate contains everything except presentation:
//! - Data providers (Yahoo Finance, CSV export, synthetic walk)
//! - Bounded TTL fetch cache keyed by symbol and date window
//! - Training series projection and forecast horizon conversion
//! - The `Forecaster` trait and a trend + weekly-seasonality baseline
//! - The readiness gate that decides whether a request may be forecast
//! - TOML configuration

pub mod config;
pub mod data;
pub mod forecast;
pub mod gate;
pub mod horizon;
pub mod series;

pub use config::{ConfigError, StockcastConfig};
pub use forecast::{
    ForecastError, ForecastRow, ForecastTable, Forecaster, TrendSeasonalForecaster,
};
pub use gate::{
    FailureKind, ForecastRequest, GateConfig, GateError, GateReport, GateStage, ReadinessGate,
};
pub use horizon::ForecastHorizon;
pub use series::{TrainingPoint, TrainingSeries};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed between threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<data::RawSeries>();
        require_sync::<data::RawSeries>();
        require_send::<data::FetchCache>();
        require_sync::<data::FetchCache>();
        require_send::<data::CachedProvider<data::SyntheticProvider>>();
        require_sync::<data::CachedProvider<data::SyntheticProvider>>();
        require_send::<TrainingSeries>();
        require_sync::<TrainingSeries>();
        require_send::<ForecastTable>();
        require_sync::<ForecastTable>();
        require_send::<GateError>();
        require_sync::<GateError>();
        require_send::<GateReport>();
        require_sync::<GateReport>();
    }

    /// Architecture contract: providers are usable as trait objects.
    #[test]
    fn data_provider_is_object_safe() {
        fn _takes_dyn(p: &dyn data::DataProvider) -> &str {
            p.name()
        }
        let boxed: Box<dyn data::DataProvider> = Box::new(data::SyntheticProvider::new());
        assert_eq!(_takes_dyn(&boxed), "synthetic");
    }
}
