//! Integration tests for the readiness gate.
//!
//! Each test scripts the provider's answer and checks both the outcome and
//! whether the forecaster was reached.

mod common;

use common::{clean_bars, d, RecordingForecaster, Script, ScriptedProvider};
use stockcast_core::data::{CachedProvider, DataSource, FetchCache, SyntheticProvider};
use stockcast_core::forecast::TrendSeasonalForecaster;
use stockcast_core::{
    FailureKind, ForecastRequest, GateConfig, GateError, GateStage, ReadinessGate, TrainingPoint,
};

fn today() -> chrono::NaiveDate {
    d(2025, 6, 30)
}

fn gate(
    provider: ScriptedProvider,
    min_rows: usize,
) -> ReadinessGate<ScriptedProvider, RecordingForecaster> {
    ReadinessGate::new(
        provider,
        RecordingForecaster::default(),
        GateConfig {
            min_rows,
            ..GateConfig::default()
        },
    )
}

#[test]
fn aapl_with_200_clean_rows_reaches_forecaster() {
    let gate = gate(ScriptedProvider::rows(clean_bars(200)), 30);

    let report = gate.run_on("AAPL", 1, today()).unwrap();

    assert_eq!(report.symbol, "AAPL");
    assert_eq!(report.horizon.days(), 365);
    assert_eq!(*gate.forecaster().horizons.borrow(), vec![365]);
    assert_eq!(report.training.len(), 200);
    assert_eq!(report.forecast.len(), 200 + 365);
    assert_eq!(
        report.stages,
        vec![
            GateStage::Idle,
            GateStage::Validating,
            GateStage::Retrieving,
            GateStage::Checking,
            GateStage::Reshaping,
            GateStage::Forecasting,
            GateStage::Done,
        ]
    );
}

#[test]
fn retrieval_window_starts_2015_and_ends_today() {
    let gate = gate(ScriptedProvider::rows(clean_bars(40)), 30);
    gate.run_on("  msft ", 2, today()).unwrap();

    let (symbol, start, end) = gate.provider().last_request().unwrap();
    assert_eq!(symbol, "MSFT");
    assert_eq!(start, d(2015, 1, 1));
    assert_eq!(end, today());
}

#[test]
fn empty_symbol_fails_without_any_calls() {
    let gate = gate(ScriptedProvider::rows(clean_bars(200)), 30);

    let err = gate.run_on("", 2, today()).unwrap_err();

    assert_eq!(err.kind(), FailureKind::InvalidInput);
    assert_eq!(gate.provider().calls(), 0);
    assert!(!gate.forecaster().invoked());
}

#[test]
fn out_of_range_years_fail_before_retrieval() {
    let gate = gate(ScriptedProvider::rows(clean_bars(200)), 30);

    for years in [0, 5, 40] {
        let err = gate.run_on("AAPL", years, today()).unwrap_err();
        assert!(matches!(err, GateError::InvalidInput { .. }), "years={years}");
    }
    assert_eq!(gate.provider().calls(), 0);
}

#[test]
fn empty_retrieval_is_data_unavailable() {
    let gate = gate(ScriptedProvider::new(Script::Empty), 30);

    let err = gate.run_on("ZZZZINVALID", 1, today()).unwrap_err();

    assert_eq!(err.kind(), FailureKind::DataUnavailable);
    assert!(err.to_string().contains("ZZZZINVALID"));
    assert_eq!(gate.provider().calls(), 1);
    assert!(!gate.forecaster().invoked());
}

#[test]
fn provider_error_is_data_unavailable() {
    let gate = gate(ScriptedProvider::new(Script::Fail), 30);

    let err = gate.run_on("GOOG", 1, today()).unwrap_err();

    match err {
        GateError::DataUnavailable { symbol, reason } => {
            assert_eq!(symbol, "GOOG");
            assert!(reason.contains("connection refused"));
        }
        other => panic!("expected DataUnavailable, got {other:?}"),
    }
    assert!(!gate.forecaster().invoked());
}

#[test]
fn provider_panic_is_caught_as_data_unavailable() {
    let gate = gate(ScriptedProvider::new(Script::Panic), 30);

    let err = gate.run_on("GME", 1, today()).unwrap_err();

    assert_eq!(err.kind(), FailureKind::DataUnavailable);
    assert!(err.to_string().contains("provider exploded"));
    assert!(!gate.forecaster().invoked());
}

#[test]
fn ten_rows_below_minimum_is_insufficient() {
    let gate = gate(ScriptedProvider::rows(clean_bars(10)), 30);

    let err = gate.run_on("NEWIPO", 1, today()).unwrap_err();

    match err {
        GateError::InsufficientData {
            symbol,
            rows,
            required,
        } => {
            assert_eq!(symbol, "NEWIPO");
            assert_eq!(rows, 10);
            assert_eq!(required, 30);
        }
        other => panic!("expected InsufficientData, got {other:?}"),
    }
    assert!(!gate.forecaster().invoked());
}

#[test]
fn missing_closes_count_against_the_minimum() {
    let mut bars = clean_bars(35);
    for bar in bars.iter_mut().step_by(5) {
        bar.close = None;
    }
    bars[1].close = Some(f64::NAN);
    let gate = gate(ScriptedProvider::rows(bars), 30);

    let err = gate.run_on("AAPL", 1, today()).unwrap_err();

    assert!(matches!(err, GateError::InsufficientData { rows: 27, .. }));
}

#[test]
fn all_missing_closes_is_insufficient_not_unavailable() {
    let mut bars = clean_bars(50);
    for bar in &mut bars {
        bar.close = None;
    }
    let gate = gate(ScriptedProvider::rows(bars), 30);

    let err = gate.run_on("AAPL", 1, today()).unwrap_err();

    assert!(matches!(err, GateError::InsufficientData { rows: 0, .. }));
}

#[test]
fn training_series_is_exactly_the_non_missing_closes() {
    let mut bars = clean_bars(40);
    bars[3].close = None;
    bars[17].close = None;
    bars[17].open = Some(999.0);
    let expected: Vec<TrainingPoint> = bars
        .iter()
        .filter_map(|b| b.close.map(|y| TrainingPoint { ds: b.date, y }))
        .collect();
    let gate = gate(ScriptedProvider::rows(bars), 30);

    let report = gate.run_on("AAPL", 1, today()).unwrap();

    assert_eq!(report.training.points(), expected.as_slice());
    assert_eq!(report.training.missing_counts(), (0, 0));
    let fitted = gate.forecaster().fitted.borrow();
    assert_eq!(fitted.len(), 1);
    assert_eq!(fitted[0].points(), expected.as_slice());
    assert!(report.raw.len() == 40 && report.raw.missing_close_count() == 2);
}

#[test]
fn handle_uses_request_fields() {
    let gate = gate(ScriptedProvider::rows(clean_bars(60)), 30);
    let report = gate.handle(&ForecastRequest::new("goog", 4)).unwrap();
    assert_eq!(report.symbol, "GOOG");
    assert_eq!(report.horizon.days(), 1460);
    assert_eq!(report.forecast.future().len(), 1460);
}

#[test]
fn min_rows_zero_still_rejects_empty_after_cleaning() {
    let mut bars = clean_bars(3);
    for bar in &mut bars {
        bar.close = None;
    }
    let gate = gate(ScriptedProvider::rows(bars), 0);
    let err = gate.run_on("AAPL", 1, today()).unwrap_err();
    assert!(matches!(err, GateError::InsufficientData { required: 1, .. }));
}

#[test]
fn end_to_end_synthetic_with_cache() {
    let provider = CachedProvider::new(SyntheticProvider::new(), FetchCache::default());
    let gate = ReadinessGate::new(
        provider,
        TrendSeasonalForecaster::default(),
        GateConfig::default(),
    );

    let first = gate.run_on("AAPL", 1, d(2016, 1, 1)).unwrap();
    let second = gate.run_on("aapl", 2, d(2016, 1, 1)).unwrap();

    assert_eq!(first.raw.source, DataSource::Synthetic);
    assert_eq!(second.raw.source, DataSource::Cache);
    assert_eq!(first.training, second.training);
    assert_eq!(first.forecast.future().len(), 365);
    assert_eq!(second.forecast.future().len(), 730);
    assert_eq!(gate.provider().cache().len(), 1);
    for row in first.forecast.rows() {
        assert!(row.yhat_lower <= row.yhat && row.yhat <= row.yhat_upper);
    }
}
