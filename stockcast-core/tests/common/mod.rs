//! Shared test doubles: a scripted provider and a recording forecaster.

#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use stockcast_core::data::{DataError, DataProvider, DataSource, RawBar, RawSeries};
use stockcast_core::{
    ForecastError, ForecastHorizon, ForecastRow, ForecastTable, Forecaster, TrainingSeries,
};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// `n` consecutive daily bars from 2015-01-02 with closes 100, 101, ...
pub fn clean_bars(n: usize) -> Vec<RawBar> {
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64;
            RawBar {
                date: d(2015, 1, 2) + chrono::Duration::days(i as i64),
                open: Some(close - 0.5),
                high: Some(close + 1.0),
                low: Some(close - 1.0),
                close: Some(close),
                volume: Some(1_000_000),
            }
        })
        .collect()
}

pub enum Script {
    Rows(Vec<RawBar>),
    Empty,
    Fail,
    Panic,
}

/// Provider that answers every fetch from a fixed script and records calls.
pub struct ScriptedProvider {
    script: Script,
    calls: AtomicUsize,
    last_request: Mutex<Option<(String, NaiveDate, NaiveDate)>>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn rows(bars: Vec<RawBar>) -> Self {
        Self::new(Script::Rows(bars))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(String, NaiveDate, NaiveDate)> {
        self.last_request.lock().unwrap().clone()
    }
}

impl DataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some((symbol.to_string(), start, end));
        match &self.script {
            Script::Rows(bars) => Ok(RawSeries::new(symbol, bars.clone(), DataSource::Synthetic)),
            Script::Empty => Ok(RawSeries::new(symbol, Vec::new(), DataSource::Synthetic)),
            Script::Fail => Err(DataError::NetworkUnreachable("connection refused".into())),
            Script::Panic => panic!("provider exploded"),
        }
    }
}

/// Forecaster that records what it was given and predicts a flat line.
#[derive(Default)]
pub struct RecordingForecaster {
    pub fitted: RefCell<Vec<TrainingSeries>>,
    pub horizons: RefCell<Vec<u32>>,
}

impl RecordingForecaster {
    pub fn invoked(&self) -> bool {
        !self.fitted.borrow().is_empty() || !self.horizons.borrow().is_empty()
    }
}

impl Forecaster for RecordingForecaster {
    type Model = TrainingSeries;

    fn fit(&self, series: &TrainingSeries) -> Result<TrainingSeries, ForecastError> {
        self.fitted.borrow_mut().push(series.clone());
        Ok(series.clone())
    }

    fn predict(
        &self,
        model: &TrainingSeries,
        horizon: ForecastHorizon,
    ) -> Result<ForecastTable, ForecastError> {
        self.horizons.borrow_mut().push(horizon.days());
        let last = model.last_date().unwrap();
        let level = model.tail(1)[0].y;
        let flat = |ds| ForecastRow {
            ds,
            yhat: level,
            yhat_lower: level,
            yhat_upper: level,
            trend: level,
            weekly: 0.0,
        };
        let mut rows: Vec<ForecastRow> = model.points().iter().map(|p| flat(p.ds)).collect();
        rows.extend((1..=horizon.days() as i64).map(|k| flat(last + chrono::Duration::days(k))));
        Ok(ForecastTable::new(rows, model.len()))
    }
}
