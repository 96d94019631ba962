//! Training series: the `(ds, y)` projection a forecaster is fitted on.

use crate::data::RawSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One training observation: timestamp and value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingPoint {
    pub ds: NaiveDate,
    pub y: f64,
}

/// Chronologically ordered observations with no missing values.
///
/// The only way to build one is [`TrainingSeries::from_raw`] (or
/// [`TrainingSeries::from_points`], which applies the same cleaning), so the
/// invariants hold for every value of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSeries {
    symbol: String,
    points: Vec<TrainingPoint>,
}

impl TrainingSeries {
    /// Project a raw series to `(date, close)`, dropping rows whose close is
    /// missing or not finite.
    pub fn from_raw(raw: &RawSeries) -> Self {
        let points = raw
            .bars
            .iter()
            .filter_map(|bar| {
                bar.usable_close().map(|y| TrainingPoint { ds: bar.date, y })
            })
            .collect();
        Self::from_points(raw.symbol.clone(), points)
    }

    /// Build from arbitrary points, dropping non-finite values and ordering
    /// by date. The sort is stable, so already ordered input is untouched.
    pub fn from_points(symbol: impl Into<String>, points: Vec<TrainingPoint>) -> Self {
        let mut points: Vec<TrainingPoint> =
            points.into_iter().filter(|p| p.y.is_finite()).collect();
        if !points.windows(2).all(|w| w[0].ds <= w[1].ds) {
            points.sort_by_key(|p| p.ds);
        }
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[TrainingPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn head(&self, n: usize) -> &[TrainingPoint] {
        &self.points[..n.min(self.points.len())]
    }

    pub fn tail(&self, n: usize) -> &[TrainingPoint] {
        &self.points[self.points.len().saturating_sub(n)..]
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.ds)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.ds)
    }

    /// Missing values per column `(ds, y)`. Always zero; reported for display.
    pub fn missing_counts(&self) -> (usize, usize) {
        (0, self.points.iter().filter(|p| !p.y.is_finite()).count())
    }
}
