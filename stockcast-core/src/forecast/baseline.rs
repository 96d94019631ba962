//! Baseline forecaster: linear trend plus day-of-week seasonality.
//!
//! Model: `y(t) = a + b * t + w(weekday(t)) + e`, with `t` in days since the
//! first observation. The trend is an ordinary least squares line; the weekly
//! term is the mean detrended residual per weekday, centered on zero. The
//! band is `yhat +- z * sigma * sqrt(1 + h / n)` where `h` is the number of
//! days past the last observation (zero inside history).

use super::{ForecastError, ForecastRow, ForecastTable, Forecaster};
use crate::horizon::ForecastHorizon;
use crate::series::TrainingSeries;
use chrono::{Datelike, NaiveDate};
use statrs::distribution::{ContinuousCDF, Normal};

/// Width of the default uncertainty interval.
pub const DEFAULT_INTERVAL_WIDTH: f64 = 0.80;

const MIN_FIT_POINTS: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct TrendSeasonalForecaster {
    interval_width: f64,
    weekly_seasonality: bool,
}

impl TrendSeasonalForecaster {
    pub fn new(interval_width: f64, weekly_seasonality: bool) -> Result<Self, ForecastError> {
        if !(interval_width > 0.0 && interval_width < 1.0) {
            return Err(ForecastError::InvalidIntervalWidth(interval_width));
        }
        Ok(Self {
            interval_width,
            weekly_seasonality,
        })
    }

    fn z_score(&self) -> Result<f64, ForecastError> {
        let normal =
            Normal::new(0.0, 1.0).map_err(|e| ForecastError::Degenerate(e.to_string()))?;
        Ok(normal.inverse_cdf(0.5 + self.interval_width / 2.0))
    }
}

impl Default for TrendSeasonalForecaster {
    fn default() -> Self {
        Self {
            interval_width: DEFAULT_INTERVAL_WIDTH,
            weekly_seasonality: true,
        }
    }
}

/// Fitted parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSeasonalModel {
    pub origin: NaiveDate,
    pub intercept: f64,
    pub slope: f64,
    /// Additive effect per weekday, Monday first.
    pub weekly: [f64; 7],
    pub sigma: f64,
    history: Vec<NaiveDate>,
}

impl TrendSeasonalModel {
    fn t(&self, ds: NaiveDate) -> f64 {
        (ds - self.origin).num_days() as f64
    }

    pub fn trend_at(&self, ds: NaiveDate) -> f64 {
        self.intercept + self.slope * self.t(ds)
    }

    pub fn weekly_at(&self, ds: NaiveDate) -> f64 {
        self.weekly[ds.weekday().num_days_from_monday() as usize]
    }

    pub fn n_obs(&self) -> usize {
        self.history.len()
    }
}

impl Forecaster for TrendSeasonalForecaster {
    type Model = TrendSeasonalModel;

    fn fit(&self, series: &TrainingSeries) -> Result<TrendSeasonalModel, ForecastError> {
        let points = series.points();
        if points.len() < MIN_FIT_POINTS {
            return Err(ForecastError::TooFewPoints {
                required: MIN_FIT_POINTS,
                found: points.len(),
            });
        }

        let origin = points[0].ds;
        let xs: Vec<f64> = points
            .iter()
            .map(|p| (p.ds - origin).num_days() as f64)
            .collect();
        let n = points.len() as f64;
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.y).sum::<f64>() / n;

        let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
        if sxx == 0.0 {
            return Err(ForecastError::Degenerate(
                "all observations share one timestamp".into(),
            ));
        }
        let sxy: f64 = xs
            .iter()
            .zip(points)
            .map(|(x, p)| (x - mean_x) * (p.y - mean_y))
            .sum();
        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let detrended: Vec<f64> = xs
            .iter()
            .zip(points)
            .map(|(x, p)| p.y - (intercept + slope * x))
            .collect();

        let mut weekly = [0.0_f64; 7];
        if self.weekly_seasonality {
            let mut sums = [0.0_f64; 7];
            let mut counts = [0usize; 7];
            for (p, r) in points.iter().zip(&detrended) {
                let idx = p.ds.weekday().num_days_from_monday() as usize;
                sums[idx] += r;
                counts[idx] += 1;
            }
            let observed: Vec<usize> = (0..7).filter(|&i| counts[i] > 0).collect();
            for &i in &observed {
                weekly[i] = sums[i] / counts[i] as f64;
            }
            // Center over observed weekdays; unobserved ones stay at zero.
            let center = observed.iter().map(|&i| weekly[i]).sum::<f64>() / observed.len() as f64;
            for &i in &observed {
                weekly[i] -= center;
            }
        }

        let sse: f64 = points
            .iter()
            .zip(&detrended)
            .map(|(p, r)| {
                let e = r - weekly[p.ds.weekday().num_days_from_monday() as usize];
                e * e
            })
            .sum();
        let dof = points.len().saturating_sub(2).max(1) as f64;
        let sigma = (sse / dof).sqrt();

        Ok(TrendSeasonalModel {
            origin,
            intercept,
            slope,
            weekly,
            sigma,
            history: points.iter().map(|p| p.ds).collect(),
        })
    }

    fn predict(
        &self,
        model: &TrendSeasonalModel,
        horizon: ForecastHorizon,
    ) -> Result<ForecastTable, ForecastError> {
        let last = *model.history.last().ok_or(ForecastError::TooFewPoints {
            required: MIN_FIT_POINTS,
            found: 0,
        })?;
        let z = self.z_score()?;
        let n = model.n_obs() as f64;

        let row_at = |ds: NaiveDate, days_ahead: f64| {
            let trend = model.trend_at(ds);
            let weekly = model.weekly_at(ds);
            let yhat = trend + weekly;
            let half_width = z * model.sigma * (1.0 + days_ahead / n).sqrt();
            ForecastRow {
                ds,
                yhat,
                yhat_lower: yhat - half_width,
                yhat_upper: yhat + half_width,
                trend,
                weekly,
            }
        };

        let days = horizon.days() as usize;
        let mut rows = Vec::with_capacity(model.history.len() + days);
        rows.extend(model.history.iter().map(|&ds| row_at(ds, 0.0)));
        for k in 1..=days {
            let ds = last + chrono::Duration::days(k as i64);
            rows.push(row_at(ds, k as f64));
        }

        Ok(ForecastTable::new(rows, model.history.len()))
    }
}
