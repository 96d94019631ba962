//! Forecast horizon: a year count converted to days.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed conversion used for every horizon, leap years included.
pub const DAYS_PER_YEAR: u32 = 365;

/// Smallest selectable horizon, in years.
pub const MIN_YEARS: u32 = 1;

/// Largest selectable horizon, in years.
pub const MAX_YEARS: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("years of prediction must be between {MIN_YEARS} and {MAX_YEARS}, got {0}")]
pub struct HorizonError(pub u32);

/// Number of future days a forecast should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastHorizon {
    years: u32,
}

impl ForecastHorizon {
    pub fn from_years(years: u32) -> Result<Self, HorizonError> {
        if (MIN_YEARS..=MAX_YEARS).contains(&years) {
            Ok(Self { years })
        } else {
            Err(HorizonError(years))
        }
    }

    pub fn years(&self) -> u32 {
        self.years
    }

    /// `years * 365`.
    pub fn days(&self) -> u32 {
        self.years * DAYS_PER_YEAR
    }
}

impl std::fmt::Display for ForecastHorizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = if self.years == 1 { "year" } else { "years" };
        write!(f, "{} {unit} ({} days)", self.years, self.days())
    }
}
