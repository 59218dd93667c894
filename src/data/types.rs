//! Core data types for the regime pipeline.
//!
//! Prices come in as [`PricePoint`]s and are never mutated. Everything
//! downstream is derived from them deterministically.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading date
    pub date: NaiveDate,

    /// Closing price
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }

    /// Finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Daily return and trailing volatility for one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnObservation {
    pub date: NaiveDate,

    /// Simple return from the previous close, `None` on the first date.
    pub daily_return: Option<f64>,

    /// Sample standard deviation of the trailing returns, `None` until the
    /// window is full.
    pub rolling_volatility: Option<f64>,
}

impl ReturnObservation {
    /// Volatility sample for this date, if the window was full.
    pub fn volatility_sample(&self) -> Option<VolatilitySample> {
        self.rolling_volatility.map(|rolling_volatility| VolatilitySample {
            date: self.date,
            rolling_volatility,
        })
    }
}

/// An observation with a defined rolling volatility; the clustering input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySample {
    pub date: NaiveDate,
    pub rolling_volatility: f64,
}

/// Keep only the observations that carry a rolling volatility.
pub fn volatility_samples(observations: &[ReturnObservation]) -> Vec<VolatilitySample> {
    observations
        .iter()
        .filter_map(ReturnObservation::volatility_sample)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_price_point_validity() {
        assert!(PricePoint::new(date(1), 101.5).is_valid());
        assert!(!PricePoint::new(date(1), 0.0).is_valid());
        assert!(!PricePoint::new(date(1), -3.0).is_valid());
        assert!(!PricePoint::new(date(1), f64::NAN).is_valid());
        assert!(!PricePoint::new(date(1), f64::INFINITY).is_valid());
    }

    #[test]
    fn test_volatility_samples_skip_undefined() {
        let observations = vec![
            ReturnObservation {
                date: date(1),
                daily_return: None,
                rolling_volatility: None,
            },
            ReturnObservation {
                date: date(2),
                daily_return: Some(0.01),
                rolling_volatility: None,
            },
            ReturnObservation {
                date: date(3),
                daily_return: Some(-0.02),
                rolling_volatility: Some(0.015),
            },
        ];

        let samples = volatility_samples(&observations);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].date, date(3));
        assert_eq!(samples[0].rolling_volatility, 0.015);
    }
}
