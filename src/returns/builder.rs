//! Daily returns and rolling volatility from a close series.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{PricePoint, ReturnObservation};
use crate::error::{RegimeError, RegimeResult};

use super::rolling::RollingStd;

/// Finest return precision the exact volatility window accepts.
pub const MAX_RETURN_DECIMALS: u32 = 12;

/// Return series configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnSeriesConfig {
    /// Number of trailing returns in each volatility window.
    pub window: usize,
    /// Decimal places daily returns are rounded to.
    pub return_decimals: u32,
}

impl Default for ReturnSeriesConfig {
    fn default() -> Self {
        Self {
            window: 30,
            return_decimals: 6,
        }
    }
}

impl ReturnSeriesConfig {
    pub fn validate(&self) -> RegimeResult<()> {
        if self.window < 2 {
            return Err(RegimeError::Configuration(format!(
                "volatility window must be at least 2, got {}",
                self.window
            )));
        }
        if self.return_decimals > MAX_RETURN_DECIMALS {
            return Err(RegimeError::Configuration(format!(
                "return precision of {} decimals exceeds the supported {}",
                self.return_decimals, MAX_RETURN_DECIMALS
            )));
        }
        Ok(())
    }
}

/// Builds [`ReturnObservation`]s from prices.
pub struct ReturnSeriesBuilder {
    config: ReturnSeriesConfig,
}

impl ReturnSeriesBuilder {
    pub fn new(config: ReturnSeriesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReturnSeriesConfig {
        &self.config
    }

    /// Compute returns and trailing volatility for every price.
    ///
    /// Fails on the first non-finite or non-positive close, or on a date that
    /// does not come strictly after its predecessor.
    pub fn build(&self, prices: &[PricePoint]) -> RegimeResult<Vec<ReturnObservation>> {
        self.config.validate()?;

        let required = self.config.window + 1;
        if prices.len() < required {
            return Err(RegimeError::InsufficientData {
                context: format!("a {}-return volatility window", self.config.window),
                required,
                actual: prices.len(),
            });
        }

        let mut rolling = RollingStd::new(self.config.window, self.config.return_decimals);
        let mut observations = Vec::with_capacity(prices.len());
        let mut previous: Option<&PricePoint> = None;

        for point in prices {
            if !point.is_valid() {
                let reason = if point.close.is_finite() {
                    format!("close must be positive, got {}", point.close)
                } else {
                    format!("close is not finite ({})", point.close)
                };
                return Err(RegimeError::InvalidPrice {
                    date: point.date,
                    reason,
                });
            }

            let daily_return = match previous {
                None => None,
                Some(prev) => {
                    if point.date <= prev.date {
                        return Err(RegimeError::InvalidPrice {
                            date: point.date,
                            reason: format!("date does not follow previous date {}", prev.date),
                        });
                    }
                    let raw = (point.close - prev.close) / prev.close;
                    let rounded = self.round_return(raw, point)?;
                    rolling.push(rounded).ok_or_else(|| out_of_range(raw, point))?;
                    Some(rounded.to_f64().ok_or_else(|| out_of_range(raw, point))?)
                }
            };

            observations.push(ReturnObservation {
                date: point.date,
                daily_return,
                rolling_volatility: rolling.std_dev(),
            });
            previous = Some(point);
        }

        debug!(
            "Built {} return observations ({} with volatility)",
            observations.len(),
            observations
                .iter()
                .filter(|o| o.rolling_volatility.is_some())
                .count()
        );

        Ok(observations)
    }

    /// Round half-to-even at the configured precision.
    fn round_return(&self, value: f64, point: &PricePoint) -> RegimeResult<Decimal> {
        Decimal::from_f64(value)
            .map(|d| {
                d.round_dp_with_strategy(
                    self.config.return_decimals,
                    RoundingStrategy::MidpointNearestEven,
                )
            })
            .ok_or_else(|| out_of_range(value, point))
    }
}

fn out_of_range(value: f64, point: &PricePoint) -> RegimeError {
    RegimeError::InvalidPrice {
        date: point.date,
        reason: format!("return {} is out of range", value),
    }
}

impl Default for ReturnSeriesBuilder {
    fn default() -> Self {
        Self::new(ReturnSeriesConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(start + Duration::days(i as i64), c))
            .collect()
    }

    fn zigzag(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + if i % 2 == 0 { 0.0 } else { 1.5 } + i as f64 * 0.1)
            .collect()
    }

    #[test]
    fn test_first_return_undefined() {
        let builder = ReturnSeriesBuilder::new(ReturnSeriesConfig {
            window: 2,
            ..Default::default()
        });
        let obs = builder.build(&series(&[100.0, 110.0, 99.0])).unwrap();

        assert_eq!(obs[0].daily_return, None);
        assert_eq!(obs[1].daily_return, Some(0.1));
        assert_eq!(obs[2].daily_return, Some(-0.1));
    }

    #[test]
    fn test_returns_rounded_to_six_places() {
        let builder = ReturnSeriesBuilder::new(ReturnSeriesConfig {
            window: 2,
            ..Default::default()
        });
        let obs = builder.build(&series(&[3.0, 4.0, 5.0])).unwrap();

        // 1/3 and 1/4
        assert_eq!(obs[1].daily_return, Some(0.333333));
        assert_eq!(obs[2].daily_return, Some(0.25));
    }

    #[test]
    fn test_window_gating_31_points() {
        let builder = ReturnSeriesBuilder::default();
        let obs = builder.build(&series(&zigzag(31))).unwrap();

        let defined: Vec<_> = obs
            .iter()
            .enumerate()
            .filter(|(_, o)| o.rolling_volatility.is_some())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(defined, vec![30]);
    }

    #[test]
    fn test_volatility_is_sample_std_of_last_window() {
        let builder = ReturnSeriesBuilder::default();
        let prices = series(&zigzag(60));
        let obs = builder.build(&prices).unwrap();

        for t in 30..obs.len() {
            let window: Vec<f64> = obs[t - 29..=t]
                .iter()
                .map(|o| o.daily_return.unwrap())
                .collect();
            let n = window.len() as f64;
            let mean = window.iter().sum::<f64>() / n;
            let expected =
                (window.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
            let got = obs[t].rolling_volatility.unwrap();
            assert!((got - expected).abs() < 1e-12);
        }
        assert!(obs[..30].iter().all(|o| o.rolling_volatility.is_none()));
    }

    #[test]
    fn test_non_finite_close_fails_with_date() {
        let mut closes = zigzag(40);
        closes[12] = f64::NAN;
        let prices = series(&closes);
        let err = ReturnSeriesBuilder::default().build(&prices).unwrap_err();

        match err {
            RegimeError::InvalidPrice { date, .. } => assert_eq!(date, prices[12].date),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_zero_close_fails() {
        let mut closes = zigzag(40);
        closes[5] = 0.0;
        let err = ReturnSeriesBuilder::default()
            .build(&series(&closes))
            .unwrap_err();
        assert!(matches!(err, RegimeError::InvalidPrice { .. }));
    }

    #[test]
    fn test_unordered_dates_fail() {
        let mut prices = series(&zigzag(40));
        prices.swap(10, 11);
        let err = ReturnSeriesBuilder::default().build(&prices).unwrap_err();
        assert!(matches!(err, RegimeError::InvalidPrice { .. }));
    }

    #[test]
    fn test_short_series() {
        let err = ReturnSeriesBuilder::default()
            .build(&series(&zigzag(30)))
            .unwrap_err();
        assert!(matches!(
            err,
            RegimeError::InsufficientData {
                required: 31,
                actual: 30,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_window() {
        let builder = ReturnSeriesBuilder::new(ReturnSeriesConfig {
            window: 1,
            ..Default::default()
        });
        let err = builder.build(&series(&zigzag(10))).unwrap_err();
        assert!(matches!(err, RegimeError::Configuration(_)));
    }

    #[test]
    fn test_precision_beyond_exact_window_is_rejected() {
        let builder = ReturnSeriesBuilder::new(ReturnSeriesConfig {
            return_decimals: MAX_RETURN_DECIMALS + 1,
            ..Default::default()
        });
        let err = builder.build(&series(&zigzag(40))).unwrap_err();
        assert!(matches!(err, RegimeError::Configuration(_)));
    }

    #[test]
    fn test_calm_volatility_after_turbulent_history() {
        // 4000 days of +-9% moves, then 5000 days of +-0.01%.
        let mut close = 100.0;
        let mut closes = vec![close];
        for i in 0..9000 {
            let size = if i < 4000 { 0.09 } else { 0.0001 };
            close *= if i % 2 == 0 { 1.0 + size } else { 1.0 - size };
            closes.push(close);
        }
        let obs = ReturnSeriesBuilder::default()
            .build(&series(&closes))
            .unwrap();

        let mut worst: f64 = 0.0;
        for t in 30..obs.len() {
            let window: Vec<f64> = obs[t - 29..=t]
                .iter()
                .map(|o| o.daily_return.unwrap())
                .collect();
            let n = window.len() as f64;
            let mean = window.iter().sum::<f64>() / n;
            let expected =
                (window.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
            let got = obs[t].rolling_volatility.unwrap();
            worst = worst.max((got - expected).abs() / expected);
        }
        assert!(worst < 1e-12, "worst relative error {}", worst);
    }
}
