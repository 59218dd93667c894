//! Min-max feature scaling.

use serde::{Deserialize, Serialize};

use crate::data::VolatilitySample;
use crate::error::{RegimeError, RegimeResult};

/// Linear map of a feature onto [0, 1], fit on the observed range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: f64,
    pub max: f64,
}

impl MinMaxScaler {
    /// Fit on the observed values. `None` for an empty or non-finite input.
    pub fn fit(values: &[f64]) -> Option<Self> {
        if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self { min, max })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn transform(&self, value: f64) -> f64 {
        let range = self.range();
        if range > 0.0 {
            (value - self.min) / range
        } else {
            0.0
        }
    }

    pub fn inverse_transform(&self, scaled: f64) -> f64 {
        self.min + scaled * self.range()
    }
}

/// The scaled clustering feature for one run.
#[derive(Debug, Clone)]
pub struct ScaledFeature {
    pub scaler: MinMaxScaler,
    pub values: Vec<f64>,
    distinct: usize,
}

impl ScaledFeature {
    /// Scale the rolling volatilities of `samples`.
    ///
    /// `k` only labels the error: zero variance makes every K degenerate.
    pub fn from_samples(samples: &[VolatilitySample], k: usize) -> RegimeResult<Self> {
        let raw: Vec<f64> = samples.iter().map(|s| s.rolling_volatility).collect();
        let scaler = MinMaxScaler::fit(&raw).ok_or_else(|| RegimeError::InsufficientData {
            context: "feature scaling".to_string(),
            required: 1,
            actual: 0,
        })?;

        if scaler.range() <= 0.0 {
            return Err(RegimeError::DegenerateCluster {
                k,
                reason: format!(
                    "rolling volatility has zero variance (all {} samples equal {})",
                    raw.len(),
                    scaler.min
                ),
            });
        }

        let values: Vec<f64> = raw.iter().map(|&v| scaler.transform(v)).collect();

        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);
        sorted.dedup();
        let distinct = sorted.len();

        Ok(Self {
            scaler,
            values,
            distinct,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of distinct scaled values.
    pub fn distinct(&self) -> usize {
        self.distinct
    }

    /// Fail unless `k` non-empty clusters can be formed.
    pub fn ensure_separable(&self, k: usize) -> RegimeResult<()> {
        if self.len() < k {
            return Err(RegimeError::InsufficientData {
                context: format!("clustering with K={}", k),
                required: k,
                actual: self.len(),
            });
        }
        if self.distinct < k {
            return Err(RegimeError::DegenerateCluster {
                k,
                reason: format!("only {} distinct volatility values", self.distinct),
            });
        }
        Ok(())
    }
}
