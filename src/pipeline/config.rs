//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::clustering::{KMeansConfig, ModelSelectorConfig};
use crate::error::{RegimeError, RegimeResult};
use crate::regime::TransitionNormalization;
use crate::returns::ReturnSeriesConfig;

/// Everything a run depends on besides the prices.
///
/// Passed explicitly into [`super::RegimePipeline`]; nothing is read from
/// the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Trailing returns per volatility window.
    pub window: usize,
    /// Decimal places daily returns are rounded to.
    pub return_decimals: u32,
    /// Smallest candidate K (inclusive).
    pub k_min: usize,
    /// Largest candidate K (exclusive).
    pub k_max: usize,
    /// Number of regimes for the final fit, chosen from the metrics table.
    pub k: Option<usize>,
    /// Base seed for every k-means fit.
    pub seed: u64,
    /// Evaluate candidate K values in parallel.
    pub parallel: bool,
    pub kmeans: KMeansConfig,
    pub normalization: TransitionNormalization,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: 30,
            return_decimals: 6,
            k_min: 2,
            k_max: 10,
            k: None,
            seed: 42,
            parallel: true,
            kmeans: KMeansConfig::default(),
            normalization: TransitionNormalization::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn with_k_range(mut self, k_min: usize, k_max: usize) -> Self {
        self.k_min = k_min;
        self.k_max = k_max;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn returns_config(&self) -> ReturnSeriesConfig {
        ReturnSeriesConfig {
            window: self.window,
            return_decimals: self.return_decimals,
        }
    }

    pub fn selector_config(&self) -> ModelSelectorConfig {
        ModelSelectorConfig {
            k_min: self.k_min,
            k_max: self.k_max,
            seed: self.seed,
            parallel: self.parallel,
            kmeans: self.kmeans.clone(),
        }
    }

    /// The chosen K, required for a full run.
    pub fn chosen_k(&self) -> RegimeResult<usize> {
        match self.k {
            Some(k) if k >= 2 => Ok(k),
            Some(k) => Err(RegimeError::Configuration(format!(
                "K must be at least 2, got {}",
                k
            ))),
            None => Err(RegimeError::Configuration(
                "no K chosen; pick one from the metrics table".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.window, 30);
        assert_eq!(config.k_min, 2);
        assert_eq!(config.k_max, 10);
        assert_eq!(config.k, None);
        assert_eq!(config.normalization, TransitionNormalization::OutgoingTransitions);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"k": 3, "seed": 7, "normalization": "regime_occurrences"}"#)
                .unwrap();
        assert_eq!(config.k, Some(3));
        assert_eq!(config.seed, 7);
        assert_eq!(config.window, 30);
        assert_eq!(config.kmeans.n_init, 10);
        assert_eq!(config.normalization, TransitionNormalization::RegimeOccurrences);
    }

    #[test]
    fn test_chosen_k() {
        assert!(PipelineConfig::default().chosen_k().is_err());
        assert!(PipelineConfig::default().with_k(1).chosen_k().is_err());
        assert_eq!(PipelineConfig::default().with_k(4).chosen_k(), Ok(4));
    }

    #[test]
    fn test_derived_configs() {
        let config = PipelineConfig::default().with_k_range(3, 7).with_window(20);
        let selector = config.selector_config();
        assert_eq!(selector.k_min, 3);
        assert_eq!(selector.k_max, 7);
        assert_eq!(config.returns_config().window, 20);
    }
}
