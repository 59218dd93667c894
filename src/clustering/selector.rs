//! Candidate-K evaluation.
//!
//! Fits k-means for every K in a range and reports inertia and silhouette.
//! The table is an analysis aid: choosing K is left to whoever reads it.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::VolatilitySample;
use crate::error::{RegimeError, RegimeResult};

use super::kmeans::{derive_seed, KMeans, KMeansConfig};
use super::scaling::ScaledFeature;
use super::silhouette::silhouette_score;

/// Quality metrics for one candidate K.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterQuality {
    pub k: usize,
    /// Sum of squared distances to assigned centroids (scaled feature).
    pub inertia: f64,
    /// Mean silhouette in [-1, 1].
    pub silhouette: f64,
    /// Lloyd iterations of the winning restart.
    pub iterations: usize,
}

/// Metrics keyed by K, in ascending K order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSelectionTable {
    rows: BTreeMap<usize, ClusterQuality>,
}

impl ModelSelectionTable {
    pub fn insert(&mut self, quality: ClusterQuality) {
        self.rows.insert(quality.k, quality);
    }

    pub fn get(&self, k: usize) -> Option<&ClusterQuality> {
        self.rows.get(&k)
    }

    pub fn rows(&self) -> impl Iterator<Item = &ClusterQuality> {
        self.rows.values()
    }

    pub fn ks(&self) -> Vec<usize> {
        self.rows.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Plain-text table for terminal output.
    pub fn summary(&self) -> String {
        let mut out = String::from("    K      Inertia   Silhouette\n");
        for row in self.rows() {
            out.push_str(&format!(
                "{:>5} {:>12.6} {:>12.6}\n",
                row.k, row.inertia, row.silhouette
            ));
        }
        out
    }
}

impl FromIterator<ClusterQuality> for ModelSelectionTable {
    fn from_iter<I: IntoIterator<Item = ClusterQuality>>(iter: I) -> Self {
        let mut table = Self::default();
        for quality in iter {
            table.insert(quality);
        }
        table
    }
}

/// Model selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSelectorConfig {
    /// Smallest candidate K (inclusive).
    pub k_min: usize,
    /// Largest candidate K (exclusive).
    pub k_max: usize,
    /// Base seed; each K uses a seed derived from it.
    pub seed: u64,
    /// Evaluate candidates on the rayon pool.
    pub parallel: bool,
    pub kmeans: KMeansConfig,
}

impl Default for ModelSelectorConfig {
    fn default() -> Self {
        Self {
            k_min: 2,
            k_max: 10,
            seed: 42,
            parallel: true,
            kmeans: KMeansConfig::default(),
        }
    }
}

impl ModelSelectorConfig {
    pub fn validate(&self) -> RegimeResult<()> {
        if self.k_min < 2 {
            return Err(RegimeError::Configuration(format!(
                "k_min must be at least 2, got {}",
                self.k_min
            )));
        }
        if self.k_max <= self.k_min {
            return Err(RegimeError::Configuration(format!(
                "k_max ({}) must exceed k_min ({})",
                self.k_max, self.k_min
            )));
        }
        self.kmeans.validate()
    }
}

/// Evaluates every candidate K.
pub struct ClusterModelSelector {
    config: ModelSelectorConfig,
}

impl ClusterModelSelector {
    pub fn new(config: ModelSelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelSelectorConfig {
        &self.config
    }

    /// Build the metrics table for `[k_min, k_max)`.
    pub fn evaluate(&self, samples: &[VolatilitySample]) -> RegimeResult<ModelSelectionTable> {
        self.config.validate()?;

        if samples.len() < self.config.k_max {
            return Err(RegimeError::InsufficientData {
                context: format!(
                    "candidate range [{}, {})",
                    self.config.k_min, self.config.k_max
                ),
                required: self.config.k_max,
                actual: samples.len(),
            });
        }

        let feature = ScaledFeature::from_samples(samples, self.config.k_min)?;
        let candidates: Vec<usize> = (self.config.k_min..self.config.k_max).collect();

        info!(
            "Evaluating K in [{}, {}) on {} samples",
            self.config.k_min,
            self.config.k_max,
            feature.len()
        );

        let results: Vec<RegimeResult<ClusterQuality>> = if self.config.parallel {
            candidates
                .par_iter()
                .map(|&k| self.evaluate_k(&feature, k))
                .collect()
        } else {
            candidates
                .iter()
                .map(|&k| self.evaluate_k(&feature, k))
                .collect()
        };

        // Report the lowest failing K regardless of scheduling order.
        results.into_iter().collect()
    }

    fn evaluate_k(&self, feature: &ScaledFeature, k: usize) -> RegimeResult<ClusterQuality> {
        feature.ensure_separable(k)?;

        let seed = derive_seed(self.config.seed, k);
        let fit = KMeans::new(k, seed, self.config.kmeans.clone()).fit(&feature.values)?;
        let silhouette = silhouette_score(&feature.values, &fit.labels, k).ok_or_else(|| {
            RegimeError::DegenerateCluster {
                k,
                reason: "fewer than two non-empty clusters".to_string(),
            }
        })?;

        debug!(
            "K={}: inertia {:.6}, silhouette {:.4} after {} iterations",
            k, fit.inertia, silhouette, fit.iterations
        );

        Ok(ClusterQuality {
            k,
            inertia: fit.inertia,
            silhouette,
            iterations: fit.iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn samples(values: &[f64]) -> Vec<VolatilitySample> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| VolatilitySample {
                date: start + Duration::days(i as i64),
                rolling_volatility: v,
            })
            .collect()
    }

    fn clustered_vols() -> Vec<f64> {
        (0..90)
            .map(|i| {
                let base = [0.008, 0.015, 0.032][i % 3];
                base + ((i * 7) % 11) as f64 * 0.0002
            })
            .collect()
    }

    #[test]
    fn test_table_covers_range() {
        let selector = ClusterModelSelector::new(ModelSelectorConfig {
            k_min: 2,
            k_max: 6,
            ..Default::default()
        });
        let table = selector.evaluate(&samples(&clustered_vols())).unwrap();

        assert_eq!(table.ks(), vec![2, 3, 4, 5]);
        for row in table.rows() {
            assert!(row.inertia >= 0.0);
            assert!((-1.0..=1.0).contains(&row.silhouette));
        }
    }

    #[test]
    fn test_inertia_decreases_with_k() {
        let selector = ClusterModelSelector::new(ModelSelectorConfig {
            k_min: 2,
            k_max: 5,
            ..Default::default()
        });
        let table = selector.evaluate(&samples(&clustered_vols())).unwrap();

        let inertia: Vec<f64> = table.rows().map(|r| r.inertia).collect();
        assert!(inertia.windows(2).all(|w| w[1] <= w[0]));
        // Three well-separated levels: K=3 has the best silhouette.
        let best = table
            .rows()
            .max_by(|a, b| a.silhouette.total_cmp(&b.silhouette))
            .unwrap();
        assert_eq!(best.k, 3);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let data = samples(&clustered_vols());
        let parallel = ClusterModelSelector::new(ModelSelectorConfig {
            k_max: 8,
            parallel: true,
            ..Default::default()
        })
        .evaluate(&data)
        .unwrap();
        let sequential = ClusterModelSelector::new(ModelSelectorConfig {
            k_max: 8,
            parallel: false,
            ..Default::default()
        })
        .evaluate(&data)
        .unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_invalid_range() {
        let data = samples(&clustered_vols());
        let err = ClusterModelSelector::new(ModelSelectorConfig {
            k_min: 1,
            ..Default::default()
        })
        .evaluate(&data)
        .unwrap_err();
        assert!(matches!(err, RegimeError::Configuration(_)));

        let err = ClusterModelSelector::new(ModelSelectorConfig {
            k_min: 4,
            k_max: 4,
            ..Default::default()
        })
        .evaluate(&data)
        .unwrap_err();
        assert!(matches!(err, RegimeError::Configuration(_)));
    }

    #[test]
    fn test_too_few_samples_for_k_max() {
        let err = ClusterModelSelector::new(ModelSelectorConfig {
            k_min: 2,
            k_max: 6,
            ..Default::default()
        })
        .evaluate(&samples(&[0.01, 0.02, 0.03, 0.04, 0.05]))
        .unwrap_err();
        assert!(matches!(
            err,
            RegimeError::InsufficientData {
                required: 6,
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_variance() {
        let err = ClusterModelSelector::new(ModelSelectorConfig::default())
            .evaluate(&samples(&[0.02; 20]))
            .unwrap_err();
        assert!(matches!(err, RegimeError::DegenerateCluster { .. }));
    }

    #[test]
    fn test_reports_lowest_failing_k() {
        // Three distinct values: K=4 and K=5 cannot be formed.
        let values: Vec<f64> = (0..12).map(|i| [0.01, 0.02, 0.05][i % 3]).collect();
        let err = ClusterModelSelector::new(ModelSelectorConfig {
            k_min: 2,
            k_max: 6,
            ..Default::default()
        })
        .evaluate(&samples(&values))
        .unwrap_err();
        assert!(matches!(err, RegimeError::DegenerateCluster { k: 4, .. }));
    }
}
