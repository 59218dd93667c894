//! Final clustering for the chosen K.

use std::fmt;

use chrono::NaiveDate;
use tracing::info;

use crate::data::VolatilitySample;
use crate::error::{RegimeError, RegimeResult};

use super::kmeans::{derive_seed, KMeans, KMeansConfig};
use super::scaling::{MinMaxScaler, ScaledFeature};

/// Cluster label as produced by k-means.
///
/// Carries no ordering: cluster 0 is not "low volatility". Only the
/// relabeling step looks at the underlying index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawClusterId(usize);

impl RawClusterId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RawClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "raw#{}", self.0)
    }
}

/// One sample with its raw cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterAssignment {
    pub date: NaiveDate,
    pub rolling_volatility: f64,
    pub raw_cluster: RawClusterId,
}

/// Output of the final fit.
#[derive(Debug, Clone)]
pub struct Classification {
    pub k: usize,
    pub assignments: Vec<ClusterAssignment>,
    /// Centroids on the scaled feature, indexed by raw cluster.
    pub(crate) scaled_centroids: Vec<f64>,
    pub(crate) scaler: MinMaxScaler,
}

impl Classification {
    /// Centroids in volatility units, indexed by raw cluster.
    pub fn centroid_volatilities(&self) -> Vec<(RawClusterId, f64)> {
        self.scaled_centroids
            .iter()
            .enumerate()
            .map(|(idx, &c)| (RawClusterId::new(idx), self.scaler.inverse_transform(c)))
            .collect()
    }
}

/// Fits the final k-means model with an externally chosen K.
pub struct RegimeClassifier {
    k: usize,
    seed: u64,
    kmeans: KMeansConfig,
}

impl RegimeClassifier {
    /// `seed` is the run's base seed; the fit uses the same per-K seed as
    /// model selection, so the partition matches the one that was scored.
    pub fn new(k: usize, seed: u64, kmeans: KMeansConfig) -> Self {
        Self { k, seed, kmeans }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn classify(&self, samples: &[VolatilitySample]) -> RegimeResult<Classification> {
        if self.k < 2 {
            return Err(RegimeError::Configuration(format!(
                "K must be at least 2, got {}",
                self.k
            )));
        }
        if samples.len() < self.k {
            return Err(RegimeError::InsufficientData {
                context: format!("classification with K={}", self.k),
                required: self.k,
                actual: samples.len(),
            });
        }

        let feature = ScaledFeature::from_samples(samples, self.k)?;
        feature.ensure_separable(self.k)?;

        let fit = KMeans::new(self.k, derive_seed(self.seed, self.k), self.kmeans.clone())
            .fit(&feature.values)?;

        info!(
            "Classified {} samples into {} clusters (inertia {:.6})",
            samples.len(),
            self.k,
            fit.inertia
        );

        let assignments = samples
            .iter()
            .zip(&fit.labels)
            .map(|(sample, &label)| ClusterAssignment {
                date: sample.date,
                rolling_volatility: sample.rolling_volatility,
                raw_cluster: RawClusterId::new(label),
            })
            .collect();

        Ok(Classification {
            k: self.k,
            assignments,
            scaled_centroids: fit.centroids,
            scaler: feature.scaler,
        })
    }
}
