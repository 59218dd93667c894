//! Seeded k-means on a scalar feature.
//!
//! Lloyd's algorithm with k-means++ seeding and several restarts; the fit
//! with the lowest inertia wins. All randomness comes from a ChaCha8 stream
//! seeded by the caller, so a given (data, K, seed) always yields the same
//! partition on every platform.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{RegimeError, RegimeResult};

/// K-means settings shared by model selection and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Number of k-means++ restarts.
    pub n_init: usize,
    /// Lloyd iteration cap per restart.
    pub max_iter: usize,
    /// Convergence tolerance, relative to the feature variance.
    pub tolerance: f64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

impl KMeansConfig {
    pub fn validate(&self) -> RegimeResult<()> {
        if self.n_init == 0 || self.max_iter == 0 {
            return Err(RegimeError::Configuration(
                "k-means needs at least one restart and one iteration".to_string(),
            ));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(RegimeError::Configuration(format!(
                "k-means tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Result of a k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub centroids: Vec<f64>,
    /// Cluster index per input value, in `[0, K)`.
    pub labels: Vec<usize>,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
    /// Lloyd iterations used by the winning restart.
    pub iterations: usize,
}

/// Seed for one candidate K, mixed from the run's base seed.
///
/// SplitMix64 finalizer over `base ^ k * golden`, so neighbouring K values
/// get unrelated streams and the result does not depend on evaluation order.
pub fn derive_seed(base: u64, k: usize) -> u64 {
    let mut z = base ^ (k as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub struct KMeans {
    k: usize,
    seed: u64,
    config: KMeansConfig,
}

impl KMeans {
    pub fn new(k: usize, seed: u64, config: KMeansConfig) -> Self {
        Self { k, seed, config }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Fit on `data`. Requires at least K values.
    pub fn fit(&self, data: &[f64]) -> RegimeResult<KMeansFit> {
        self.config.validate()?;
        if self.k == 0 {
            return Err(RegimeError::Configuration("K must be positive".to_string()));
        }
        if data.len() < self.k {
            return Err(RegimeError::InsufficientData {
                context: format!("k-means with K={}", self.k),
                required: self.k,
                actual: data.len(),
            });
        }

        let tolerance = self.config.tolerance * variance(data);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;

        for _ in 0..self.config.n_init {
            let initial = self.init_plus_plus(data, &mut rng);
            let fit = self.lloyd(data, initial, tolerance);
            let better = best.as_ref().map_or(true, |b| fit.inertia < b.inertia);
            if better {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| RegimeError::Configuration("no k-means restarts ran".to_string()))
    }

    /// k-means++ seeding: each new centroid is drawn with probability
    /// proportional to its squared distance from the nearest chosen one.
    fn init_plus_plus(&self, data: &[f64], rng: &mut ChaCha8Rng) -> Vec<f64> {
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(data[rng.gen_range(0..data.len())]);

        let mut distances: Vec<f64> = data.iter().map(|&x| (x - centroids[0]).powi(2)).collect();

        while centroids.len() < self.k {
            let total: f64 = distances.iter().sum();
            let next = if total > 0.0 {
                let target = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                let mut chosen = None;
                for (i, &d) in distances.iter().enumerate() {
                    cumulative += d;
                    if d > 0.0 && cumulative >= target {
                        chosen = Some(i);
                        break;
                    }
                }
                // Rounding can leave the target just past the final sum.
                chosen.or_else(|| distances.iter().rposition(|&d| d > 0.0))
            } else {
                None
            };

            let centroid = data[next.unwrap_or(0)];
            centroids.push(centroid);
            for (d, &x) in distances.iter_mut().zip(data) {
                *d = d.min((x - centroid).powi(2));
            }
        }

        centroids
    }

    fn lloyd(&self, data: &[f64], mut centroids: Vec<f64>, tolerance: f64) -> KMeansFit {
        let mut labels = vec![0usize; data.len()];
        let mut iterations = 0;

        for _ in 0..self.config.max_iter {
            iterations += 1;
            assign(data, &centroids, &mut labels);

            let mut sums = vec![0.0; self.k];
            let mut counts = vec![0usize; self.k];
            for (&x, &label) in data.iter().zip(&labels) {
                sums[label] += x;
                counts[label] += 1;
            }

            let mut updated: Vec<f64> = (0..self.k)
                .map(|c| {
                    if counts[c] > 0 {
                        sums[c] / counts[c] as f64
                    } else {
                        centroids[c]
                    }
                })
                .collect();
            relocate_empty(data, &labels, &counts, &mut updated);

            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            centroids = updated;

            if shift <= tolerance {
                break;
            }
        }

        // Final assignment so labels and inertia match the returned centroids.
        assign(data, &centroids, &mut labels);
        let inertia = data
            .iter()
            .zip(&labels)
            .map(|(&x, &label)| (x - centroids[label]).powi(2))
            .sum();

        KMeansFit {
            centroids,
            labels,
            inertia,
            iterations,
        }
    }
}

/// Nearest-centroid assignment; ties go to the lower cluster index.
fn assign(data: &[f64], centroids: &[f64], labels: &mut [usize]) {
    for (label, &x) in labels.iter_mut().zip(data) {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (c, &centroid) in centroids.iter().enumerate() {
            let dist = (x - centroid).powi(2);
            if dist < best_dist {
                best_dist = dist;
                best = c;
            }
        }
        *label = best;
    }
}

/// Move each empty cluster onto the point farthest from its current centroid.
fn relocate_empty(data: &[f64], labels: &[usize], counts: &[usize], centroids: &mut [f64]) {
    let empty: Vec<usize> = (0..counts.len()).filter(|&c| counts[c] == 0).collect();
    if empty.is_empty() {
        return;
    }

    let mut order: Vec<(usize, f64)> = data
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(i, (&x, &label))| (i, (x - centroids[label]).powi(2)))
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    for (cluster, (idx, _)) in empty.into_iter().zip(order) {
        centroids[cluster] = data[idx];
    }
}

fn variance(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = data.iter().sum::<f64>() / n;
    data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_groups() -> Vec<f64> {
        let mut data = Vec::new();
        for i in 0..20 {
            data.push(0.05 + i as f64 * 0.001);
            data.push(0.50 + i as f64 * 0.001);
            data.push(0.95 + i as f64 * 0.001);
        }
        data
    }

    #[test]
    fn test_separates_obvious_groups() {
        let data = three_groups();
        let fit = KMeans::new(3, 7, KMeansConfig::default()).fit(&data).unwrap();

        let mut centroids = fit.centroids.clone();
        centroids.sort_by(f64::total_cmp);
        assert!((centroids[0] - 0.0595).abs() < 1e-9);
        assert!((centroids[1] - 0.5095).abs() < 1e-9);
        assert!((centroids[2] - 0.9595).abs() < 1e-9);

        // Points of one group share a label.
        for g in 0..3 {
            let label = fit.labels[g];
            assert!((0..20).all(|i| fit.labels[i * 3 + g] == label));
        }
    }

    #[test]
    fn test_inertia_matches_labels() {
        let data = three_groups();
        let fit = KMeans::new(2, 1, KMeansConfig::default()).fit(&data).unwrap();
        let expected: f64 = data
            .iter()
            .zip(&fit.labels)
            .map(|(&x, &l)| (x - fit.centroids[l]).powi(2))
            .sum();
        assert!((fit.inertia - expected).abs() < 1e-12);
    }

    #[test]
    fn test_same_seed_same_fit() {
        let data = three_groups();
        let a = KMeans::new(4, 99, KMeansConfig::default()).fit(&data).unwrap();
        let b = KMeans::new(4, 99, KMeansConfig::default()).fit(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicates_split_into_two_groups() {
        let data = [0.0, 0.0, 0.0, 1.0, 1.0];
        let fit = KMeans::new(2, 42, KMeansConfig::default()).fit(&data).unwrap();
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[1], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert_eq!(fit.inertia, 0.0);
    }

    #[test]
    fn test_too_few_points() {
        let err = KMeans::new(3, 0, KMeansConfig::default())
            .fit(&[0.1, 0.2])
            .unwrap_err();
        assert!(matches!(err, RegimeError::InsufficientData { required: 3, .. }));
    }

    #[test]
    fn test_derive_seed_is_stable_and_distinct() {
        assert_eq!(derive_seed(42, 3), derive_seed(42, 3));
        assert_ne!(derive_seed(42, 3), derive_seed(42, 4));
        assert_ne!(derive_seed(42, 3), derive_seed(43, 3));
    }

    #[test]
    fn test_invalid_config() {
        let config = KMeansConfig {
            n_init: 0,
            ..Default::default()
        };
        let err = KMeans::new(2, 0, config).fit(&[0.0, 1.0]).unwrap_err();
        assert!(matches!(err, RegimeError::Configuration(_)));
    }
}
