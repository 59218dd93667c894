//! Volatility-ranked regime ids.
//!
//! k-means numbers its clusters arbitrarily. Relabeling sorts the raw
//! clusters by mean rolling volatility and numbers them 1..=K, so regime 1
//! is always the calmest and regime K the most volatile.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clustering::{Classification, ClusterAssignment, RawClusterId};
use crate::error::{RegimeError, RegimeResult};

/// Regime id in `[1, K]`, ordered by volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegimeId(usize);

impl RegimeId {
    /// `None` for zero; ids are 1-based.
    pub fn new(id: usize) -> Option<Self> {
        (id >= 1).then_some(Self(id))
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index + 1)
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Zero-based position, for indexing K-sized tables.
    pub fn index(self) -> usize {
        self.0 - 1
    }
}

impl fmt::Display for RegimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One sample with its regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeLabel {
    pub date: NaiveDate,
    pub rolling_volatility: f64,
    pub regime: RegimeId,
}

/// Mean volatility of one raw cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterMean {
    pub raw_cluster: RawClusterId,
    pub members: usize,
    pub mean_volatility: f64,
}

/// Raw cluster to regime mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeMapping {
    regimes: Vec<RegimeId>,
    ranked: Vec<ClusterMean>,
}

impl RegimeMapping {
    /// Rank the raw clusters of `assignments` by mean volatility.
    ///
    /// Equal means keep raw id order. A raw cluster with no members has no
    /// mean and is ranked after every populated one.
    pub fn from_assignments(assignments: &[ClusterAssignment], k: usize) -> RegimeResult<Self> {
        if k == 0 {
            return Err(RegimeError::Configuration("K must be positive".to_string()));
        }

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for assignment in assignments {
            let idx = assignment.raw_cluster.index();
            if idx >= k {
                return Err(RegimeError::Configuration(format!(
                    "{} on {} is outside K={}",
                    assignment.raw_cluster, assignment.date, k
                )));
            }
            sums[idx] += assignment.rolling_volatility;
            counts[idx] += 1;
        }

        let mut ranked: Vec<ClusterMean> = (0..k)
            .map(|idx| ClusterMean {
                raw_cluster: RawClusterId::new(idx),
                members: counts[idx],
                mean_volatility: if counts[idx] > 0 {
                    sums[idx] / counts[idx] as f64
                } else {
                    f64::NAN
                },
            })
            .collect();

        // Stable sort: ties stay in raw id order.
        ranked.sort_by(|a, b| {
            (a.members == 0)
                .cmp(&(b.members == 0))
                .then_with(|| a.mean_volatility.total_cmp(&b.mean_volatility))
        });

        let mut regimes = vec![RegimeId::from_index(0); k];
        for (rank, cluster) in ranked.iter().enumerate() {
            regimes[cluster.raw_cluster.index()] = RegimeId::from_index(rank);
        }

        Ok(Self { regimes, ranked })
    }

    pub fn k(&self) -> usize {
        self.regimes.len()
    }

    pub fn regime_of(&self, raw: RawClusterId) -> Option<RegimeId> {
        self.regimes.get(raw.index()).copied()
    }

    /// Clusters in regime order (regime 1 first).
    pub fn ranked(&self) -> &[ClusterMean] {
        &self.ranked
    }

    /// Relabel every assignment.
    pub fn apply(&self, assignments: &[ClusterAssignment]) -> RegimeResult<Vec<RegimeLabel>> {
        assignments
            .iter()
            .map(|a| {
                let regime = self.regime_of(a.raw_cluster).ok_or_else(|| {
                    RegimeError::Configuration(format!(
                        "{} on {} is outside K={}",
                        a.raw_cluster,
                        a.date,
                        self.k()
                    ))
                })?;
                Ok(RegimeLabel {
                    date: a.date,
                    rolling_volatility: a.rolling_volatility,
                    regime,
                })
            })
            .collect()
    }
}

/// Turns a classification into volatility-ranked regime labels.
pub struct RegimeRelabeler;

impl RegimeRelabeler {
    pub fn relabel(classification: &Classification) -> RegimeResult<Vec<RegimeLabel>> {
        let mapping = RegimeMapping::from_assignments(&classification.assignments, classification.k)?;
        mapping.apply(&classification.assignments)
    }
}
