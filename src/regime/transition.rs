//! Empirical regime transition matrix.
//!
//! The regime sequence is read as one observed path of a first-order Markov
//! chain. Counting consecutive pairs and normalising each row by its
//! outgoing transitions gives the maximum-likelihood transition matrix.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RegimeError, RegimeResult};

use super::relabel::{RegimeId, RegimeLabel};

/// Row denominator used when turning counts into probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionNormalization {
    /// Divide by the number of transitions leaving the regime. Every
    /// observed row sums to 1.
    #[default]
    OutgoingTransitions,
    /// Divide by every occurrence of the regime, including one on the final
    /// date that has no successor. Rows of such regimes sum below 1.
    RegimeOccurrences,
}

/// One cell of the matrix, in long form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionEntry {
    pub from: RegimeId,
    pub to: RegimeId,
    pub count: u64,
    pub probability: f64,
}

/// K x K transition counts and probabilities, indexed by regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    k: usize,
    normalization: TransitionNormalization,
    counts: Vec<Vec<u64>>,
    probabilities: Vec<Vec<f64>>,
    denominators: Vec<u64>,
    unobserved_rows: Vec<RegimeId>,
}

impl TransitionMatrix {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn normalization(&self) -> TransitionNormalization {
        self.normalization
    }

    pub fn count(&self, from: RegimeId, to: RegimeId) -> u64 {
        self.counts
            .get(from.index())
            .and_then(|row| row.get(to.index()))
            .copied()
            .unwrap_or(0)
    }

    pub fn probability(&self, from: RegimeId, to: RegimeId) -> f64 {
        self.probabilities
            .get(from.index())
            .and_then(|row| row.get(to.index()))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn counts(&self) -> &[Vec<u64>] {
        &self.counts
    }

    pub fn probabilities(&self) -> &[Vec<f64>] {
        &self.probabilities
    }

    /// Denominator used for the row of `from`.
    pub fn denominator(&self, from: RegimeId) -> u64 {
        self.denominators.get(from.index()).copied().unwrap_or(0)
    }

    /// Regimes never seen as a "from" state. Their rows are all zero.
    pub fn unobserved_rows(&self) -> &[RegimeId] {
        &self.unobserved_rows
    }

    pub fn is_row_observed(&self, from: RegimeId) -> bool {
        from.index() < self.k && !self.unobserved_rows.contains(&from)
    }

    pub fn row_sum(&self, from: RegimeId) -> f64 {
        self.probabilities
            .get(from.index())
            .map(|row| row.iter().sum())
            .unwrap_or(0.0)
    }

    /// Mean number of consecutive days spent in `regime`, `1 / (1 - p_ii)`.
    ///
    /// `None` for an unobserved row or an absorbing regime.
    pub fn expected_duration(&self, regime: RegimeId) -> Option<f64> {
        if !self.is_row_observed(regime) {
            return None;
        }
        let stay = self.probability(regime, regime);
        (stay < 1.0).then(|| 1.0 / (1.0 - stay))
    }

    /// All K x K cells, row-major.
    pub fn entries(&self) -> Vec<TransitionEntry> {
        let mut entries = Vec::with_capacity(self.k * self.k);
        for from in 0..self.k {
            for to in 0..self.k {
                entries.push(TransitionEntry {
                    from: RegimeId::from_index(from),
                    to: RegimeId::from_index(to),
                    count: self.counts[from][to],
                    probability: self.probabilities[from][to],
                });
            }
        }
        entries
    }

    /// Plain-text matrix for terminal output.
    pub fn summary(&self) -> String {
        let mut out = String::from("from\\to");
        for to in 1..=self.k {
            out.push_str(&format!(" {:>8}", to));
        }
        out.push('\n');
        for (from, row) in self.probabilities.iter().enumerate() {
            out.push_str(&format!("{:>7}", from + 1));
            for p in row {
                out.push_str(&format!(" {:>8.4}", p));
            }
            if self.unobserved_rows.contains(&RegimeId::from_index(from)) {
                out.push_str("  (no outgoing transitions)");
            }
            out.push('\n');
        }
        out
    }
}

/// Estimates the transition matrix from a regime path.
#[derive(Debug, Clone, Default)]
pub struct TransitionEstimator {
    normalization: TransitionNormalization,
}

impl TransitionEstimator {
    pub fn new(normalization: TransitionNormalization) -> Self {
        Self { normalization }
    }

    /// Estimate from date-ordered labels.
    pub fn estimate(&self, labels: &[RegimeLabel], k: usize) -> RegimeResult<TransitionMatrix> {
        if let Some(pair) = labels.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(RegimeError::Configuration(format!(
                "regime labels out of date order at {}",
                pair[1].date
            )));
        }
        let path: Vec<RegimeId> = labels.iter().map(|l| l.regime).collect();
        self.estimate_path(&path, k)
    }

    /// Estimate from a bare regime sequence.
    pub fn estimate_path(&self, path: &[RegimeId], k: usize) -> RegimeResult<TransitionMatrix> {
        if k == 0 {
            return Err(RegimeError::Configuration("K must be positive".to_string()));
        }
        if let Some(bad) = path.iter().find(|r| r.get() > k) {
            return Err(RegimeError::Configuration(format!(
                "regime {} is outside K={}",
                bad, k
            )));
        }

        let mut counts = vec![vec![0u64; k]; k];
        for pair in path.windows(2) {
            counts[pair[0].index()][pair[1].index()] += 1;
        }

        let outgoing: Vec<u64> = counts.iter().map(|row| row.iter().sum()).collect();
        let denominators: Vec<u64> = match self.normalization {
            TransitionNormalization::OutgoingTransitions => outgoing.clone(),
            TransitionNormalization::RegimeOccurrences => {
                let mut occurrences = vec![0u64; k];
                for regime in path {
                    occurrences[regime.index()] += 1;
                }
                occurrences
            }
        };

        let probabilities: Vec<Vec<f64>> = counts
            .iter()
            .zip(&denominators)
            .map(|(row, &denom)| {
                if denom == 0 {
                    vec![0.0; k]
                } else {
                    row.iter().map(|&c| c as f64 / denom as f64).collect()
                }
            })
            .collect();

        let unobserved_rows: Vec<RegimeId> = outgoing
            .iter()
            .enumerate()
            .filter(|(_, &n)| n == 0)
            .map(|(idx, _)| RegimeId::from_index(idx))
            .collect();

        if !unobserved_rows.is_empty() {
            warn!(
                "Regimes with no outgoing transitions: {:?}",
                unobserved_rows.iter().map(|r| r.get()).collect::<Vec<_>>()
            );
        }
        debug!(
            "Counted {} transitions over {} regimes",
            path.len().saturating_sub(1),
            k
        );

        Ok(TransitionMatrix {
            k,
            normalization: self.normalization,
            counts,
            probabilities,
            denominators,
            unobserved_rows,
        })
    }
}
