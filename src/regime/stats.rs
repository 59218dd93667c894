//! Per-regime summary statistics.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::relabel::{RegimeId, RegimeLabel};

/// Statistics for a regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeStats {
    pub regime: RegimeId,
    pub days: usize,
    pub pct_of_total: f64,
    pub mean_volatility: f64,
    /// Sample standard deviation; `None` for a single-day regime.
    pub std_volatility: Option<f64>,
    pub min_volatility: f64,
    pub max_volatility: f64,
    /// Number of uninterrupted runs of the regime.
    pub spells: usize,
    pub mean_spell_length: f64,
}

/// Summaries for every regime that occurs, in regime order.
pub fn regime_stats(labels: &[RegimeLabel], k: usize) -> Vec<RegimeStats> {
    let total_days = labels.len();
    let mut vols: Vec<Vec<f64>> = vec![Vec::new(); k];
    let mut spells = vec![0usize; k];
    let mut previous: Option<RegimeId> = None;

    for label in labels {
        let idx = label.regime.index();
        if idx >= k {
            continue;
        }
        vols[idx].push(label.rolling_volatility);
        if previous != Some(label.regime) {
            spells[idx] += 1;
        }
        previous = Some(label.regime);
    }

    vols.into_iter()
        .zip(spells)
        .enumerate()
        .filter(|(_, (v, _))| !v.is_empty())
        .map(|(idx, (v, spell_count))| {
            let days = v.len();
            RegimeStats {
                regime: RegimeId::from_index(idx),
                days,
                pct_of_total: days as f64 / total_days as f64 * 100.0,
                mean_volatility: v.iter().mean(),
                std_volatility: (days > 1).then(|| v.iter().std_dev()),
                min_volatility: Statistics::min(v.iter()),
                max_volatility: Statistics::max(v.iter()),
                spells: spell_count,
                mean_spell_length: days as f64 / spell_count as f64,
            }
        })
        .collect()
}
