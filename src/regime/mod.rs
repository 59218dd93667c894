//! Volatility regimes.
//!
//! Raw k-means clusters become ordered regimes, and the regime path is
//! summarised as a transition matrix:
//! - Regime 1: lowest mean rolling volatility
//! - Regime K: highest mean rolling volatility

pub mod relabel;
pub mod stats;
pub mod transition;

pub use relabel::{ClusterMean, RegimeId, RegimeLabel, RegimeMapping, RegimeRelabeler};
pub use stats::{regime_stats, RegimeStats};
pub use transition::{
    TransitionEntry, TransitionEstimator, TransitionMatrix, TransitionNormalization,
};
