//! Volatility clustering.
//!
//! Both stages cluster the min-max scaled rolling volatility:
//! - Model selection: inertia and silhouette for each candidate K
//! - Classification: one final fit for the chosen K, raw cluster per sample
//!
//! A candidate K is always fit with the same seed, derived from the run's
//! base seed, so the final partition is the one that was scored.

pub mod classifier;
pub mod kmeans;
pub mod scaling;
pub mod selector;
pub mod silhouette;

pub use classifier::{Classification, ClusterAssignment, RawClusterId, RegimeClassifier};
pub use kmeans::{derive_seed, KMeans, KMeansConfig, KMeansFit};
pub use scaling::{MinMaxScaler, ScaledFeature};
pub use selector::{ClusterModelSelector, ClusterQuality, ModelSelectionTable, ModelSelectorConfig};
pub use silhouette::silhouette_score;
