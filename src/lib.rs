pub mod clustering;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod regime;
pub mod returns;

// Re-export commonly used types
pub use clustering::{
    ClusterAssignment, ClusterModelSelector, ClusterQuality, ModelSelectionTable,
    ModelSelectorConfig, RawClusterId, RegimeClassifier,
};
pub use data::{PriceLoader, PricePoint, ReturnObservation, VolatilitySample};
pub use error::{PipelineError, RegimeError, RegimeResult, Stage};
pub use pipeline::{PipelineConfig, RegimePipeline, RegimeReport};
pub use regime::{
    RegimeId, RegimeLabel, RegimeRelabeler, RegimeStats, TransitionEstimator, TransitionMatrix,
    TransitionNormalization,
};
pub use returns::{ReturnSeriesBuilder, ReturnSeriesConfig};
