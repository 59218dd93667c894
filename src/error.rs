//! Error taxonomy for the regime pipeline.
//!
//! Every stage fails fast. Stage errors are wrapped in [`PipelineError`] so
//! the caller always learns which stage failed and on which record.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegimeError {
    #[error("Invalid price on {date}: {reason}")]
    InvalidPrice { date: NaiveDate, reason: String },

    #[error("Insufficient data for {context}: need at least {required}, got {actual}")]
    InsufficientData {
        context: String,
        required: usize,
        actual: usize,
    },

    #[error("Degenerate clustering feature for K={k}: {reason}")]
    DegenerateCluster { k: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

pub type RegimeResult<T> = Result<T, RegimeError>;

/// Pipeline stage, reported alongside any failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Returns,
    ModelSelection,
    Classification,
    Relabeling,
    Transitions,
    Statistics,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Returns => "returns",
            Self::ModelSelection => "model selection",
            Self::Classification => "classification",
            Self::Relabeling => "relabeling",
            Self::Transitions => "transitions",
            Self::Statistics => "statistics",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: RegimeError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: RegimeError) -> Self {
        Self { stage, source }
    }
}

/// Attach a stage to a stage-local result.
pub(crate) trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T> StageContext<T> for RegimeResult<T> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::new(stage, e))
    }
}
