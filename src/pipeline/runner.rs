//! End-to-end regime run.
//!
//! Runs the stages in order:
//! 1. Daily returns and rolling volatility
//! 2. Candidate-K metrics table
//! 3. Final k-means fit for the chosen K
//! 4. Relabeling by volatility rank
//! 5. Transition matrix and regime statistics
//!
//! Any stage error aborts the run; there is no partial report.

use serde::Serialize;
use tracing::{debug, info};

use crate::clustering::{ClusterModelSelector, ModelSelectionTable, RegimeClassifier};
use crate::data::{volatility_samples, PricePoint, ReturnObservation, VolatilitySample};
use crate::error::{PipelineError, Stage, StageContext};
use crate::regime::{
    regime_stats, RegimeLabel, RegimeRelabeler, RegimeStats, TransitionEstimator,
    TransitionMatrix,
};
use crate::returns::ReturnSeriesBuilder;

use super::config::PipelineConfig;

/// Complete output of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RegimeReport {
    pub config: PipelineConfig,
    pub k: usize,
    pub observations: usize,
    pub metrics: ModelSelectionTable,
    pub regimes: Vec<RegimeLabel>,
    pub transitions: TransitionMatrix,
    pub stats: Vec<RegimeStats>,
}

/// Pipeline entry point.
pub struct RegimePipeline {
    config: PipelineConfig,
}

impl RegimePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage 1 only.
    pub fn returns(&self, prices: &[PricePoint]) -> Result<Vec<ReturnObservation>, PipelineError> {
        ReturnSeriesBuilder::new(self.config.returns_config())
            .build(prices)
            .stage(Stage::Returns)
    }

    /// Stages 1 and 2: the metrics table used to choose K.
    pub fn select(&self, prices: &[PricePoint]) -> Result<ModelSelectionTable, PipelineError> {
        let samples = self.samples(prices)?;
        self.select_from_samples(&samples)
    }

    /// Full run. Requires `config.k`.
    pub fn run(&self, prices: &[PricePoint]) -> Result<RegimeReport, PipelineError> {
        let k = self.config.chosen_k().stage(Stage::Classification)?;

        let samples = self.samples(prices)?;
        let metrics = self.select_from_samples(&samples)?;

        let classification = RegimeClassifier::new(k, self.config.seed, self.config.kmeans.clone())
            .classify(&samples)
            .stage(Stage::Classification)?;

        for (raw, vol) in classification.centroid_volatilities() {
            debug!("Centroid {}: volatility {:.6}", raw, vol);
        }

        let regimes = RegimeRelabeler::relabel(&classification).stage(Stage::Relabeling)?;

        let transitions = TransitionEstimator::new(self.config.normalization)
            .estimate(&regimes, k)
            .stage(Stage::Transitions)?;

        let stats = regime_stats(&regimes, k);

        info!(
            "Run complete: {} prices, {} labelled days, K={}",
            prices.len(),
            regimes.len(),
            k
        );

        Ok(RegimeReport {
            config: self.config.clone(),
            k,
            observations: prices.len(),
            metrics,
            regimes,
            transitions,
            stats,
        })
    }

    fn samples(&self, prices: &[PricePoint]) -> Result<Vec<VolatilitySample>, PipelineError> {
        let observations = self.returns(prices)?;
        let samples = volatility_samples(&observations);
        info!(
            "{} of {} observations have a {}-day volatility",
            samples.len(),
            observations.len(),
            self.config.window
        );
        Ok(samples)
    }

    fn select_from_samples(
        &self,
        samples: &[VolatilitySample],
    ) -> Result<ModelSelectionTable, PipelineError> {
        ClusterModelSelector::new(self.config.selector_config())
            .evaluate(samples)
            .stage(Stage::ModelSelection)
    }
}
