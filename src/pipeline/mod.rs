//! Regime pipeline entry point.
//!
//! Wires returns, clustering, relabeling and transition estimation into a
//! single fail-fast batch run driven by an explicit [`PipelineConfig`].

pub mod config;
pub mod runner;

pub use config::PipelineConfig;
pub use runner::{RegimePipeline, RegimeReport};
