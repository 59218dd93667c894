//! CSV and JSON writers for run outputs.
//!
//! Files written by [`write_report`]:
//! - `metrics.csv`: k, inertia, silhouette, iterations
//! - `regimes.csv`: date, rolling_volatility, regime
//! - `transitions.csv`: from, to, count, probability (long form)
//! - `summary.json`: config, chosen K, per-regime stats

use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::clustering::ModelSelectionTable;
use crate::pipeline::{PipelineConfig, RegimeReport};
use crate::regime::{RegimeId, RegimeLabel, RegimeStats, TransitionMatrix, TransitionNormalization};

pub const METRICS_FILE: &str = "metrics.csv";
pub const REGIMES_FILE: &str = "regimes.csv";
pub const TRANSITIONS_FILE: &str = "transitions.csv";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run summary written next to the tables.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub k: usize,
    pub seed: u64,
    pub price_observations: usize,
    pub labelled_days: usize,
    pub first_labelled_date: Option<String>,
    pub last_labelled_date: Option<String>,
    pub normalization: TransitionNormalization,
    pub unobserved_rows: &'a [RegimeId],
    pub expected_durations: Vec<Option<f64>>,
    pub stats: &'a [RegimeStats],
    pub config: &'a PipelineConfig,
}

impl<'a> RunSummary<'a> {
    pub fn from_report(report: &'a RegimeReport) -> Self {
        let transitions = &report.transitions;
        Self {
            k: report.k,
            seed: report.config.seed,
            price_observations: report.observations,
            labelled_days: report.regimes.len(),
            first_labelled_date: report.regimes.first().map(|l| l.date.to_string()),
            last_labelled_date: report.regimes.last().map(|l| l.date.to_string()),
            normalization: transitions.normalization(),
            unobserved_rows: transitions.unobserved_rows(),
            expected_durations: (1..=report.k)
                .filter_map(RegimeId::new)
                .map(|r| transitions.expected_duration(r))
                .collect(),
            stats: &report.stats,
            config: &report.config,
        }
    }
}

/// Write every table of a full run into `dir`, creating it if needed.
pub fn write_report(report: &RegimeReport, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ExportError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let written = vec![
        write_metrics(&report.metrics, dir)?,
        write_csv(&mut regimes_frame(&report.regimes)?, &dir.join(REGIMES_FILE))?,
        write_csv(&mut transitions_frame(&report.transitions)?, &dir.join(TRANSITIONS_FILE))?,
        write_summary(&RunSummary::from_report(report), &dir.join(SUMMARY_FILE))?,
    ];

    info!("Wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}

/// Write only the metrics table, for a `select` run.
pub fn write_metrics(table: &ModelSelectionTable, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    write_csv(&mut metrics_frame(table)?, &dir.join(METRICS_FILE))
}

pub fn metrics_frame(table: &ModelSelectionTable) -> PolarsResult<DataFrame> {
    let rows: Vec<_> = table.rows().collect();
    df![
        "k" => rows.iter().map(|q| q.k as u32).collect::<Vec<_>>(),
        "inertia" => rows.iter().map(|q| q.inertia).collect::<Vec<_>>(),
        "silhouette" => rows.iter().map(|q| q.silhouette).collect::<Vec<_>>(),
        "iterations" => rows.iter().map(|q| q.iterations as u32).collect::<Vec<_>>(),
    ]
}

pub fn regimes_frame(labels: &[RegimeLabel]) -> PolarsResult<DataFrame> {
    df![
        "date" => labels.iter().map(|l| l.date.to_string()).collect::<Vec<_>>(),
        "rolling_volatility" => labels.iter().map(|l| l.rolling_volatility).collect::<Vec<_>>(),
        "regime" => labels.iter().map(|l| l.regime.get() as u32).collect::<Vec<_>>(),
    ]
}

pub fn transitions_frame(matrix: &TransitionMatrix) -> PolarsResult<DataFrame> {
    let entries = matrix.entries();
    df![
        "from" => entries.iter().map(|e| e.from.get() as u32).collect::<Vec<_>>(),
        "to" => entries.iter().map(|e| e.to.get() as u32).collect::<Vec<_>>(),
        "count" => entries.iter().map(|e| e.count).collect::<Vec<_>>(),
        "probability" => entries.iter().map(|e| e.probability).collect::<Vec<_>>(),
    ]
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<PathBuf, ExportError> {
    let file = fs::File::create(path)?;
    CsvWriter::new(file).include_header(true).finish(df)?;
    Ok(path.to_path_buf())
}

fn write_summary(summary: &RunSummary<'_>, path: &Path) -> Result<PathBuf, ExportError> {
    let content = serde_json::to_string_pretty(summary)?;
    fs::write(path, content)?;
    Ok(path.to_path_buf())
}
