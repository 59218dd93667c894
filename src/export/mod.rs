//! Table export for run outputs.

pub mod writer;

pub use writer::{
    metrics_frame, regimes_frame, transitions_frame, write_metrics, write_report, ExportError,
    RunSummary, METRICS_FILE, REGIMES_FILE, SUMMARY_FILE, TRANSITIONS_FILE,
};
