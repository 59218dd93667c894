//! Price series loader for CSV and parquet files.
//!
//! Expects one row per trading day with the columns:
//! - date (ISO `YYYY-MM-DD` string, Date or Datetime column)
//! - close (any numeric type)
//!
//! Rows are returned in file order. Null or non-finite closes are passed
//! through as `NaN`, and out-of-order dates are left in place, so the return
//! builder rejects them with the offending date instead of the loader
//! repairing rows silently.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;
use tracing::info;

use super::types::PricePoint;

/// Columns the loader reads.
pub const PRICE_COLUMNS: &[&str] = &["date", "close"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Loads a single asset's daily closes.
pub struct PriceLoader {
    path: PathBuf,
}

impl PriceLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the file into a DataFrame, dispatching on extension.
    pub fn load_dataframe(&self) -> Result<DataFrame, LoaderError> {
        if !self.path.exists() {
            return Err(LoaderError::FileNotFound(self.path.display().to_string()));
        }

        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let df = match extension.as_str() {
            "csv" => CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(self.path.clone()))?
                .finish()?,
            "parquet" => LazyFrame::scan_parquet(&self.path, ScanArgsParquet::default())?.collect()?,
            other => return Err(LoaderError::UnsupportedFormat(other.to_string())),
        };

        Ok(df)
    }

    /// Load the series in file order.
    pub fn load(&self) -> Result<Vec<PricePoint>, LoaderError> {
        let df = self.load_dataframe()?;
        let prices = dataframe_to_prices(&df)?;
        info!("Loaded {} prices from {}", prices.len(), self.path.display());
        Ok(prices)
    }
}

/// Convert days since Unix epoch to NaiveDate.
fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + 719_163)
}

fn dataframe_to_prices(df: &DataFrame) -> Result<Vec<PricePoint>, LoaderError> {
    for name in PRICE_COLUMNS {
        if df.column(name).is_err() {
            return Err(LoaderError::InvalidData(format!("missing column '{}'", name)));
        }
    }

    // Timestamps are truncated to their calendar day
    let date_col = match df.column("date")?.dtype() {
        DataType::Datetime(_, _) => df.column("date")?.cast(&DataType::Date)?,
        _ => df.column("date")?.clone(),
    };

    // Handle both string and date column types
    let dates: Vec<Option<NaiveDate>> = if let Ok(str_col) = date_col.str() {
        str_col
            .into_iter()
            .map(|s| s.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
            .collect()
    } else if let Ok(date_col) = date_col.date() {
        date_col
            .into_iter()
            .map(|d| d.and_then(date_from_days))
            .collect()
    } else {
        return Err(LoaderError::InvalidData(
            "date column has unexpected type".to_string(),
        ));
    };

    let close_col = df.column("close")?.cast(&DataType::Float64)?;
    let closes = close_col.f64()?;

    dates
        .into_iter()
        .zip(closes.into_iter())
        .enumerate()
        .map(|(row, (date, close))| {
            let date = date.ok_or_else(|| {
                LoaderError::InvalidData(format!("row {}: missing or malformed date", row))
            })?;
            Ok(PricePoint::new(date, close.unwrap_or(f64::NAN)))
        })
        .collect()
}
