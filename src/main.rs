//! Volatility regime CLI.
//!
//! # Usage
//!
//! ```bash
//! # Inertia and silhouette for K in [2, 10)
//! vol-regime select --prices data/spx.csv
//!
//! # Full run with the chosen K
//! vol-regime analyze --prices data/spx.csv --k 3 --output results/spx
//!
//! # Settings from a JSON file, flags override
//! vol-regime analyze --prices data/spx.parquet --config regime.json --k 4
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use vol_regime::export::{write_metrics, write_report};
use vol_regime::{PipelineConfig, PriceLoader, RegimePipeline, TransitionNormalization};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "vol-regime")]
#[command(about = "Cluster daily volatility into regimes and estimate regime transitions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate candidate K values (inertia and silhouette)
    Select {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Run the full pipeline for a chosen K
    Analyze {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of regimes
        #[arg(short, long)]
        k: Option<usize>,

        /// Transition row normalization
        #[arg(long, value_enum)]
        normalization: Option<Normalization>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Price file (CSV or parquet) with date and close columns
    #[arg(short, long)]
    prices: PathBuf,

    /// JSON pipeline config; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Smallest candidate K
    #[arg(long)]
    k_min: Option<usize>,

    /// Largest candidate K (exclusive)
    #[arg(long)]
    k_max: Option<usize>,

    /// Base random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Rolling volatility window in returns
    #[arg(long)]
    window: Option<usize>,

    /// Evaluate candidate K values on one thread
    #[arg(long)]
    sequential: bool,

    /// Output directory for result tables
    #[arg(short, long, default_value = "results")]
    output: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Normalization {
    Outgoing,
    Occurrences,
}

impl From<Normalization> for TransitionNormalization {
    fn from(value: Normalization) -> Self {
        match value {
            Normalization::Outgoing => TransitionNormalization::OutgoingTransitions,
            Normalization::Occurrences => TransitionNormalization::RegimeOccurrences,
        }
    }
}

impl CommonArgs {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(k_min) = self.k_min {
            config.k_min = k_min;
        }
        if let Some(k_max) = self.k_max {
            config.k_max = k_max;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(window) = self.window {
            config.window = window;
        }
        if self.sequential {
            config.parallel = false;
        }
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config {}", path.display()))
}

fn cmd_select(common: CommonArgs) -> Result<()> {
    let config = common.pipeline_config()?;
    let prices = PriceLoader::new(&common.prices)
        .load()
        .with_context(|| format!("Failed to load prices from {}", common.prices.display()))?;

    let table = RegimePipeline::new(config).select(&prices)?;

    println!("{}", SEPARATOR);
    println!("Model selection: {}", common.prices.display());
    println!("{}", SEPARATOR);
    print!("{}", table.summary());

    let path = write_metrics(&table, &common.output)?;
    info!("Metrics written to {}", path.display());
    Ok(())
}

fn cmd_analyze(
    common: CommonArgs,
    k: Option<usize>,
    normalization: Option<Normalization>,
) -> Result<()> {
    let mut config = common.pipeline_config()?;
    if let Some(k) = k {
        config.k = Some(k);
    }
    if let Some(normalization) = normalization {
        config.normalization = normalization.into();
    }

    let prices = PriceLoader::new(&common.prices)
        .load()
        .with_context(|| format!("Failed to load prices from {}", common.prices.display()))?;

    let report = RegimePipeline::new(config).run(&prices)?;

    println!("{}", SEPARATOR);
    println!("Regime analysis: {} (K={})", common.prices.display(), report.k);
    println!("{}", SEPARATOR);
    print!("{}", report.metrics.summary());
    println!();

    println!("Regime   Days   Share%   MeanVol    MaxVol  MeanSpell");
    for stats in &report.stats {
        println!(
            "{:>6} {:>6} {:>8.2} {:>9.6} {:>9.6} {:>10.1}",
            stats.regime,
            stats.days,
            stats.pct_of_total,
            stats.mean_volatility,
            stats.max_volatility,
            stats.mean_spell_length
        );
    }
    println!();
    print!("{}", report.transitions.summary());

    if !report.transitions.unobserved_rows().is_empty() {
        let rows: Vec<String> = report
            .transitions
            .unobserved_rows()
            .iter()
            .map(|r| r.to_string())
            .collect();
        println!("No outgoing transitions observed for regime(s): {}", rows.join(", "));
    }

    let written = write_report(&report, &common.output)?;
    for path in written {
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vol_regime=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Select { common } => cmd_select(common)?,
        Commands::Analyze {
            common,
            k,
            normalization,
        } => cmd_analyze(common, k, normalization)?,
    }

    Ok(())
}
