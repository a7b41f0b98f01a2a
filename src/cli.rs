//! Command line surface. Flags are turned into [`SampleConfig`] /
//! [`StatsConfig`] here; nothing below this module sees clap types.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::{SampleConfig, StatsConfig};
use crate::data::stats::{CrosstabSpec, ThresholdQuery};
use crate::{pipeline, report};

#[derive(Parser, Debug)]
#[command(
    name = "strata-sample",
    version,
    about = "Draw a stratified sample from a table of records and summarise it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample rows so every class of a column keeps its share
    Sample(SampleArgs),

    /// Print descriptive statistics for a table
    Stats(StatsArgs),
}

/// Flags override the values from `--config`, which override the defaults.
#[derive(Args, Debug, Default)]
pub struct SampleArgs {
    /// JSON file with any of: input, output, stratify_column, sample_size,
    /// min_class_count, seed
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Table to sample from (.csv, .json, .parquet)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Where to write the sample; replaced if it exists
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Column whose class proportions are preserved
    #[arg(short = 'c', long)]
    pub stratify_column: Option<String>,

    /// Number of rows to sample
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub sample_size: Option<i64>,

    /// Classes with fewer rows than this are dropped first
    #[arg(long)]
    pub min_class_count: Option<usize>,

    /// Random seed; the same seed and input give the same sample
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SampleArgs {
    pub fn into_config(self) -> Result<SampleConfig> {
        let mut cfg = match &self.config {
            Some(path) => SampleConfig::from_json_file(path)?,
            None => SampleConfig::default(),
        };
        if let Some(v) = self.input {
            cfg.input = v;
        }
        if let Some(v) = self.output {
            cfg.output = v;
        }
        if let Some(v) = self.stratify_column {
            cfg.stratify_column = v;
        }
        if let Some(v) = self.sample_size {
            cfg.sample_size = v;
        }
        if let Some(v) = self.min_class_count {
            cfg.min_class_count = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Table to summarise
    #[arg(short, long, default_value = "results/200samples.csv")]
    pub input: PathBuf,

    /// Rows shown in the preview (0 to skip)
    #[arg(long, default_value_t = 5)]
    pub head: usize,

    /// VALUE>THRESHOLD:KEY – distinct KEYs and their counts among rows with
    /// VALUE above THRESHOLD (repeatable)
    #[arg(long = "above")]
    pub thresholds: Vec<ThresholdQuery>,

    /// Skip the numeric summary
    #[arg(long)]
    pub no_describe: bool,

    /// Limit the numeric summary to these columns (repeatable)
    #[arg(long = "describe")]
    pub describe_columns: Vec<String>,

    /// Frequency table for a column (repeatable)
    #[arg(long = "freq")]
    pub frequencies: Vec<String>,

    /// ROW,COL – cross-tabulate two columns (repeatable)
    #[arg(long = "crosstab")]
    pub crosstabs: Vec<CrosstabSpec>,
}

impl From<StatsArgs> for StatsConfig {
    fn from(a: StatsArgs) -> Self {
        StatsConfig {
            input: a.input,
            head: a.head,
            thresholds: a.thresholds,
            describe: !a.no_describe,
            describe_columns: a.describe_columns,
            frequencies: a.frequencies,
            crosstabs: a.crosstabs,
        }
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Sample(args) => run_sample(args),
            Commands::Stats(args) => run_stats(args),
        }
    }
}

fn run_sample(args: SampleArgs) -> Result<()> {
    let config = args.into_config()?;
    log::debug!("Sampling with {config:?}");

    let report = pipeline::run(&config)?;
    for (value, n) in &report.allocation {
        log::info!("  {}={value}: {n} rows", config.stratify_column);
    }
    println!(
        "Sampled {} rows and saved them to: {}",
        report.rows_sampled,
        report.output.display()
    );
    Ok(())
}

fn run_stats(args: StatsArgs) -> Result<()> {
    let config = StatsConfig::from(args);
    let text = report::run(&config)?;
    print!("{text}");
    Ok(())
}
