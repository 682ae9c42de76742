//! Command-line parsing for the data-plan advisor.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/math code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dpa", version, about = "Data-plan advisor: usage calibration and plan ranking")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Calibrate behavioral parameters from a usage CSV and print the fit report.
    Fit(FitArgs),
    /// Calibrate, then rank a plan catalog with confidence bands.
    Rank(RankArgs),
    /// Generate a synthetic usage history and run the full pipeline on it.
    ///
    /// This uses the same calibration and ranking code paths as `fit`/`rank`,
    /// driven by a seeded generator, so runs are reproducible end to end.
    Simulate(SimulateArgs),
}

/// Common options for calibration.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Usage history CSV (`date,usage_gb`).
    #[arg(long, value_name = "CSV")]
    pub usage: PathBuf,

    /// Overage rate of the user's current plan (selects the calibration branch).
    #[arg(long, default_value_t = 0.0)]
    pub overage: f64,

    /// Resampling paths for the uncertainty estimate.
    #[arg(long, default_value_t = 1000)]
    pub paths: usize,

    /// Base random seed (per-path seeds derive from it).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Maximum optimizer iterations per fit.
    #[arg(long, default_value_t = 200)]
    pub max_iterations: usize,

    /// Maximum residual evaluations per fit.
    #[arg(long, default_value_t = 2000)]
    pub max_evaluations: usize,

    /// Export the calibrated parameters to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_params: Option<PathBuf>,
}

/// Options for ranking a plan catalog.
#[derive(Debug, Parser, Clone)]
pub struct RankArgs {
    #[command(flatten)]
    pub fit: FitArgs,

    /// Plan catalog CSV (`name,description,quota_gb,overage_per_gb,price`).
    #[arg(long, value_name = "CSV")]
    pub catalog: PathBuf,

    /// Show only the top K plans (0 = all).
    #[arg(long, default_value_t = 0)]
    pub top: usize,

    /// Also report operator profit at this carrying cost per GB.
    #[arg(long, value_name = "SIGMA")]
    pub profit_sigma: Option<f64>,

    /// Export ranked plans to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

/// Options for the synthetic end-to-end run.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Number of synthetic days.
    #[arg(long, default_value_t = 30)]
    pub days: usize,

    /// Gaussian noise added to each synthetic day (GB).
    #[arg(long, default_value_t = 0.5)]
    pub noise: f64,

    /// Random seed (generation and resampling paths derive from it).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Overage rate used for generation and calibration.
    #[arg(long, default_value_t = 0.0)]
    pub overage: f64,

    /// First synthetic date (ISO).
    #[arg(long, default_value = "2024-01-01")]
    pub start: NaiveDate,

    /// Resampling paths for the uncertainty estimate.
    #[arg(long, default_value_t = 200)]
    pub paths: usize,

    /// Optional plan catalog to rank for the synthetic user.
    #[arg(long, value_name = "CSV")]
    pub catalog: Option<PathBuf>,
}
