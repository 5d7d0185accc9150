//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Efficio - Operational efficiency analyzer
#[derive(Parser)]
#[command(name = "efficio")]
#[command(about = "Analyze department metrics for anomalies, trends and savings", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the user override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a synthetic metrics CSV
    Sample {
        /// Output CSV path
        #[arg(short, long, default_value = "sample_metrics.csv")]
        output: PathBuf,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First day (YYYY-MM-DD)
        #[arg(long, default_value = "2023-01-01")]
        start: String,

        /// Number of days per department
        #[arg(long, default_value_t = 365)]
        days: usize,
    },

    /// Run the full analysis: anomalies, forecasts, recommendations, report
    Analyze {
        /// Metrics CSV to analyze
        #[arg(short, long, required_unless_present = "sample")]
        input: Option<PathBuf>,

        /// Analyze generated sample data instead of a file
        #[arg(long, conflicts_with = "input")]
        sample: bool,

        /// Seed for --sample
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Write chart series, forecasts and the report into this directory
        #[arg(short, long)]
        export_dir: Option<PathBuf>,

        /// Print the report as JSON instead of the console summary
        #[arg(long)]
        json: bool,
    },

    /// Detect anomalous records only
    Anomalies {
        /// Metrics CSV to scan
        #[arg(short, long)]
        input: PathBuf,

        /// Z-score threshold (overrides config)
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Forecast resource utilization
    Forecast {
        /// Metrics CSV to fit
        #[arg(short, long)]
        input: PathBuf,

        /// Only this department (IT, Sales, Operations, HR, Marketing)
        #[arg(short, long)]
        department: Option<String>,

        /// Days to forecast (overrides config)
        #[arg(long)]
        horizon: Option<usize>,
    },

    /// Check that the reasoning service is reachable
    Check,

    /// Show the effective configuration
    Config,
}
