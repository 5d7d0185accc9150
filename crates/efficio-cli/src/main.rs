//! Efficio CLI - Operational efficiency analyzer
//!
//! Usage:
//!   efficio sample --output metrics.csv       Generate sample data
//!   efficio analyze --input metrics.csv       Run the full analysis
//!   efficio anomalies --input metrics.csv     Detect anomalies only
//!   efficio forecast --input metrics.csv      Forecast utilization
//!   efficio config                            Show effective configuration

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Sample {
            output,
            seed,
            start,
            days,
        } => commands::cmd_sample(&output, seed, &start, days),
        Commands::Analyze {
            input,
            sample: _,
            seed,
            export_dir,
            json,
        } => {
            let config = commands::load_config(config_path)?;
            let source = match input {
                Some(path) => commands::InputSource::Csv(path),
                None => commands::InputSource::Sample { seed },
            };
            commands::cmd_analyze(&config, &source, export_dir.as_deref(), json).await
        }
        Commands::Anomalies { input, threshold } => {
            let config = commands::load_config(config_path)?;
            commands::cmd_anomalies(&config, &input, threshold)
        }
        Commands::Forecast {
            input,
            department,
            horizon,
        } => {
            let config = commands::load_config(config_path)?;
            commands::cmd_forecast(&config, &input, department.as_deref(), horizon)
        }
        Commands::Check => {
            let config = commands::load_config(config_path)?;
            commands::cmd_check(&config).await
        }
        Commands::Config => {
            let config = commands::load_config(config_path)?;
            commands::cmd_config(&config)
        }
    }
}
