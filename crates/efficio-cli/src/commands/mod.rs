//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `analyze` - Full analysis run with console summary and export
//! - `anomalies` - Anomaly detection only
//! - `config` - Effective configuration and service health check
//! - `forecast` - Utilization forecasts
//! - `sample` - Synthetic metrics generation

pub mod analyze;
pub mod anomalies;
pub mod config;
pub mod forecast;
pub mod sample;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use efficio_core::{AnalyzerConfig, Department, MetricsTable};
use tracing::debug;

// Re-export command functions for main.rs
pub use analyze::*;
pub use anomalies::*;
pub use config::*;
pub use forecast::*;
pub use sample::*;

/// Where `analyze` gets its metrics from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    Csv(PathBuf),
    Sample { seed: u64 },
}

/// Load configuration, applying environment overrides
pub fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    let config = AnalyzerConfig::load(path).context("Failed to load configuration")?;
    debug!(source = %config.source, backend = %config.recommendation.backend, "Loaded configuration");
    Ok(config)
}

/// Load and validate a metrics CSV
pub fn load_table(path: &Path) -> Result<MetricsTable> {
    let table = MetricsTable::from_csv_path(path)
        .with_context(|| format!("Failed to load metrics from {}", path.display()))?;
    debug!(records = table.len(), path = %path.display(), "Loaded metrics");
    Ok(table)
}

pub fn parse_department(name: &str) -> Result<Department> {
    name.parse::<Department>().map_err(|e| {
        anyhow::anyhow!(
            "{}. Available: IT, Sales, Operations, HR, Marketing",
            e
        )
    })
}
