//! Anomaly detection command

use std::path::Path;

use anyhow::{bail, Result};
use efficio_core::{AnalyzerConfig, AnomalyDetector, AnomalyRecord, MetricsTable};

use super::load_table;

/// Scan a table with an optional threshold override
pub fn detect_anomalies(
    config: &AnalyzerConfig,
    table: &MetricsTable,
    threshold: Option<f64>,
) -> Result<Vec<AnomalyRecord>> {
    let mut detection = config.detection.clone();
    if let Some(z) = threshold {
        if !z.is_finite() || z <= 0.0 {
            bail!("--threshold must be a positive number, got {}", z);
        }
        detection.z_threshold = z;
    }
    Ok(AnomalyDetector::with_config(detection).detect(table))
}

/// Print flagged records
pub fn cmd_anomalies(config: &AnalyzerConfig, input: &Path, threshold: Option<f64>) -> Result<()> {
    let table = load_table(input)?;
    let anomalies = detect_anomalies(config, &table, threshold)?;

    if anomalies.is_empty() {
        println!("✅ No anomalies found in {} records", table.len());
        return Ok(());
    }

    println!(
        "🔍 {} anomalies in {} records\n",
        anomalies.len(),
        table.len()
    );
    println!(
        "{:<12} {:<11} {:<21} {:>12} {:>8}",
        "Date", "Department", "Metric", "Value", "Z"
    );
    println!("{}", "-".repeat(68));
    for a in &anomalies {
        println!(
            "{:<12} {:<11} {:<21} {:>12.2} {:>8.2}",
            a.date.format("%Y-%m-%d"),
            a.department.as_str(),
            a.metric_name.as_str(),
            a.observed_value,
            a.z_score
        );
    }
    Ok(())
}
