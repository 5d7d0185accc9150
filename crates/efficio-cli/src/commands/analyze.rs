//! Full analysis command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use efficio_core::sample::{generate, SampleConfig};
use efficio_core::{export_analysis, format_currency, Analysis, AnalyzerConfig, EfficiencyAnalyzer};

use super::{load_table, InputSource};

/// Run the analysis and print the summary (or the report JSON)
pub async fn cmd_analyze(
    config: &AnalyzerConfig,
    source: &InputSource,
    export_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let table = Arc::new(match source {
        InputSource::Csv(path) => load_table(path)?,
        InputSource::Sample { seed } => generate(&SampleConfig {
            seed: *seed,
            ..Default::default()
        })
        .context("Failed to generate sample data")?,
    });

    let analysis = EfficiencyAnalyzer::from_config(config)
        .analyze(Arc::clone(&table))
        .await
        .context("Analysis failed")?;

    let exported = match export_dir {
        Some(dir) => export_analysis(dir, &table, &analysis)
            .with_context(|| format!("Failed to export results to {}", dir.display()))?,
        None => Vec::new(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis.report)?);
    } else {
        print!("{}", render_summary(&analysis, &exported));
    }
    Ok(())
}

/// Console summary of a finished analysis
pub fn render_summary(analysis: &Analysis, exported: &[PathBuf]) -> String {
    let report = &analysis.report;
    let mut lines = vec![
        "📊 Efficiency Analysis Summary".to_string(),
        String::new(),
        format!(
            "  Average Resource Utilization: {:.1}%",
            report.metrics_summary.avg_utilization
        ),
        format!(
            "  Potential Annual Savings: {}",
            format_currency(report.potential_annual_savings)
        ),
        format!("  Anomalies Detected: {}", report.anomaly_count),
        String::new(),
        "🎯 Priority Actions:".to_string(),
    ];
    for (i, action) in report.recommendations.priority_actions.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, action));
    }

    if !report.forecast_failures.is_empty() {
        lines.push(String::new());
        lines.push("⚠️  No forecast for:".to_string());
        for (dept, reason) in &report.forecast_failures {
            lines.push(format!("  {}: {}", dept, reason));
        }
    }

    if !exported.is_empty() {
        lines.push(String::new());
        lines.push("📁 Exported files:".to_string());
        for path in exported {
            lines.push(format!("  {}", path.display()));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}
