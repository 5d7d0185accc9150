//! Configuration and service commands

use anyhow::{bail, Result};
use efficio_core::{AIBackend, AIClient, AnalyzerConfig};

/// Print the effective configuration (API key masked)
pub fn cmd_config(config: &AnalyzerConfig) -> Result<()> {
    println!("{}", config);
    Ok(())
}

/// Check that the configured reasoning service answers
pub async fn cmd_check(config: &AnalyzerConfig) -> Result<()> {
    let client = AIClient::from_config(&config.recommendation);
    println!(
        "🔍 Checking {} at {} (model {})...",
        client.kind(),
        client.host(),
        client.model()
    );

    if client.health_check().await {
        println!("✅ Connected");
        Ok(())
    } else {
        bail!("Reasoning service at {} is not reachable", client.host())
    }
}
