//! Sample data command

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use efficio_core::sample::{generate, SampleConfig};

/// Generate a synthetic metrics CSV
pub fn cmd_sample(output: &Path, seed: u64, start: &str, days: usize) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .context("Invalid --start date format (use YYYY-MM-DD)")?;

    let config = SampleConfig {
        start,
        days,
        seed,
        ..Default::default()
    };
    let table = generate(&config).context("Failed to generate sample data")?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    table
        .write_csv(BufWriter::new(file))
        .context("Failed to write sample CSV")?;

    println!(
        "✅ Wrote {} records ({} departments, {} days) to {}",
        table.len(),
        config.departments.len(),
        days,
        output.display()
    );
    Ok(())
}
