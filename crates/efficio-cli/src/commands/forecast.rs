//! Utilization forecast command

use std::path::Path;

use anyhow::{bail, Context, Result};
use efficio_core::{AnalyzerConfig, ForecastMap, MetricsTable, UtilizationForecaster};

use super::{load_table, parse_department};

/// Fit one department (failure is an error) or every department (failures are listed)
pub fn run_forecast(
    config: &AnalyzerConfig,
    table: &MetricsTable,
    department: Option<&str>,
    horizon: Option<usize>,
) -> Result<ForecastMap> {
    let mut settings = config.forecast.clone();
    if let Some(days) = horizon {
        if days == 0 {
            bail!("--horizon must be at least 1 day");
        }
        settings.horizon_days = days;
    }
    let forecaster = UtilizationForecaster::with_config(settings);

    match department {
        Some(name) => {
            let dept = parse_department(name)?;
            let series = forecaster
                .forecast_department(table, dept)
                .with_context(|| format!("Failed to forecast {}", dept))?;
            let mut map = ForecastMap::default();
            map.series.insert(dept, series);
            Ok(map)
        }
        None => Ok(forecaster.forecast(table)),
    }
}

pub fn cmd_forecast(
    config: &AnalyzerConfig,
    input: &Path,
    department: Option<&str>,
    horizon: Option<usize>,
) -> Result<()> {
    let table = load_table(input)?;
    let forecasts = run_forecast(config, &table, department, horizon)?;

    println!("📈 Resource utilization forecast\n");
    for s in forecasts.summaries() {
        println!(
            "{} ({} days after {})",
            s.department, s.horizon_days, s.last_observed_date
        );
        println!("  Mean prediction:  {:.1}%", s.horizon_mean_prediction);
        println!(
            "  On {}:    {:.1}% (interval {:.1}% - {:.1}%)",
            s.horizon_end_date, s.horizon_end_prediction, s.horizon_end_lower, s.horizon_end_upper
        );
    }

    for (dept, reason) in &forecasts.failures {
        println!("⚠️  {}: {}", dept, reason);
    }
    Ok(())
}
