//! Export of chart series and analysis results
//!
//! Writes into a directory:
//! - `utilization_by_department.csv`: utilization distribution per department
//! - `budget_trend.csv`: total budget per day
//! - `forecasts.csv`: every forecast point for every department
//! - `anomalies.csv`: flagged records
//! - `report.json`: the full report

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::forecast::ForecastMap;
use crate::models::{AnomalyRecord, Department, MetricName, Report};
use crate::pipeline::Analysis;
use crate::table::MetricsTable;

pub const UTILIZATION_FILE: &str = "utilization_by_department.csv";
pub const BUDGET_TREND_FILE: &str = "budget_trend.csv";
pub const FORECASTS_FILE: &str = "forecasts.csv";
pub const ANOMALIES_FILE: &str = "anomalies.csv";
pub const REPORT_FILE: &str = "report.json";

#[derive(Serialize)]
struct UtilizationRow {
    department: Department,
    count: usize,
    min: f64,
    q1: f64,
    median: f64,
    q3: f64,
    max: f64,
    mean: f64,
}

#[derive(Serialize)]
struct ForecastRow {
    department: Department,
    date: String,
    predicted_value: f64,
    lower_bound: f64,
    upper_bound: f64,
    is_forecast: bool,
}

#[derive(Serialize)]
struct AnomalyRow {
    department: Department,
    date: String,
    metric: MetricName,
    observed_value: f64,
    z_score: f64,
}

/// Utilization box-plot statistics, one row per department
pub fn write_utilization_csv<W: Write>(table: &MetricsTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for d in table.utilization_by_department() {
        wtr.serialize(UtilizationRow {
            department: d.department,
            count: d.count,
            min: d.min,
            q1: d.q1,
            median: d.median,
            q3: d.q3,
            max: d.max,
            mean: d.mean,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Total budget spent per day
pub fn write_budget_trend_csv<W: Write>(table: &MetricsTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["date", "budget_spent"])?;
    for point in table.budget_trend() {
        wtr.write_record([
            point.date.format("%Y-%m-%d").to_string(),
            point.budget_spent.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Forecast points for every department, in department then date order
pub fn write_forecasts_csv<W: Write>(forecasts: &ForecastMap, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for series in forecasts.series.values() {
        for p in &series.points {
            wtr.serialize(ForecastRow {
                department: series.department,
                date: p.date.format("%Y-%m-%d").to_string(),
                predicted_value: p.predicted_value,
                lower_bound: p.lower_bound,
                upper_bound: p.upper_bound,
                is_forecast: p.is_forecast,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_anomalies_csv<W: Write>(anomalies: &[AnomalyRecord], writer: W) -> Result<()> {
    // Header is written even when nothing was flagged
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(["department", "date", "metric", "observed_value", "z_score"])?;
    for a in anomalies {
        wtr.serialize(AnomalyRow {
            department: a.department,
            date: a.date.format("%Y-%m-%d").to_string(),
            metric: a.metric_name,
            observed_value: a.observed_value,
            z_score: a.z_score,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_report_json<W: Write>(report: &Report, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Write every export file into `dir` (created if missing), returning the paths written
pub fn export_analysis(dir: &Path, table: &MetricsTable, analysis: &Analysis) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let create = |name: &str| -> Result<(PathBuf, BufWriter<File>)> {
        let path = dir.join(name);
        let file = File::create(&path)?;
        Ok((path, BufWriter::new(file)))
    };

    let mut written = Vec::with_capacity(5);

    let (path, w) = create(UTILIZATION_FILE)?;
    write_utilization_csv(table, w)?;
    written.push(path);

    let (path, w) = create(BUDGET_TREND_FILE)?;
    write_budget_trend_csv(table, w)?;
    written.push(path);

    let (path, w) = create(FORECASTS_FILE)?;
    write_forecasts_csv(&analysis.forecasts, w)?;
    written.push(path);

    let (path, w) = create(ANOMALIES_FILE)?;
    write_anomalies_csv(&analysis.anomalies, w)?;
    written.push(path);

    let (path, mut w) = create(REPORT_FILE)?;
    write_report_json(&analysis.report, &mut w)?;
    w.flush()?;
    written.push(path);

    debug!(dir = %dir.display(), files = written.len(), "Exported analysis");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForecastPoint, ForecastSeries, MetricRecord, RecommendationSet};
    use crate::report::ReportBuilder;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn date(day: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + Duration::days(day)
    }

    fn table() -> MetricsTable {
        let mut records = Vec::new();
        for (dept, util) in [(Department::It, 60.0), (Department::Hr, 80.0)] {
            for day in 0..3 {
                records.push(MetricRecord {
                    date: date(day),
                    department: dept,
                    staff_hours: 80.0,
                    budget_spent: 1_000.0 * (day + 1) as f64,
                    resource_utilization: util + day as f64,
                    productivity_score: 85.0,
                });
            }
        }
        MetricsTable::new(records).unwrap()
    }

    fn analysis(table: &MetricsTable) -> Analysis {
        let recommendation = RecommendationSet {
            identified_inefficiencies: vec!["x".into()],
            optimization_suggestions: vec!["y".into()],
            potential_savings_percent: 10.0,
            priority_actions: vec!["z".into()],
        };
        let report = ReportBuilder::new()
            .with_analysis_date(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .build(table, &[], recommendation)
            .unwrap();

        let mut forecasts = ForecastMap::default();
        forecasts.series.insert(
            Department::It,
            ForecastSeries {
                department: Department::It,
                points: vec![
                    ForecastPoint {
                        date: date(0),
                        predicted_value: 60.0,
                        lower_bound: 55.0,
                        upper_bound: 65.0,
                        is_forecast: false,
                    },
                    ForecastPoint {
                        date: date(1),
                        predicted_value: 61.0,
                        lower_bound: 54.0,
                        upper_bound: 68.0,
                        is_forecast: true,
                    },
                ],
            },
        );

        Analysis {
            report,
            anomalies: vec![AnomalyRecord {
                department: Department::Hr,
                date: date(2),
                metric_name: MetricName::BudgetSpent,
                observed_value: 3_000.0,
                z_score: 2.1,
                mean: 2_000.0,
                std_dev: 476.0,
            }],
            forecasts,
        }
    }

    #[test]
    fn test_budget_trend_csv() {
        let mut out = Vec::new();
        write_budget_trend_csv(&table(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,budget_spent");
        assert_eq!(lines[1], "2023-01-01,2000");
        assert_eq!(lines[3], "2023-01-03,6000");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_utilization_csv() {
        let mut out = Vec::new();
        write_utilization_csv(&table(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "department,count,min,q1,median,q3,max,mean");
        assert!(lines[1].starts_with("IT,3,60.0,"));
        assert!(lines[2].starts_with("HR,3,80.0,"));
    }

    #[test]
    fn test_forecasts_and_anomalies_csv() {
        let t = table();
        let a = analysis(&t);

        let mut out = Vec::new();
        write_forecasts_csv(&a.forecasts, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(
            "department,date,predicted_value,lower_bound,upper_bound,is_forecast\n"
        ));
        assert!(text.contains("IT,2023-01-02,61.0,54.0,68.0,true"));

        let mut out = Vec::new();
        write_anomalies_csv(&a.anomalies, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("HR,2023-01-03,budget_spent,3000.0,2.1"));
    }

    #[test]
    fn test_export_analysis_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested").join("out");
        let t = table();
        let a = analysis(&t);

        let written = export_analysis(&out_dir, &t, &a).unwrap();
        assert_eq!(written.len(), 5);
        for name in [
            UTILIZATION_FILE,
            BUDGET_TREND_FILE,
            FORECASTS_FILE,
            ANOMALIES_FILE,
            REPORT_FILE,
        ] {
            assert!(out_dir.join(name).exists(), "missing {}", name);
        }

        let json = std::fs::read_to_string(out_dir.join(REPORT_FILE)).unwrap();
        let report: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(report.anomaly_count, a.report.anomaly_count);
        assert_eq!(report.dataset_fingerprint, a.report.dataset_fingerprint);
        assert_eq!(report.recommendations, a.report.recommendations);
    }
}
