//! Report assembly
//!
//! Pure computation over an already-validated table: aggregate statistics,
//! per-department rollups, the savings estimate and the final [`Report`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::forecast::ForecastMap;
use crate::models::{
    AnomalyRecord, DepartmentMetrics, MetricRecord, MetricsSummary, RecommendationSet, Report,
};
use crate::stats;
use crate::table::MetricsTable;

/// Aggregate statistics over every record in the table
pub fn compute_summary(table: &MetricsTable) -> Result<MetricsSummary> {
    if table.is_empty() {
        return Err(Error::DataIntegrity(
            "Cannot summarize an empty metrics table".into(),
        ));
    }

    let records = table.records();
    let utilization: Vec<f64> = records.iter().map(|r| r.resource_utilization).collect();
    let productivity: Vec<f64> = records.iter().map(|r| r.productivity_score).collect();

    let avg_utilization = stats::mean(&utilization).unwrap_or_default();
    let total_budget: f64 = records.iter().map(|r| r.budget_spent).sum();

    let mut department_metrics = BTreeMap::new();
    for dept in table.departments() {
        let rows = table.department_records(dept);
        let column = |f: fn(&MetricRecord) -> f64| -> Vec<f64> {
            rows.iter().map(|&r| f(r)).collect()
        };

        department_metrics.insert(
            dept,
            DepartmentMetrics {
                avg_utilization: stats::mean(&column(|r| r.resource_utilization))
                    .unwrap_or_default(),
                total_budget: column(|r| r.budget_spent).iter().sum(),
                avg_productivity: stats::mean(&column(|r| r.productivity_score))
                    .unwrap_or_default(),
                avg_staff_hours: stats::mean(&column(|r| r.staff_hours)).unwrap_or_default(),
                record_count: rows.len(),
            },
        );
    }

    Ok(MetricsSummary {
        avg_utilization,
        total_budget,
        utilization_productivity_correlation: stats::pearson(&utilization, &productivity),
        record_count: records.len(),
        department_metrics,
    })
}

/// Estimated annual savings from unused capacity
///
/// `(100 - avg_utilization) * total_budget * (savings_percent / 100) / 100`:
/// the headroom below full utilization, scaled by total spend and by the
/// recommended savings fraction. This is a heuristic proxy, not a financially
/// validated figure.
pub fn potential_annual_savings(
    avg_utilization: f64,
    total_budget: f64,
    savings_percent: f64,
) -> f64 {
    (100.0 - avg_utilization) * total_budget * savings_percent / 10_000.0
}

/// Format an amount as dollars with thousands separators (`$1,234,567.89`)
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{}${}.{}", sign, grouped, frac_part)
}

/// Builds the final report from analysis outputs
///
/// Performs no I/O. The analysis timestamp defaults to the build time and can
/// be pinned for reproducible output.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    analysis_date: Option<DateTime<Utc>>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed analysis timestamp
    pub fn with_analysis_date(mut self, date: DateTime<Utc>) -> Self {
        self.analysis_date = Some(date);
        self
    }

    /// Build a report without forecast data
    pub fn build(
        &self,
        table: &MetricsTable,
        anomalies: &[AnomalyRecord],
        recommendation: RecommendationSet,
    ) -> Result<Report> {
        self.assemble(table, anomalies, recommendation, None)
    }

    /// Build a report including forecast summaries and failures
    pub fn build_with_forecasts(
        &self,
        table: &MetricsTable,
        anomalies: &[AnomalyRecord],
        recommendation: RecommendationSet,
        forecasts: &ForecastMap,
    ) -> Result<Report> {
        self.assemble(table, anomalies, recommendation, Some(forecasts))
    }

    fn assemble(
        &self,
        table: &MetricsTable,
        anomalies: &[AnomalyRecord],
        recommendation: RecommendationSet,
        forecasts: Option<&ForecastMap>,
    ) -> Result<Report> {
        let metrics_summary = compute_summary(table)?;
        let savings = potential_annual_savings(
            metrics_summary.avg_utilization,
            metrics_summary.total_budget,
            recommendation.potential_savings_percent,
        );

        Ok(Report {
            potential_annual_savings: savings,
            anomaly_count: anomalies.len(),
            forecasts: forecasts.map(ForecastMap::summaries).unwrap_or_default(),
            forecast_failures: forecasts.map(|f| f.failures.clone()).unwrap_or_default(),
            analysis_date: self.analysis_date.unwrap_or_else(Utc::now),
            dataset_fingerprint: table.fingerprint(),
            metrics_summary,
            recommendations: recommendation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Department, MetricName};
    use chrono::{Duration, NaiveDate, TimeZone};

    fn record(dept: Department, day: i64, util: f64, budget: f64, prod: f64) -> MetricRecord {
        MetricRecord {
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + Duration::days(day),
            department: dept,
            staff_hours: 80.0,
            budget_spent: budget,
            resource_utilization: util,
            productivity_score: prod,
        }
    }

    fn recommendation(savings: f64) -> RecommendationSet {
        RecommendationSet {
            identified_inefficiencies: vec!["Idle capacity".into()],
            optimization_suggestions: vec!["Consolidate".into()],
            potential_savings_percent: savings,
            priority_actions: vec!["Act".into()],
        }
    }

    fn sample_table() -> MetricsTable {
        MetricsTable::new(vec![
            record(Department::It, 0, 70.0, 1_000.0, 80.0),
            record(Department::It, 1, 90.0, 3_000.0, 90.0),
            record(Department::Sales, 0, 60.0, 2_000.0, 70.0),
            record(Department::Sales, 1, 80.0, 4_000.0, 85.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_savings_formula() {
        assert_eq!(potential_annual_savings(80.0, 1_000_000.0, 10.0), 20_000.0);
        assert_eq!(potential_annual_savings(100.0, 1_000_000.0, 50.0), 0.0);
        assert_eq!(potential_annual_savings(50.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn test_compute_summary() {
        let summary = compute_summary(&sample_table()).unwrap();
        assert_eq!(summary.avg_utilization, 75.0);
        assert_eq!(summary.total_budget, 10_000.0);
        assert_eq!(summary.record_count, 4);
        let r = summary.utilization_productivity_correlation.unwrap();
        assert!(r > 0.9 && r <= 1.0);

        let it = &summary.department_metrics[&Department::It];
        assert_eq!(it.avg_utilization, 80.0);
        assert_eq!(it.total_budget, 4_000.0);
        assert_eq!(it.avg_productivity, 85.0);
        assert_eq!(it.record_count, 2);

        let keys: Vec<_> = summary.department_metrics.keys().copied().collect();
        assert_eq!(keys, vec![Department::It, Department::Sales]);
    }

    #[test]
    fn test_correlation_absent_for_constant_series() {
        let table = MetricsTable::new(vec![
            record(Department::Hr, 0, 70.0, 1_000.0, 85.0),
            record(Department::Hr, 1, 90.0, 1_000.0, 85.0),
        ])
        .unwrap();
        let summary = compute_summary(&table).unwrap();
        assert!(summary.utilization_productivity_correlation.is_none());
    }

    #[test]
    fn test_empty_table_is_data_integrity_error() {
        let table = MetricsTable::new(Vec::new()).unwrap();
        assert!(matches!(
            compute_summary(&table),
            Err(Error::DataIntegrity(_))
        ));
        assert!(ReportBuilder::new()
            .build(&table, &[], recommendation(10.0))
            .is_err());
    }

    #[test]
    fn test_build_report() {
        let table = sample_table();
        let anomalies = vec![AnomalyRecord {
            department: Department::It,
            date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            metric_name: MetricName::BudgetSpent,
            observed_value: 3_000.0,
            z_score: 2.5,
            mean: 2_000.0,
            std_dev: 400.0,
        }];
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let report = ReportBuilder::new()
            .with_analysis_date(at)
            .build(&table, &anomalies, recommendation(10.0))
            .unwrap();

        assert_eq!(report.anomaly_count, 1);
        assert_eq!(report.analysis_date, at);
        // (100 - 75) * 10_000 * 10 / 10_000
        assert_eq!(report.potential_annual_savings, 250.0);
        assert!(report.forecasts.is_empty());
        assert!(report.forecast_failures.is_empty());
        assert_eq!(report.dataset_fingerprint, table.fingerprint());
    }

    #[test]
    fn test_repeat_builds_are_identical() {
        let table = sample_table();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let builder = ReportBuilder::new().with_analysis_date(at);

        let a = builder.build(&table, &[], recommendation(12.5)).unwrap();
        let b = builder.build(&table, &[], recommendation(12.5)).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_build_with_forecast_failures() {
        let table = sample_table();
        let mut forecasts = ForecastMap::default();
        forecasts
            .failures
            .insert(Department::Sales, "Need at least 14 observations, got 2".into());

        let report = ReportBuilder::new()
            .build_with_forecasts(&table, &[], recommendation(5.0), &forecasts)
            .unwrap();
        assert_eq!(report.forecast_failures.len(), 1);
        assert!(report.forecasts.is_empty());
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.5), "$999.50");
        assert_eq!(format_currency(1_234.0), "$1,234.00");
        assert_eq!(format_currency(20_000.0), "$20,000.00");
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_currency(-45_000.0), "-$45,000.00");
        assert_eq!(format_currency(-0.001), "$0.00");
    }
}
