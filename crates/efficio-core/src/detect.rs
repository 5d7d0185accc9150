//! Statistical anomaly detection
//!
//! Flags records whose value lies more than `z_threshold` sample standard
//! deviations from their department/metric mean. Series with zero spread
//! (constant values, or a single record) never produce anomalies.

use tracing::debug;

use crate::models::{AnomalyRecord, Department, MetricName};
use crate::stats;
use crate::table::MetricsTable;

/// Detection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Flag records with |z| strictly above this value
    pub z_threshold: f64,
    /// Metrics to scan, in output order
    pub metrics: Vec<MetricName>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            z_threshold: 2.0,
            metrics: MetricName::all().to_vec(),
        }
    }
}

/// Z-score detector over a metrics table
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: DetectionConfig,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect anomalies for every department
    ///
    /// Output is grouped by department, then metric, then date.
    pub fn detect(&self, table: &MetricsTable) -> Vec<AnomalyRecord> {
        table
            .departments()
            .into_iter()
            .flat_map(|dept| self.detect_department(table, dept))
            .collect()
    }

    /// Detect anomalies for a single department
    pub fn detect_department(
        &self,
        table: &MetricsTable,
        department: Department,
    ) -> Vec<AnomalyRecord> {
        let records = table.department_records(department);
        let mut anomalies = Vec::new();

        for &metric in &self.config.metrics {
            let values: Vec<f64> = records.iter().map(|r| metric.value_of(r)).collect();

            let (mean, std_dev) = match (stats::mean(&values), stats::sample_std_dev(&values)) {
                (Some(m), Some(s)) if !stats::is_degenerate_spread(s, m) => (m, s),
                _ => {
                    debug!(
                        department = %department,
                        metric = metric.as_str(),
                        "Skipping metric with zero variance"
                    );
                    continue;
                }
            };

            let before = anomalies.len();
            for (record, value) in records.iter().zip(&values) {
                let z = (value - mean).abs() / std_dev;
                if z > self.config.z_threshold {
                    anomalies.push(AnomalyRecord {
                        department,
                        date: record.date,
                        metric_name: metric,
                        observed_value: *value,
                        z_score: z,
                        mean,
                        std_dev,
                    });
                }
            }

            debug!(
                department = %department,
                metric = metric.as_str(),
                flagged = anomalies.len() - before,
                "Scanned metric"
            );
        }

        anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricRecord;
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    fn constant_records(dept: Department, days: i64) -> Vec<MetricRecord> {
        (0..days)
            .map(|i| MetricRecord {
                date: start() + Duration::days(i),
                department: dept,
                staff_hours: 80.0,
                budget_spent: 10_000.0,
                resource_utilization: 75.0,
                productivity_score: 85.0,
            })
            .collect()
    }

    #[test]
    fn test_single_injected_outlier() {
        let mut records = constant_records(Department::Operations, 100);
        records[42].resource_utilization = 10.0;
        let table = MetricsTable::new(records).unwrap();

        let anomalies = AnomalyDetector::new().detect(&table);

        assert_eq!(anomalies.len(), 1);
        let a = &anomalies[0];
        assert_eq!(a.department, Department::Operations);
        assert_eq!(a.metric_name, MetricName::ResourceUtilization);
        assert_eq!(a.date, start() + Duration::days(42));
        assert_eq!(a.observed_value, 10.0);
        // mean 74.35, sample std 6.5
        assert!((a.mean - 74.35).abs() < 1e-9);
        assert!((a.std_dev - 6.5).abs() < 1e-9);
        assert!((a.z_score - 9.9).abs() < 1e-9);
    }

    #[test]
    fn test_zero_variance_flags_nothing() {
        let table = MetricsTable::new(constant_records(Department::Hr, 30)).unwrap();
        assert!(AnomalyDetector::new().detect(&table).is_empty());
    }

    #[test]
    fn test_single_record_flags_nothing() {
        let table = MetricsTable::new(constant_records(Department::Hr, 1)).unwrap();
        assert!(AnomalyDetector::new().detect(&table).is_empty());
    }

    #[test]
    fn test_flags_exactly_injected_records() {
        // Alternating 70/80 baseline (std ~5) with large spikes
        let mut records = constant_records(Department::Sales, 60);
        for (i, r) in records.iter_mut().enumerate() {
            r.staff_hours = if i % 2 == 0 { 70.0 } else { 80.0 };
        }
        records[10].staff_hours = 200.0;
        records[45].staff_hours = 0.0;
        let table = MetricsTable::new(records).unwrap();

        let detector = AnomalyDetector::new();
        let anomalies = detector.detect(&table);

        let values = table.metric_values(Department::Sales, MetricName::StaffHours);
        let mean = stats::mean(&values).unwrap();
        let std = stats::sample_std_dev(&values).unwrap();
        let expected: Vec<NaiveDate> = table
            .department_records(Department::Sales)
            .iter()
            .filter(|r| (r.staff_hours - mean).abs() / std > 2.0)
            .map(|r| r.date)
            .collect();

        let flagged: Vec<NaiveDate> = anomalies.iter().map(|a| a.date).collect();
        assert_eq!(flagged, expected);
        assert!(flagged.contains(&(start() + Duration::days(10))));
        assert!(flagged.contains(&(start() + Duration::days(45))));
        assert!(anomalies
            .iter()
            .all(|a| a.metric_name == MetricName::StaffHours));
    }

    #[test]
    fn test_output_ordering() {
        let mut records = constant_records(Department::Marketing, 50);
        records[5].budget_spent = 1.0;
        records[20].staff_hours = 500.0;
        records[30].resource_utilization = 0.0;

        let mut it = constant_records(Department::It, 50);
        it[3].resource_utilization = 1.0;
        records.extend(it);

        let table = MetricsTable::new(records).unwrap();
        let anomalies = AnomalyDetector::new().detect(&table);

        let keys: Vec<_> = anomalies
            .iter()
            .map(|a| (a.department, a.metric_name))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Department::It, MetricName::ResourceUtilization),
                (Department::Marketing, MetricName::StaffHours),
                (Department::Marketing, MetricName::BudgetSpent),
                (Department::Marketing, MetricName::ResourceUtilization),
            ]
        );
    }

    #[test]
    fn test_custom_threshold_and_metrics() {
        let mut records = constant_records(Department::It, 100);
        records[7].resource_utilization = 10.0;
        records[8].staff_hours = 300.0;
        let table = MetricsTable::new(records).unwrap();

        let detector = AnomalyDetector::with_config(DetectionConfig {
            z_threshold: 50.0,
            metrics: vec![MetricName::ResourceUtilization],
        });
        assert!(detector.detect(&table).is_empty());

        let detector = AnomalyDetector::with_config(DetectionConfig {
            z_threshold: 2.0,
            metrics: vec![MetricName::StaffHours],
        });
        let anomalies = detector.detect(&table);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].metric_name, MetricName::StaffHours);
    }
}
