//! Domain models for Efficio

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Departments tracked by the analyzer
///
/// Ordering follows declaration order and drives the ordering of every
/// per-department output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Department {
    #[serde(rename = "IT")]
    It,
    Sales,
    Operations,
    #[serde(rename = "HR")]
    Hr,
    Marketing,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::It => "IT",
            Self::Sales => "Sales",
            Self::Operations => "Operations",
            Self::Hr => "HR",
            Self::Marketing => "Marketing",
        }
    }

    /// Get all departments
    pub fn all() -> &'static [Department] {
        &[
            Self::It,
            Self::Sales,
            Self::Operations,
            Self::Hr,
            Self::Marketing,
        ]
    }
}

impl std::str::FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "it" => Ok(Self::It),
            "sales" => Ok(Self::Sales),
            "operations" | "ops" => Ok(Self::Operations),
            "hr" | "human resources" => Ok(Self::Hr),
            "marketing" => Ok(Self::Marketing),
            _ => Err(format!("Unknown department: {}", s)),
        }
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metrics scanned for anomalies
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    StaffHours,
    BudgetSpent,
    ResourceUtilization,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaffHours => "staff_hours",
            Self::BudgetSpent => "budget_spent",
            Self::ResourceUtilization => "resource_utilization",
        }
    }

    /// Scan order used by the detector
    pub fn all() -> &'static [MetricName] {
        &[
            Self::StaffHours,
            Self::BudgetSpent,
            Self::ResourceUtilization,
        ]
    }

    /// Read this metric from a record
    pub fn value_of(&self, record: &MetricRecord) -> f64 {
        match self {
            Self::StaffHours => record.staff_hours,
            Self::BudgetSpent => record.budget_spent,
            Self::ResourceUtilization => record.resource_utilization,
        }
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One department's operational metrics for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub date: NaiveDate,
    pub department: Department,
    pub staff_hours: f64,
    pub budget_spent: f64,
    /// Percentage in [0, 100]
    pub resource_utilization: f64,
    pub productivity_score: f64,
}

/// A record flagged as a statistical outlier for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub department: Department,
    pub date: NaiveDate,
    pub metric_name: MetricName,
    pub observed_value: f64,
    /// Absolute z-score of the observation
    pub z_score: f64,
    /// Mean of the department/metric series
    pub mean: f64,
    /// Sample standard deviation of the department/metric series
    pub std_dev: f64,
}

/// A single forecast point (historical fit or future prediction)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// True for points past the last observed date (no ground truth)
    pub is_forecast: bool,
}

/// Fitted and extrapolated utilization for one department
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub department: Department,
    pub points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    /// Points beyond the last observed date
    pub fn horizon(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.is_forecast)
    }

    /// Points aligned with observed history
    pub fn history(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| !p.is_forecast)
    }
}

/// Structured recommendations returned by the reasoning service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub identified_inefficiencies: Vec<String>,
    pub optimization_suggestions: Vec<String>,
    /// Percentage in [0, 100]
    pub potential_savings_percent: f64,
    /// Between one and three actions, most important first
    pub priority_actions: Vec<String>,
}

/// Per-department rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentMetrics {
    pub avg_utilization: f64,
    pub total_budget: f64,
    pub avg_productivity: f64,
    pub avg_staff_hours: f64,
    pub record_count: usize,
}

/// Aggregate statistics over the whole table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub avg_utilization: f64,
    pub total_budget: f64,
    /// Pearson correlation; None when either series has zero variance
    pub utilization_productivity_correlation: Option<f64>,
    pub record_count: usize,
    pub department_metrics: BTreeMap<Department, DepartmentMetrics>,
}

/// Condensed view of one department's forecast for the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub department: Department,
    pub horizon_days: usize,
    pub last_observed_date: NaiveDate,
    pub horizon_end_date: NaiveDate,
    /// Mean predicted utilization across the horizon
    pub horizon_mean_prediction: f64,
    pub horizon_end_prediction: f64,
    pub horizon_end_lower: f64,
    pub horizon_end_upper: f64,
}

/// The efficiency report produced by one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metrics_summary: MetricsSummary,
    pub recommendations: RecommendationSet,
    pub anomaly_count: usize,
    pub forecasts: Vec<ForecastSummary>,
    /// Departments whose forecast could not be fit, with the reason
    pub forecast_failures: BTreeMap<Department, String>,
    /// Heuristic estimate, see `report::potential_annual_savings`
    pub potential_annual_savings: f64,
    pub analysis_date: DateTime<Utc>,
    /// SHA-256 of the analyzed table
    pub dataset_fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_parse() {
        assert_eq!("it".parse::<Department>().unwrap(), Department::It);
        assert_eq!(" Sales ".parse::<Department>().unwrap(), Department::Sales);
        assert_eq!("HR".parse::<Department>().unwrap(), Department::Hr);
        assert!("Legal".parse::<Department>().is_err());
    }

    #[test]
    fn test_department_serde_names() {
        let json = serde_json::to_string(&Department::It).unwrap();
        assert_eq!(json, "\"IT\"");
        let parsed: Department = serde_json::from_str("\"Marketing\"").unwrap();
        assert_eq!(parsed, Department::Marketing);
    }

    #[test]
    fn test_department_ordering() {
        let mut depts = vec![Department::Marketing, Department::It, Department::Hr];
        depts.sort();
        assert_eq!(
            depts,
            vec![Department::It, Department::Hr, Department::Marketing]
        );
    }

    #[test]
    fn test_metric_value_of() {
        let record = MetricRecord {
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            department: Department::It,
            staff_hours: 80.0,
            budget_spent: 10_000.0,
            resource_utilization: 75.0,
            productivity_score: 85.0,
        };
        assert_eq!(MetricName::StaffHours.value_of(&record), 80.0);
        assert_eq!(MetricName::BudgetSpent.value_of(&record), 10_000.0);
        assert_eq!(MetricName::ResourceUtilization.value_of(&record), 75.0);
        assert_eq!(MetricName::BudgetSpent.to_string(), "budget_spent");
    }
}
