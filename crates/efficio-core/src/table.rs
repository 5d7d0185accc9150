//! In-memory metrics table
//!
//! The table is the single source of truth for an analysis run. It is validated
//! once on construction and never mutated afterwards:
//! - one record per (department, date)
//! - staff hours and budget are finite and non-negative
//! - utilization is finite and within [0, 100]
//! - records are ordered by date, then department

use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Department, MetricName, MetricRecord};
use crate::stats;

/// CSV column order for metrics files
pub const CSV_HEADERS: [&str; 6] = [
    "date",
    "department",
    "staff_hours",
    "budget_spent",
    "resource_utilization",
    "productivity_score",
];

/// Validated, immutable table of daily department metrics
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    records: Vec<MetricRecord>,
}

/// Distribution of utilization values for one department (box plot data)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationDistribution {
    pub department: Department,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    /// Raw values in date order
    pub values: Vec<f64>,
}

/// Total budget spent across departments on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetTrendPoint {
    pub date: NaiveDate,
    pub budget_spent: f64,
}

impl MetricsTable {
    /// Validate records and build a table ordered by (date, department)
    pub fn new(mut records: Vec<MetricRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            validate_record(record)?;
            if !seen.insert((record.department, record.date)) {
                return Err(Error::DataIntegrity(format!(
                    "Duplicate record for {} on {}",
                    record.department, record.date
                )));
            }
        }

        records.sort_by(|a, b| a.date.cmp(&b.date).then(a.department.cmp(&b.department)));
        debug!(records = records.len(), "Built metrics table");

        Ok(Self { records })
    }

    /// Parse a metrics CSV with the columns in `CSV_HEADERS`
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let columns = ColumnIndex::from_headers(&headers)?;

        let mut records = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            // Header is line 1
            let line = i + 2;
            let row = result?;
            records.push(columns.parse_row(&row, line)?);
        }

        Self::new(records)
    }

    /// Load a metrics CSV from disk
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Write the table in the CSV layout accepted by `from_csv_reader`
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(CSV_HEADERS)?;
        for r in &self.records {
            wtr.write_record([
                r.date.format("%Y-%m-%d").to_string(),
                r.department.to_string(),
                r.staff_hours.to_string(),
                r.budget_spent.to_string(),
                r.resource_utilization.to_string(),
                r.productivity_score.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct departments present, in department order
    pub fn departments(&self) -> Vec<Department> {
        let mut depts: Vec<Department> = self.records.iter().map(|r| r.department).collect();
        depts.sort();
        depts.dedup();
        depts
    }

    /// Records for one department in date order
    pub fn department_records(&self, department: Department) -> Vec<&MetricRecord> {
        self.records
            .iter()
            .filter(|r| r.department == department)
            .collect()
    }

    /// Values of one metric for one department in date order
    pub fn metric_values(&self, department: Department, metric: MetricName) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.department == department)
            .map(|r| metric.value_of(r))
            .collect()
    }

    /// First and last date in the table
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }

    /// Utilization distribution per department (utilization-by-department chart)
    pub fn utilization_by_department(&self) -> Vec<UtilizationDistribution> {
        self.departments()
            .into_iter()
            .filter_map(|dept| {
                let values = self.metric_values(dept, MetricName::ResourceUtilization);
                let mut sorted = values.clone();
                sorted.sort_by(|a, b| a.total_cmp(b));

                Some(UtilizationDistribution {
                    department: dept,
                    count: values.len(),
                    min: *sorted.first()?,
                    q1: stats::quantile_sorted(&sorted, 0.25)?,
                    median: stats::quantile_sorted(&sorted, 0.5)?,
                    q3: stats::quantile_sorted(&sorted, 0.75)?,
                    max: *sorted.last()?,
                    mean: stats::mean(&values)?,
                    values,
                })
            })
            .collect()
    }

    /// Total budget per date across departments (budget-over-time chart)
    pub fn budget_trend(&self) -> Vec<BudgetTrendPoint> {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for r in &self.records {
            *by_date.entry(r.date).or_insert(0.0) += r.budget_spent;
        }
        by_date
            .into_iter()
            .map(|(date, budget_spent)| BudgetTrendPoint { date, budget_spent })
            .collect()
    }

    /// SHA-256 over the canonical record contents, hex encoded
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for r in &self.records {
            hasher.update(r.date.to_string().as_bytes());
            hasher.update(r.department.as_str().as_bytes());
            hasher.update(r.staff_hours.to_be_bytes());
            hasher.update(r.budget_spent.to_be_bytes());
            hasher.update(r.resource_utilization.to_be_bytes());
            hasher.update(r.productivity_score.to_be_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

fn validate_record(r: &MetricRecord) -> Result<()> {
    let at = || format!("{} on {}", r.department, r.date);

    if !r.staff_hours.is_finite() || r.staff_hours < 0.0 {
        return Err(Error::DataIntegrity(format!(
            "staff_hours must be a non-negative number ({}): {}",
            at(),
            r.staff_hours
        )));
    }
    if !r.budget_spent.is_finite() || r.budget_spent < 0.0 {
        return Err(Error::DataIntegrity(format!(
            "budget_spent must be a non-negative number ({}): {}",
            at(),
            r.budget_spent
        )));
    }
    if !r.resource_utilization.is_finite() || !(0.0..=100.0).contains(&r.resource_utilization) {
        return Err(Error::DataIntegrity(format!(
            "resource_utilization must be within [0, 100] ({}): {}",
            at(),
            r.resource_utilization
        )));
    }
    if !r.productivity_score.is_finite() {
        return Err(Error::DataIntegrity(format!(
            "productivity_score must be finite ({}): {}",
            at(),
            r.productivity_score
        )));
    }
    Ok(())
}

/// Positions of the required columns in a CSV header row
struct ColumnIndex {
    positions: [usize; 6],
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let mut positions = [0usize; 6];
        for (slot, name) in positions.iter_mut().zip(CSV_HEADERS) {
            *slot = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    Error::DataIntegrity(format!("Missing CSV column: {}", name))
                })?;
        }
        Ok(Self { positions })
    }

    fn field<'r>(&self, row: &'r StringRecord, col: usize, line: usize) -> Result<&'r str> {
        row.get(self.positions[col]).ok_or_else(|| {
            Error::DataIntegrity(format!("line {}: missing {}", line, CSV_HEADERS[col]))
        })
    }

    fn number(&self, row: &StringRecord, col: usize, line: usize) -> Result<f64> {
        let raw = self.field(row, col, line)?;
        raw.parse::<f64>().map_err(|_| {
            Error::DataIntegrity(format!(
                "line {}: invalid {}: {:?}",
                line, CSV_HEADERS[col], raw
            ))
        })
    }

    fn parse_row(&self, row: &StringRecord, line: usize) -> Result<MetricRecord> {
        let date_str = self.field(row, 0, line)?;
        let date = parse_date(date_str).ok_or_else(|| {
            Error::DataIntegrity(format!("line {}: invalid date: {:?}", line, date_str))
        })?;

        let department = self
            .field(row, 1, line)?
            .parse::<Department>()
            .map_err(|e| Error::DataIntegrity(format!("line {}: {}", line, e)))?;

        Ok(MetricRecord {
            date,
            department,
            staff_hours: self.number(row, 2, line)?,
            budget_spent: self.number(row, 3, line)?,
            resource_utilization: self.number(row, 4, line)?,
            productivity_score: self.number(row, 5, line)?,
        })
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time of day
fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}
