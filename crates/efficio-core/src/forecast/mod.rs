//! Utilization forecasting
//!
//! Fits one additive time-series model per department on its historical
//! resource utilization and extrapolates a fixed horizon of daily points.
//!
//! Every produced series has `history_len + horizon_days` points with
//! non-decreasing dates and `lower_bound <= predicted_value <= upper_bound`.
//! Departments whose model cannot be fit are reported in
//! [`ForecastMap::failures`] without affecting the others.

mod linalg;
mod model;

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Department, ForecastPoint, ForecastSeries, ForecastSummary};
use crate::stats;
use crate::table::MetricsTable;

use model::AdditiveModel;

/// Utilization is a percentage; forecasts are kept inside this range
const UTILIZATION_RANGE: (f64, f64) = (0.0, 100.0);

/// Forecasting configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    /// Days to extrapolate past the last observation
    pub horizon_days: usize,
    /// Fourier order of the yearly component
    pub yearly_order: usize,
    /// Fourier order of the weekly component
    pub weekly_order: usize,
    /// Maximum number of trend changepoints
    pub n_changepoints: usize,
    /// Share of the history (from the start) eligible for changepoints
    pub changepoint_range: f64,
    /// Ridge penalty on trend slope changes
    pub changepoint_penalty: f64,
    /// Ridge penalty on seasonal Fourier coefficients
    pub seasonality_penalty: f64,
    /// Central coverage of the uncertainty interval (0.8 = 80%)
    pub interval_width: f64,
    /// Fewer observations than this is a fitting error (two weekly cycles)
    pub min_observations: usize,
    /// Yearly seasonality is only fit when the history spans this many days
    pub yearly_min_span_days: i64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: 90,
            yearly_order: 10,
            weekly_order: 3,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_penalty: 10.0,
            seasonality_penalty: 0.1,
            interval_width: 0.8,
            min_observations: 14,
            yearly_min_span_days: 365,
        }
    }
}

/// Per-department forecasts plus the departments that failed to fit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastMap {
    pub series: BTreeMap<Department, ForecastSeries>,
    pub failures: BTreeMap<Department, String>,
}

impl ForecastMap {
    /// Record the outcome of one department's fit
    pub fn insert_result(&mut self, department: Department, result: Result<ForecastSeries>) {
        match result {
            Ok(series) => {
                self.series.insert(department, series);
            }
            Err(Error::ForecastFitting { reason, .. }) => {
                self.failures.insert(department, reason);
            }
            Err(e) => {
                self.failures.insert(department, e.to_string());
            }
        }
    }

    pub fn get(&self, department: Department) -> Option<&ForecastSeries> {
        self.series.get(&department)
    }

    /// Failures as kinded errors
    pub fn errors(&self) -> Vec<Error> {
        self.failures
            .iter()
            .map(|(&department, reason)| Error::ForecastFitting {
                department,
                reason: reason.clone(),
            })
            .collect()
    }

    /// Horizon summaries for the report, in department order
    pub fn summaries(&self) -> Vec<ForecastSummary> {
        self.series.values().filter_map(summarize).collect()
    }
}

fn summarize(series: &ForecastSeries) -> Option<ForecastSummary> {
    let last_observed = series.history().last()?;
    let horizon: Vec<&ForecastPoint> = series.horizon().collect();
    let end = horizon.last()?;
    let predictions: Vec<f64> = horizon.iter().map(|p| p.predicted_value).collect();

    Some(ForecastSummary {
        department: series.department,
        horizon_days: horizon.len(),
        last_observed_date: last_observed.date,
        horizon_end_date: end.date,
        horizon_mean_prediction: stats::mean(&predictions)?,
        horizon_end_prediction: end.predicted_value,
        horizon_end_lower: end.lower_bound,
        horizon_end_upper: end.upper_bound,
    })
}

/// Fits and extrapolates utilization per department
#[derive(Debug, Clone, Default)]
pub struct UtilizationForecaster {
    config: ForecastConfig,
}

impl UtilizationForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// Create with the default model and a different horizon
    pub fn with_horizon(horizon_days: usize) -> Self {
        Self {
            config: ForecastConfig {
                horizon_days,
                ..Default::default()
            },
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast every department in the table
    pub fn forecast(&self, table: &MetricsTable) -> ForecastMap {
        let mut map = ForecastMap::default();
        for dept in table.departments() {
            map.insert_result(dept, self.forecast_department(table, dept));
        }
        map
    }

    /// Forecast a single department
    pub fn forecast_department(
        &self,
        table: &MetricsTable,
        department: Department,
    ) -> Result<ForecastSeries> {
        let fitting_error = |reason: String| Error::ForecastFitting { department, reason };

        let records = table.department_records(department);
        let (first, last) = match (records.first(), records.last()) {
            (Some(f), Some(l)) => (f.date, l.date),
            _ => return Err(fitting_error("No records".into())),
        };

        let days: Vec<f64> = records
            .iter()
            .map(|r| (r.date - first).num_days() as f64)
            .collect();
        let y: Vec<f64> = records.iter().map(|r| r.resource_utilization).collect();

        let model = AdditiveModel::fit(&days, &y, &self.config).map_err(|reason| {
            warn!(department = %department, reason = %reason, "Forecast fit failed");
            fitting_error(reason)
        })?;

        let z = stats::normal_interval_z(self.config.interval_width);
        let n_history = records.len() as f64;
        let mut points = Vec::with_capacity(records.len() + self.config.horizon_days);

        for (record, &day) in records.iter().zip(&days) {
            points.push(bounded_point(
                record.date,
                model.predict(day),
                z * model.sigma,
                false,
            ));
        }

        let last_day = days.last().copied().unwrap_or(0.0);
        for step in 1..=self.config.horizon_days {
            let widen = (1.0 + step as f64 / n_history).sqrt();
            points.push(bounded_point(
                last + Duration::days(step as i64),
                model.predict(last_day + step as f64),
                z * model.sigma * widen,
                true,
            ));
        }

        if points.iter().any(|p| !p.predicted_value.is_finite()) {
            return Err(fitting_error("Model produced non-finite predictions".into()));
        }

        debug!(
            department = %department,
            history = records.len(),
            horizon = self.config.horizon_days,
            sigma = model.sigma,
            "Forecast fitted"
        );

        Ok(ForecastSeries { department, points })
    }
}

/// Build a point whose bounds straddle the prediction, clamped into the utilization range
fn bounded_point(
    date: chrono::NaiveDate,
    predicted: f64,
    half_width: f64,
    is_forecast: bool,
) -> ForecastPoint {
    let (lo, hi) = UTILIZATION_RANGE;
    let half_width = half_width.max(0.0);
    ForecastPoint {
        date,
        predicted_value: predicted.clamp(lo, hi),
        lower_bound: (predicted - half_width).clamp(lo, hi),
        upper_bound: (predicted + half_width).clamp(lo, hi),
        is_forecast,
    }
}
