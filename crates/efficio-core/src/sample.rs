//! Synthetic metrics generator
//!
//! Produces daily records for every department with normally distributed
//! noise around realistic baselines plus one sinusoidal seasonal cycle over
//! the span. Seeded, so the same config always yields the same table.

use std::f64::consts::PI;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Department, MetricRecord};
use crate::table::MetricsTable;

/// Peak seasonal offset added to hours and utilization (x100 for budget)
const SEASONAL_AMPLITUDE: f64 = 10.0;

/// Generator settings
#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub start: NaiveDate,
    pub days: usize,
    pub seed: u64,
    pub departments: Vec<Department>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            // One calendar year: 2023-01-01 ..= 2023-12-31
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            days: 365,
            seed: 42,
            departments: Department::all().to_vec(),
        }
    }
}

/// Normal sampler using the Box-Muller transform
struct Gaussian {
    spare: Option<f64>,
}

impl Gaussian {
    fn new() -> Self {
        Self { spare: None }
    }

    fn sample<R: Rng>(&mut self, rng: &mut R, mean: f64, std_dev: f64) -> f64 {
        if let Some(z) = self.spare.take() {
            return mean + std_dev * z;
        }
        // u1 in (0, 1] keeps ln finite
        let u1 = 1.0 - rng.gen::<f64>();
        let u2 = rng.gen::<f64>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * PI * u2;
        self.spare = Some(radius * angle.sin());
        mean + std_dev * radius * angle.cos()
    }

    fn series<R: Rng>(&mut self, rng: &mut R, n: usize, mean: f64, std_dev: f64) -> Vec<f64> {
        (0..n).map(|_| self.sample(rng, mean, std_dev)).collect()
    }
}

/// Seasonal offset for day `i` of `n`: one full sine cycle from the first to the last day
fn seasonal_factor(i: usize, n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    (2.0 * PI * i as f64 / (n - 1) as f64).sin() * SEASONAL_AMPLITUDE
}

/// Generate a validated sample table
pub fn generate(config: &SampleConfig) -> Result<MetricsTable> {
    if config.days == 0 {
        return Err(Error::Config("Sample must cover at least one day".into()));
    }
    if config.departments.is_empty() {
        return Err(Error::Config("Sample needs at least one department".into()));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut gaussian = Gaussian::new();
    let n = config.days;
    let mut records = Vec::with_capacity(n * config.departments.len());

    for &department in &config.departments {
        let hours = gaussian.series(&mut rng, n, 80.0, 10.0);
        let budget = gaussian.series(&mut rng, n, 10_000.0, 1_000.0);
        let usage = gaussian.series(&mut rng, n, 75.0, 15.0);

        for i in 0..n {
            let seasonal = seasonal_factor(i, n);
            records.push(MetricRecord {
                date: config.start + Duration::days(i as i64),
                department,
                staff_hours: (hours[i] + seasonal).max(0.0),
                budget_spent: (budget[i] + seasonal * 100.0).max(0.0),
                resource_utilization: (usage[i] + seasonal).clamp(0.0, 100.0),
                productivity_score: gaussian.sample(&mut rng, 85.0, 5.0),
            });
        }
    }

    debug!(
        records = records.len(),
        seed = config.seed,
        start = %config.start,
        "Generated sample data"
    );
    MetricsTable::new(records)
}
