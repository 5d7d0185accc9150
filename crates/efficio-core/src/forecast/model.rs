//! Additive trend + seasonality regression model
//!
//! y(d) = trend(d) + yearly(d) + weekly(d)
//!
//! - trend: piecewise-linear in scaled time with changepoints spread over the
//!   early part of the history; slope changes are ridge-penalized
//! - yearly / weekly: Fourier series with periods 365.25 and 7 days
//!
//! Time is measured in days since the first observation.

use std::f64::consts::PI;

use super::linalg::ridge_solve;
use super::ForecastConfig;

const YEARLY_PERIOD: f64 = 365.25;
const WEEKLY_PERIOD: f64 = 7.0;
/// Keeps the unpenalized trend columns well conditioned
const BASE_PENALTY: f64 = 1e-9;

/// A fitted additive model
#[derive(Debug, Clone)]
pub(crate) struct AdditiveModel {
    span_days: f64,
    changepoints: Vec<f64>,
    yearly_order: usize,
    weekly_order: usize,
    coefficients: Vec<f64>,
    y_scale: f64,
    /// Residual RMS in original units
    pub sigma: f64,
}

impl AdditiveModel {
    /// Fit the model to observations at day offsets `days` (ascending, first = 0)
    pub fn fit(days: &[f64], y: &[f64], config: &ForecastConfig) -> Result<Self, String> {
        let n = days.len();
        if n != y.len() {
            return Err("Mismatched series lengths".into());
        }
        if n < config.min_observations.max(2) {
            return Err(format!(
                "Need at least {} observations, got {}",
                config.min_observations.max(2),
                n
            ));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err("Series contains non-finite values".into());
        }

        let span_days = days[n - 1] - days[0];
        if span_days <= 0.0 {
            return Err("Series spans a single day".into());
        }

        let yearly_order = if span_days + 1.0 >= config.yearly_min_span_days as f64 {
            config.yearly_order
        } else {
            tracing::debug!(
                span_days,
                "History shorter than the yearly threshold, fitting without yearly seasonality"
            );
            0
        };

        let y_scale = y.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let scaled: Vec<f64> = y.iter().map(|v| v / y_scale).collect();

        let mut model = Self {
            span_days,
            changepoints: place_changepoints(days, span_days, config),
            yearly_order,
            weekly_order: config.weekly_order,
            coefficients: Vec::new(),
            y_scale,
            sigma: 0.0,
        };

        let rows: Vec<Vec<f64>> = days.iter().map(|&d| model.features(d)).collect();
        let penalty = model.penalty(config);

        let coefficients = ridge_solve(&rows, &scaled, &penalty)
            .ok_or_else(|| "Design matrix is singular".to_string())?;
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err("Fit produced non-finite coefficients".into());
        }
        model.coefficients = coefficients;

        let ss: f64 = days
            .iter()
            .zip(y)
            .map(|(&d, &obs)| (obs - model.predict(d)).powi(2))
            .sum();
        model.sigma = (ss / n as f64).sqrt();

        Ok(model)
    }

    /// Point prediction in original units
    pub fn predict(&self, day: f64) -> f64 {
        let features = self.features(day);
        let scaled: f64 = features
            .iter()
            .zip(&self.coefficients)
            .map(|(x, c)| x * c)
            .sum();
        scaled * self.y_scale
    }

    fn n_features(&self) -> usize {
        2 + self.changepoints.len() + 2 * self.yearly_order + 2 * self.weekly_order
    }

    fn features(&self, day: f64) -> Vec<f64> {
        let t = day / self.span_days;
        let mut x = Vec::with_capacity(self.n_features());

        x.push(1.0);
        x.push(t);
        for &s in &self.changepoints {
            x.push((t - s).max(0.0));
        }
        push_fourier(&mut x, day, YEARLY_PERIOD, self.yearly_order);
        push_fourier(&mut x, day, WEEKLY_PERIOD, self.weekly_order);

        x
    }

    fn penalty(&self, config: &ForecastConfig) -> Vec<f64> {
        let mut p = Vec::with_capacity(self.n_features());
        p.push(BASE_PENALTY);
        p.push(BASE_PENALTY);
        p.extend(
            std::iter::repeat(config.changepoint_penalty + BASE_PENALTY)
                .take(self.changepoints.len()),
        );
        p.extend(
            std::iter::repeat(config.seasonality_penalty + BASE_PENALTY)
                .take(2 * (self.yearly_order + self.weekly_order)),
        );
        p
    }
}

/// Changepoints at evenly spaced observations within the first
/// `changepoint_range` share of the history, in scaled time
fn place_changepoints(days: &[f64], span_days: f64, config: &ForecastConfig) -> Vec<f64> {
    let cutoff = ((days.len() as f64) * config.changepoint_range.clamp(0.0, 1.0)).floor() as usize;
    if cutoff < 2 {
        return Vec::new();
    }
    let count = config.n_changepoints.min(cutoff - 1);
    if count == 0 {
        return Vec::new();
    }

    let step = (cutoff - 1) as f64 / count as f64;
    let mut points: Vec<f64> = (1..=count)
        .map(|i| {
            let idx = ((i as f64) * step).round() as usize;
            days[idx.min(cutoff - 1)] / span_days
        })
        .collect();
    points.dedup();
    points
}

fn push_fourier(x: &mut Vec<f64>, day: f64, period: f64, order: usize) {
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * day / period;
        x.push(angle.sin());
        x.push(angle.cos());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ForecastConfig {
        ForecastConfig::default()
    }

    #[test]
    fn test_recovers_linear_trend() {
        let days: Vec<f64> = (0..60).map(|d| d as f64).collect();
        let y: Vec<f64> = days.iter().map(|d| 40.0 + 0.25 * d).collect();

        let model = AdditiveModel::fit(&days, &y, &config()).unwrap();
        assert!(model.sigma < 0.05, "sigma {}", model.sigma);
        assert!((model.predict(30.0) - 47.5).abs() < 0.1);
        // Extrapolates the final slope
        assert!((model.predict(70.0) - 57.5).abs() < 0.5);
    }

    #[test]
    fn test_captures_weekly_pattern() {
        let days: Vec<f64> = (0..84).map(|d| d as f64).collect();
        let y: Vec<f64> = days
            .iter()
            .map(|&d| if (d as i64) % 7 >= 5 { 50.0 } else { 80.0 })
            .collect();

        let model = AdditiveModel::fit(&days, &y, &config()).unwrap();
        // Next week's weekend should be predicted well below the weekdays
        let weekday = model.predict(85.0);
        let weekend = model.predict(89.0);
        assert!(weekday - weekend > 20.0, "weekday {} weekend {}", weekday, weekend);
    }

    #[test]
    fn test_constant_series_fits_exactly() {
        let days: Vec<f64> = (0..30).map(|d| d as f64).collect();
        let y = vec![75.0; 30];

        let model = AdditiveModel::fit(&days, &y, &config()).unwrap();
        assert!(model.sigma < 1e-6);
        assert!((model.predict(40.0) - 75.0).abs() < 1e-3);
    }

    #[test]
    fn test_too_short() {
        let days: Vec<f64> = (0..5).map(|d| d as f64).collect();
        let y = vec![1.0; 5];
        let err = AdditiveModel::fit(&days, &y, &config()).unwrap_err();
        assert!(err.contains("at least"));
    }

    #[test]
    fn test_yearly_dropped_for_short_history() {
        let days: Vec<f64> = (0..100).map(|d| d as f64).collect();
        let y: Vec<f64> = days.iter().map(|d| 50.0 + (d * 0.1).sin()).collect();
        let model = AdditiveModel::fit(&days, &y, &config()).unwrap();
        assert_eq!(model.yearly_order, 0);

        let days: Vec<f64> = (0..365).map(|d| d as f64).collect();
        let y: Vec<f64> = days.iter().map(|d| 50.0 + (d * 0.1).sin()).collect();
        let model = AdditiveModel::fit(&days, &y, &config()).unwrap();
        assert_eq!(model.yearly_order, config().yearly_order);
    }

    #[test]
    fn test_changepoints_within_range() {
        let days: Vec<f64> = (0..100).map(|d| d as f64).collect();
        let cps = place_changepoints(&days, 99.0, &config());
        assert_eq!(cps.len(), 25);
        assert!(cps.iter().all(|&c| c > 0.0 && c <= 0.8));
        assert!(cps.windows(2).all(|w| w[0] < w[1]));
    }
}
