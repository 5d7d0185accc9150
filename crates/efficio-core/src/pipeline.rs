//! End-to-end analysis pipeline
//!
//! One `analyze` call runs the whole request:
//! 1. Summary statistics (fails fast on an empty table)
//! 2. Anomaly detection and one forecast per department, fanned out on the
//!    blocking pool and merged into department-ordered maps
//! 3. Recommendation synthesis (timeout + bounded retry)
//! 4. Report assembly
//!
//! A synthesis failure aborts the run: no partial report is returned.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::ai::AIClient;
use crate::config::AnalyzerConfig;
use crate::detect::AnomalyDetector;
use crate::error::Result;
use crate::forecast::{ForecastMap, UtilizationForecaster};
use crate::models::{AnomalyRecord, Department, ForecastSeries, Report};
use crate::report::{compute_summary, ReportBuilder};
use crate::synthesize::RecommendationSynthesizer;
use crate::table::MetricsTable;

/// Everything one analysis run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub report: Report,
    /// Flagged records, grouped by department, metric, then date
    pub anomalies: Vec<AnomalyRecord>,
    pub forecasts: ForecastMap,
}

/// Output of one fan-out task
enum TaskOutput {
    Anomalies(Vec<AnomalyRecord>),
    Forecast(Department, Result<ForecastSeries>),
}

/// Orchestrates detection, forecasting, synthesis and reporting
#[derive(Clone)]
pub struct EfficiencyAnalyzer {
    detector: AnomalyDetector,
    forecaster: UtilizationForecaster,
    synthesizer: RecommendationSynthesizer,
    report_builder: ReportBuilder,
    parallel: bool,
}

impl EfficiencyAnalyzer {
    /// Create an analyzer from configuration and an explicit reasoning client
    pub fn new(config: &AnalyzerConfig, client: AIClient) -> Self {
        Self {
            detector: AnomalyDetector::with_config(config.detection.clone()),
            forecaster: UtilizationForecaster::with_config(config.forecast.clone()),
            synthesizer: RecommendationSynthesizer::new(client, config.recommendation.clone()),
            report_builder: ReportBuilder::new(),
            parallel: config.pipeline.parallel,
        }
    }

    /// Create an analyzer whose client is selected by the configuration
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(config, AIClient::from_config(&config.recommendation))
    }

    pub fn with_synthesizer(mut self, synthesizer: RecommendationSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_report_builder(mut self, report_builder: ReportBuilder) -> Self {
        self.report_builder = report_builder;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    pub fn forecaster(&self) -> &UtilizationForecaster {
        &self.forecaster
    }

    /// Run the full analysis over a table
    pub async fn analyze(&self, table: impl Into<Arc<MetricsTable>>) -> Result<Analysis> {
        let table: Arc<MetricsTable> = table.into();
        let summary = compute_summary(&table)?;

        let (anomalies, forecasts) = if self.parallel {
            self.run_parallel(Arc::clone(&table)).await?
        } else {
            self.run_sequential(&table)
        };

        for (dept, reason) in &forecasts.failures {
            warn!(department = %dept, reason = %reason, "No forecast for department");
        }

        let recommendation = self.synthesizer.synthesize(&summary).await?;
        let report = self.report_builder.build_with_forecasts(
            &table,
            &anomalies,
            recommendation,
            &forecasts,
        )?;

        info!(
            records = table.len(),
            anomalies = report.anomaly_count,
            forecasts = forecasts.series.len(),
            forecast_failures = forecasts.failures.len(),
            "Analysis complete"
        );

        Ok(Analysis {
            report,
            anomalies,
            forecasts,
        })
    }

    fn run_sequential(&self, table: &MetricsTable) -> (Vec<AnomalyRecord>, ForecastMap) {
        debug!("Running statistics sequentially");
        (self.detector.detect(table), self.forecaster.forecast(table))
    }

    async fn run_parallel(
        &self,
        table: Arc<MetricsTable>,
    ) -> Result<(Vec<AnomalyRecord>, ForecastMap)> {
        let departments = table.departments();
        debug!(tasks = departments.len() + 1, "Fanning out statistics tasks");

        let mut tasks = JoinSet::new();

        let detector = self.detector.clone();
        let shared = Arc::clone(&table);
        tasks.spawn_blocking(move || TaskOutput::Anomalies(detector.detect(&shared)));

        for dept in departments {
            let forecaster = self.forecaster.clone();
            let shared = Arc::clone(&table);
            tasks.spawn_blocking(move || {
                TaskOutput::Forecast(dept, forecaster.forecast_department(&shared, dept))
            });
        }

        let mut anomalies = Vec::new();
        let mut forecasts = ForecastMap::default();
        while let Some(joined) = tasks.join_next().await {
            match joined? {
                TaskOutput::Anomalies(found) => anomalies = found,
                TaskOutput::Forecast(dept, result) => forecasts.insert_result(dept, result),
            }
        }

        Ok((anomalies, forecasts))
    }
}
