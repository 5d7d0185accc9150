//! Efficio Core Library
//!
//! Operational efficiency analysis over daily department metrics:
//! - Validated in-memory metrics table with CSV load/save
//! - Z-score anomaly detection per department and metric
//! - Utilization forecasting (trend + yearly + weekly seasonality)
//! - Recommendation synthesis through a pluggable reasoning service
//! - Report assembly with a savings estimate
//! - Seeded sample data and chart/report export

pub mod ai;
pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod forecast;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod sample;
pub mod stats;
pub mod synthesize;
pub mod table;

/// Test utilities including a mock reasoning server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, BackendKind, CompletionRequest, MockBackend, MockReply, OllamaBackend,
    OpenAICompatibleBackend,
};
pub use config::{AnalyzerConfig, ConfigSource, PipelineConfig, RecommendationConfig};
pub use detect::{AnomalyDetector, DetectionConfig};
pub use error::{Error, Result};
pub use export::export_analysis;
pub use forecast::{ForecastConfig, ForecastMap, UtilizationForecaster};
pub use models::{
    AnomalyRecord, Department, DepartmentMetrics, ForecastPoint, ForecastSeries, ForecastSummary,
    MetricName, MetricRecord, MetricsSummary, RecommendationSet, Report,
};
pub use pipeline::{Analysis, EfficiencyAnalyzer};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use report::{compute_summary, format_currency, potential_annual_savings, ReportBuilder};
pub use sample::SampleConfig;
pub use synthesize::RecommendationSynthesizer;
pub use table::{BudgetTrendPoint, MetricsTable, UtilizationDistribution};
