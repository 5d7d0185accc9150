//! Analyzer configuration
//!
//! Configuration is resolved in layers:
//! 1. Built-in defaults (`Default` impls)
//! 2. A TOML file: `--config <path>`, else the override at
//!    `~/.local/share/efficio/config/efficio.toml`, else the embedded
//!    `config/efficio.toml`
//! 3. Environment overrides for the reasoning service
//!
//! Only [`AnalyzerConfig::load`] reads the environment; everything else takes
//! an explicit config value.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::ai::BackendKind;
use crate::detect::DetectionConfig;
use crate::error::{Error, Result};
use crate::forecast::ForecastConfig;
use crate::models::MetricName;

/// Embedded default config
const DEFAULT_CONFIG: &str = include_str!("../../../config/efficio.toml");

/// Reasoning service and retry settings
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationConfig {
    pub backend: BackendKind,
    pub host: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Decoding temperature; None defers to the prompt's frontmatter
    pub temperature: Option<f32>,
    /// Upper bound for one service call
    pub timeout: Duration,
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Delay before retry n is `backoff_base * 2^n`
    pub backoff_base: Duration,
    pub max_priority_actions: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::OpenaiCompatible,
            host: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
            temperature: None,
            timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
            max_priority_actions: 3,
        }
    }
}

/// Orchestration settings
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Run detection and per-department forecasts on the blocking pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Embedded,
    File(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Embedded => write!(f, "embedded defaults"),
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Complete analyzer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub detection: DetectionConfig,
    pub forecast: ForecastConfig,
    pub recommendation: RecommendationConfig,
    pub pipeline: PipelineConfig,
    pub source: ConfigSource,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            forecast: ForecastConfig::default(),
            recommendation: RecommendationConfig::default(),
            pipeline: PipelineConfig::default(),
            source: ConfigSource::Embedded,
        }
    }
}

impl AnalyzerConfig {
    /// Load the effective configuration, including environment overrides
    ///
    /// An explicit `override_path` must exist. Without one, the default
    /// override location is used when present.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let (content, source) = match override_path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read config {}: {}", path.display(), e))
                })?;
                (content, ConfigSource::File(path.to_path_buf()))
            }
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    let content = fs::read_to_string(&path)
                        .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
                    (content, ConfigSource::File(path))
                }
                None => (DEFAULT_CONFIG.to_string(), ConfigSource::Embedded),
            },
        };

        let mut config = Self::from_toml_str(&content)?;
        config.source = source;
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML document over the built-in defaults (no environment)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = Self::default();
        raw.apply(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let rec = &mut self.recommendation;

        if let Some(backend) = get("EFFICIO_AI_BACKEND") {
            rec.backend = backend.parse()?;
        }
        if let Some(host) = get("EFFICIO_AI_HOST") {
            rec.host = host;
        }
        if let Some(model) = get("EFFICIO_AI_MODEL") {
            rec.model = model;
        }
        if let Some(key) = get("EFFICIO_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            rec.api_key = Some(key);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> Result<()> { Err(Error::Config(msg.to_string())) };

        let z = self.detection.z_threshold;
        if !z.is_finite() || z <= 0.0 {
            return invalid("detection.z_threshold must be a positive number");
        }
        if self.detection.metrics.is_empty() {
            return invalid("detection.metrics must name at least one metric");
        }

        let f = &self.forecast;
        if f.horizon_days == 0 {
            return invalid("forecast.horizon_days must be at least 1");
        }
        if !(f.interval_width > 0.0 && f.interval_width < 1.0) {
            return invalid("forecast.interval_width must be in (0, 1)");
        }
        if !(0.0..=1.0).contains(&f.changepoint_range) {
            return invalid("forecast.changepoint_range must be in [0, 1]");
        }
        if f.changepoint_penalty < 0.0 || f.seasonality_penalty < 0.0 {
            return invalid("forecast penalties must be non-negative");
        }

        let r = &self.recommendation;
        if r.max_priority_actions == 0 {
            return invalid("recommendation.max_priority_actions must be at least 1");
        }
        if r.timeout.is_zero() {
            return invalid("recommendation.timeout_secs must be at least 1");
        }
        if let Some(t) = r.temperature {
            if !(0.0..=2.0).contains(&t) {
                return invalid("recommendation.temperature must be in [0, 2]");
            }
        }
        Ok(())
    }
}

impl fmt::Display for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metrics: Vec<&str> = self.detection.metrics.iter().map(MetricName::as_str).collect();
        let r = &self.recommendation;

        writeln!(f, "Source: {}", self.source)?;
        writeln!(f)?;
        writeln!(f, "[detection]")?;
        writeln!(f, "  z_threshold        {}", self.detection.z_threshold)?;
        writeln!(f, "  metrics            {}", metrics.join(", "))?;
        writeln!(f)?;
        writeln!(f, "[forecast]")?;
        writeln!(f, "  horizon_days       {}", self.forecast.horizon_days)?;
        writeln!(
            f,
            "  seasonality        yearly order {}, weekly order {}",
            self.forecast.yearly_order, self.forecast.weekly_order
        )?;
        writeln!(f, "  changepoints       {}", self.forecast.n_changepoints)?;
        writeln!(f, "  interval_width     {}", self.forecast.interval_width)?;
        writeln!(f)?;
        writeln!(f, "[recommendation]")?;
        writeln!(f, "  backend            {}", r.backend)?;
        writeln!(f, "  host               {}", r.host)?;
        writeln!(f, "  model              {}", r.model)?;
        writeln!(
            f,
            "  api_key            {}",
            r.api_key.as_deref().map(mask_secret).unwrap_or_else(|| "(not set)".into())
        )?;
        match r.temperature {
            Some(t) => writeln!(f, "  temperature        {}", t)?,
            None => writeln!(f, "  temperature        (from prompt)")?,
        }
        writeln!(f, "  timeout            {}s", r.timeout.as_secs())?;
        writeln!(f, "  max_retries        {}", r.max_retries)?;
        writeln!(f, "  backoff_base       {}ms", r.backoff_base.as_millis())?;
        writeln!(f)?;
        writeln!(f, "[pipeline]")?;
        write!(f, "  parallel           {}", self.pipeline.parallel)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("efficio").join("config").join("efficio.toml"))
}

/// Show only the last four characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    detection: Option<RawDetection>,
    forecast: Option<RawForecast>,
    recommendation: Option<RawRecommendation>,
    pipeline: Option<RawPipeline>,
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    z_threshold: Option<f64>,
    metrics: Option<Vec<MetricName>>,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    horizon_days: Option<usize>,
    yearly_order: Option<usize>,
    weekly_order: Option<usize>,
    n_changepoints: Option<usize>,
    changepoint_range: Option<f64>,
    changepoint_penalty: Option<f64>,
    seasonality_penalty: Option<f64>,
    interval_width: Option<f64>,
    min_observations: Option<usize>,
    yearly_min_span_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    backend: Option<String>,
    host: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    backoff_base_ms: Option<u64>,
    max_priority_actions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawPipeline {
    parallel: Option<bool>,
}

impl RawConfig {
    fn apply(self, config: &mut AnalyzerConfig) -> Result<()> {
        if let Some(d) = self.detection {
            let target = &mut config.detection;
            if let Some(z) = d.z_threshold {
                target.z_threshold = z;
            }
            if let Some(metrics) = d.metrics {
                target.metrics = metrics;
            }
        }

        if let Some(fc) = self.forecast {
            let target = &mut config.forecast;
            if let Some(v) = fc.horizon_days {
                target.horizon_days = v;
            }
            if let Some(v) = fc.yearly_order {
                target.yearly_order = v;
            }
            if let Some(v) = fc.weekly_order {
                target.weekly_order = v;
            }
            if let Some(v) = fc.n_changepoints {
                target.n_changepoints = v;
            }
            if let Some(v) = fc.changepoint_range {
                target.changepoint_range = v;
            }
            if let Some(v) = fc.changepoint_penalty {
                target.changepoint_penalty = v;
            }
            if let Some(v) = fc.seasonality_penalty {
                target.seasonality_penalty = v;
            }
            if let Some(v) = fc.interval_width {
                target.interval_width = v;
            }
            if let Some(v) = fc.min_observations {
                target.min_observations = v;
            }
            if let Some(v) = fc.yearly_min_span_days {
                target.yearly_min_span_days = v;
            }
        }

        if let Some(r) = self.recommendation {
            let target = &mut config.recommendation;
            if let Some(backend) = r.backend {
                target.backend = backend.parse()?;
            }
            if let Some(host) = r.host {
                target.host = host;
            }
            if let Some(model) = r.model {
                target.model = model;
            }
            if let Some(key) = r.api_key.filter(|k| !k.trim().is_empty()) {
                target.api_key = Some(key);
            }
            if let Some(t) = r.temperature {
                target.temperature = Some(t);
            }
            if let Some(secs) = r.timeout_secs {
                target.timeout = Duration::from_secs(secs);
            }
            if let Some(retries) = r.max_retries {
                target.max_retries = retries;
            }
            if let Some(ms) = r.backoff_base_ms {
                target.backoff_base = Duration::from_millis(ms);
            }
            if let Some(n) = r.max_priority_actions {
                target.max_priority_actions = n;
            }
        }

        if let Some(p) = self.pipeline {
            if let Some(parallel) = p.parallel {
                config.pipeline.parallel = parallel;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_default_config() {
        let config = AnalyzerConfig::from_toml_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.detection, DetectionConfig::default());
        assert_eq!(config.forecast, ForecastConfig::default());
        assert_eq!(config.recommendation.backend, BackendKind::OpenaiCompatible);
        assert_eq!(config.recommendation.model, "gpt-3.5-turbo");
        assert_eq!(config.recommendation.temperature, Some(0.3));
        assert_eq!(config.recommendation.timeout, Duration::from_secs(30));
        assert_eq!(config.recommendation.max_retries, 2);
        assert_eq!(config.recommendation.max_priority_actions, 3);
        assert!(config.pipeline.parallel);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = AnalyzerConfig::from_toml_str(
            r#"
            [detection]
            z_threshold = 3.0

            [recommendation]
            backend = "ollama"
            host = "http://localhost:11434"

            [pipeline]
            parallel = false
            "#,
        )
        .unwrap();

        assert_eq!(config.detection.z_threshold, 3.0);
        assert_eq!(config.detection.metrics, MetricName::all().to_vec());
        assert_eq!(config.forecast.horizon_days, 90);
        assert_eq!(config.recommendation.backend, BackendKind::Ollama);
        assert_eq!(config.recommendation.model, "gpt-3.5-turbo");
        assert_eq!(config.recommendation.temperature, None);
        assert!(!config.pipeline.parallel);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for doc in [
            "[detection]\nz_threshold = -1.0",
            "[detection]\nmetrics = []",
            "[detection]\nmetrics = [\"revenue\"]",
            "[forecast]\nhorizon_days = 0",
            "[forecast]\ninterval_width = 1.5",
            "[recommendation]\nbackend = \"carrier-pigeon\"",
            "[recommendation]\nmax_priority_actions = 0",
            "[recommendation]\ntimeout_secs = 0",
            "not toml at all [",
        ] {
            assert!(
                matches!(AnalyzerConfig::from_toml_str(doc), Err(Error::Config(_))),
                "accepted: {}",
                doc
            );
        }
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("EFFICIO_AI_BACKEND", "mock"),
            ("EFFICIO_AI_MODEL", "gpt-4o-mini"),
            ("OPENAI_API_KEY", "sk-fallback-0000"),
        ]
        .into_iter()
        .collect();

        let mut config = AnalyzerConfig::default();
        config
            .apply_env_with(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.recommendation.backend, BackendKind::Mock);
        assert_eq!(config.recommendation.model, "gpt-4o-mini");
        assert_eq!(config.recommendation.host, "https://api.openai.com");
        assert_eq!(
            config.recommendation.api_key.as_deref(),
            Some("sk-fallback-0000")
        );

        // EFFICIO_API_KEY wins over OPENAI_API_KEY
        let mut config = AnalyzerConfig::default();
        config
            .apply_env_with(|k| match k {
                "EFFICIO_API_KEY" => Some("sk-primary".into()),
                "OPENAI_API_KEY" => Some("sk-fallback".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.recommendation.api_key.as_deref(), Some("sk-primary"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("efficio.toml");
        std::fs::write(&path, "[forecast]\nhorizon_days = 30\n").unwrap();

        let config = AnalyzerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.forecast.horizon_days, 30);
        assert_eq!(config.source, ConfigSource::File(path));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            AnalyzerConfig::load(Some(&missing)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_display_masks_api_key() {
        let mut config = AnalyzerConfig::default();
        config.recommendation.api_key = Some("sk-abcdefghijklmnop".into());
        let shown = config.to_string();
        assert!(shown.contains("****mnop"));
        assert!(!shown.contains("sk-abcdefghijklmnop"));
        assert!(shown.contains("embedded defaults"));
    }

    #[test]
    fn test_mask_secret_short() {
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("0123456789"), "****6789");
    }
}
