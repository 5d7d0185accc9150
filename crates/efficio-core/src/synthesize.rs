//! Recommendation synthesis
//!
//! Turns a [`MetricsSummary`] into a typed [`RecommendationSet`] by asking the
//! reasoning service for a JSON object. Each call is bounded by a timeout;
//! transport and schema failures are retried with exponential backoff, and the
//! last error is returned with its kind intact once attempts run out.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::ai::parsing::parse_recommendation;
use crate::ai::{AIBackend, AIClient, CompletionRequest};
use crate::config::RecommendationConfig;
use crate::error::{Error, Result};
use crate::models::{MetricsSummary, RecommendationSet};
use crate::prompts::{PromptId, PromptLibrary};
use crate::report::format_currency;

/// Used when neither the config nor the prompt sets a temperature
const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Delay before retry `retry` (0-based): `base * 2^retry`
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry))
}

/// Natural-language statistics block sent to the reasoning service
pub fn summary_text(summary: &MetricsSummary) -> String {
    let correlation = match summary.utilization_productivity_correlation {
        Some(r) => format!("{:.3}", r),
        None => "undefined (no variance)".to_string(),
    };

    let mut lines = vec![
        format!("Records analyzed: {}", summary.record_count),
        format!("Average resource utilization: {:.1}%", summary.avg_utilization),
        format!("Total budget spent: {}", format_currency(summary.total_budget)),
        format!("Utilization/productivity correlation: {}", correlation),
        "Department breakdown:".to_string(),
    ];
    for (dept, m) in &summary.department_metrics {
        lines.push(format!(
            "- {}: avg utilization {:.1}%, total budget {}, avg productivity {:.1}, \
             avg staff hours {:.1}, {} records",
            dept,
            m.avg_utilization,
            format_currency(m.total_budget),
            m.avg_productivity,
            m.avg_staff_hours,
            m.record_count
        ));
    }
    lines.join("\n")
}

/// Requests and validates recommendations from the reasoning service
#[derive(Clone)]
pub struct RecommendationSynthesizer {
    client: AIClient,
    config: RecommendationConfig,
    prompts: PromptLibrary,
}

impl RecommendationSynthesizer {
    /// Create with the default prompt library (override dir, then embedded)
    pub fn new(client: AIClient, config: RecommendationConfig) -> Self {
        Self {
            client,
            config,
            prompts: PromptLibrary::new(),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn client(&self) -> &AIClient {
        &self.client
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    /// Render the prompt for a summary
    pub fn build_request(&self, summary: &MetricsSummary) -> Result<CompletionRequest> {
        let prompt = self.prompts.get(PromptId::RecommendEfficiency)?;

        let summary = summary_text(summary);
        let max_actions = self.config.max_priority_actions.to_string();
        let mut vars = HashMap::new();
        vars.insert("summary", summary.as_str());
        vars.insert("max_priority_actions", max_actions.as_str());

        let temperature = self
            .config
            .temperature
            .or(prompt.metadata.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE);

        Ok(CompletionRequest::new(prompt.render_system(&vars), prompt.render_user(&vars))
            .with_temperature(temperature)
            .with_timeout(self.config.timeout))
    }

    /// Request recommendations, retrying retryable failures
    pub async fn synthesize(&self, summary: &MetricsSummary) -> Result<RecommendationSet> {
        let request = self.build_request(summary)?;
        let max_attempts = self.config.max_retries.saturating_add(1);

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            debug!(
                attempt,
                max_attempts,
                backend = %self.client.kind(),
                model = self.client.model(),
                "Requesting recommendations"
            );

            match self.attempt(&request).await {
                Ok(recommendation) => {
                    info!(
                        attempt,
                        actions = recommendation.priority_actions.len(),
                        savings_percent = recommendation.potential_savings_percent,
                        "Recommendations received"
                    );
                    return Ok(recommendation);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = backoff_delay(self.config.backoff_base, attempt - 1);
                    warn!(
                        attempt,
                        max_attempts,
                        kind = e.kind(),
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Recommendation attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(attempt, kind = e.kind(), error = %e, "Recommendation failed");
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<RecommendationSet> {
        let response = tokio::time::timeout(self.config.timeout, self.client.complete_json(request))
            .await
            .map_err(|_| {
                Error::SynthesisTransport(format!(
                    "No response within {:?} from {}",
                    self.config.timeout,
                    self.client.host()
                ))
            })??;

        parse_recommendation(&response, self.config.max_priority_actions)
    }
}
