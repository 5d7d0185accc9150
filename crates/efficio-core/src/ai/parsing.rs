//! JSON parsing helpers for reasoning-service responses
//!
//! Models often wrap the JSON payload in prose or code fences. The object is
//! located first, then decoded into a loosely typed raw struct and validated
//! into a [`RecommendationSet`]. Nothing is defaulted: a missing or invalid
//! field is a schema error.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::RecommendationSet;

/// Longest raw snippet echoed back in error messages
const RAW_SNIPPET_LEN: usize = 200;

/// Locate the outermost JSON object in a response
pub fn extract_json_object(response: &str) -> Result<&str> {
    let response = response.trim();
    let start = response.find('{');
    let end = response.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => Ok(&response[s..=e]),
        _ => Err(Error::SynthesisSchema(format!(
            "No JSON object found in response | Raw: {}",
            truncate(response)
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    identified_inefficiencies: Option<Vec<String>>,
    optimization_suggestions: Option<Vec<String>>,
    #[serde(alias = "potential_savings")]
    potential_savings_percent: Option<Value>,
    priority_actions: Option<Vec<String>>,
}

/// Decode and validate a recommendation response
///
/// `max_priority_actions` bounds the action list; longer lists are truncated.
pub fn parse_recommendation(
    response: &str,
    max_priority_actions: usize,
) -> Result<RecommendationSet> {
    let json_str = extract_json_object(response)?;
    let raw: RawRecommendation = serde_json::from_str(json_str).map_err(|e| {
        Error::SynthesisSchema(format!(
            "Invalid recommendation JSON: {} | Raw: {}",
            e,
            truncate(json_str)
        ))
    })?;

    let identified_inefficiencies =
        non_blank(require(raw.identified_inefficiencies, "identified_inefficiencies")?);
    let optimization_suggestions =
        non_blank(require(raw.optimization_suggestions, "optimization_suggestions")?);
    let potential_savings_percent =
        parse_percent(&require(raw.potential_savings_percent, "potential_savings_percent")?)?;

    let mut priority_actions = non_blank(require(raw.priority_actions, "priority_actions")?);
    if priority_actions.is_empty() {
        return Err(Error::SynthesisSchema(
            "priority_actions must contain at least one action".into(),
        ));
    }
    if priority_actions.len() > max_priority_actions {
        warn!(
            received = priority_actions.len(),
            kept = max_priority_actions,
            "Truncating priority actions"
        );
        priority_actions.truncate(max_priority_actions);
    } else if priority_actions.len() < max_priority_actions {
        warn!(
            received = priority_actions.len(),
            expected = max_priority_actions,
            "Fewer priority actions than requested"
        );
    }

    Ok(RecommendationSet {
        identified_inefficiencies,
        optimization_suggestions,
        potential_savings_percent,
        priority_actions,
    })
}

fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| Error::SynthesisSchema(format!("Missing field: {}", field)))
}

fn non_blank(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Accept `12.5`, `"12.5"` or `"12.5%"`; the result must lie in [0, 100]
fn parse_percent(value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .ok(),
        _ => None,
    };

    match parsed {
        Some(p) if p.is_finite() && (0.0..=100.0).contains(&p) => Ok(p),
        Some(p) => Err(Error::SynthesisSchema(format!(
            "potential_savings_percent out of range [0, 100]: {}",
            p
        ))),
        None => Err(Error::SynthesisSchema(format!(
            "potential_savings_percent is not a number: {}",
            value
        ))),
    }
}

fn truncate(s: &str) -> String {
    if s.len() > RAW_SNIPPET_LEN {
        let mut cut = RAW_SNIPPET_LEN;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &s[..cut])
    } else {
        s.to_string()
    }
}
