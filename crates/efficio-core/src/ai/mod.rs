//! Pluggable text-reasoning backend abstraction
//!
//! # Architecture
//!
//! - `AIBackend` trait: one JSON completion per call plus a health probe
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `OllamaBackend`, `MockBackend`
//!
//! Backends only move text. Decoding and validation of the answer happen in
//! [`parsing`], and timeout/retry policy lives in the recommendation
//! synthesizer.

mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use mock::{MockBackend, MockReply, DEFAULT_MOCK_RESPONSE};
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RecommendationConfig;
use crate::error::{Error, Result};

/// Trait defining the interface for all reasoning backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Send one system + user exchange and return the raw answer text
    async fn complete_json(&self, request: &CompletionRequest) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Which backend a configuration selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    OpenaiCompatible,
    Ollama,
    Mock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenaiCompatible => "openai_compatible",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                Ok(Self::OpenaiCompatible)
            }
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            other => Err(Error::Config(format!("Unknown AI backend: {}", other))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI-compatible chat completions (OpenAI, vLLM, LocalAI, llama-server, ...)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create a client for the backend selected in the recommendation config
    pub fn from_config(config: &RecommendationConfig) -> Self {
        match config.backend {
            BackendKind::OpenaiCompatible => {
                AIClient::OpenAICompatible(match config.api_key.as_deref() {
                    Some(key) => OpenAICompatibleBackend::with_api_key(&config.host, &config.model, key),
                    None => OpenAICompatibleBackend::new(&config.host, &config.model),
                })
            }
            BackendKind::Ollama => AIClient::Ollama(OllamaBackend::new(&config.host, &config.model)),
            BackendKind::Mock => AIClient::Mock(MockBackend::new().with_model(&config.model)),
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            AIClient::OpenAICompatible(_) => BackendKind::OpenaiCompatible,
            AIClient::Ollama(_) => BackendKind::Ollama,
            AIClient::Mock(_) => BackendKind::Mock,
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Ollama(b) => AIClient::Ollama(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn complete_json(&self, request: &CompletionRequest) -> Result<String> {
        match self {
            AIClient::OpenAICompatible(b) => b.complete_json(request).await,
            AIClient::Ollama(b) => b.complete_json(request).await,
            AIClient::Mock(b) => b.complete_json(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Ollama(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Ollama(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("openai".parse::<BackendKind>().unwrap(), BackendKind::OpenaiCompatible);
        assert_eq!(" Ollama ".parse::<BackendKind>().unwrap(), BackendKind::Ollama);
        assert_eq!("mock".parse::<BackendKind>().unwrap(), BackendKind::Mock);
        assert!(matches!(
            "bard".parse::<BackendKind>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = RecommendationConfig::default();
        config.host = "http://localhost:8080/".into();
        config.model = "test-model".into();

        config.backend = BackendKind::Ollama;
        let client = AIClient::from_config(&config);
        assert_eq!(client.kind(), BackendKind::Ollama);
        assert_eq!(client.host(), "http://localhost:8080");
        assert_eq!(client.model(), "test-model");

        config.backend = BackendKind::OpenaiCompatible;
        config.api_key = Some("sk-test".into());
        let client = AIClient::from_config(&config);
        assert_eq!(client.kind(), BackendKind::OpenaiCompatible);

        config.backend = BackendKind::Mock;
        assert_eq!(AIClient::from_config(&config).kind(), BackendKind::Mock);
    }

    #[tokio::test]
    async fn test_client_dispatch_to_mock() {
        let client = AIClient::mock().with_model("scripted");
        assert_eq!(client.model(), "scripted");
        assert!(client.health_check().await);
        let answer = client
            .complete_json(&CompletionRequest::new("sys", "user"))
            .await
            .unwrap();
        assert_eq!(answer, DEFAULT_MOCK_RESPONSE);
    }
}
