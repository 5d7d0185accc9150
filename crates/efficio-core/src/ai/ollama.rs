//! Ollama backend implementation
//!
//! Uses the `/api/chat` endpoint with `format: "json"` so the model is
//! constrained to emit a JSON object.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::CompletionRequest;
use super::AIBackend;

/// Ollama backend (HTTP API)
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }
}

/// Request to the Ollama chat API
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    format: String,
    options: OllamaOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response from the Ollama chat API
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

impl OllamaChatRequest {
    fn from_completion(model: &str, request: &CompletionRequest) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                OllamaMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                OllamaMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            stream: false,
            format: "json".to_string(),
            options: OllamaOptions {
                temperature: request.temperature,
            },
        }
    }
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn complete_json(&self, request: &CompletionRequest) -> Result<String> {
        let body = OllamaChatRequest::from_completion(&self.model, request);

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SynthesisTransport(format!(
                "Ollama API error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let chat: OllamaChatResponse = response.json().await?;
        debug!(model = %self.model, "Ollama response received");
        Ok(chat.message.content)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_new() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:11434");
        assert_eq!(backend.model(), "llama3.2");
        assert_eq!(backend.with_model("qwen2.5").model(), "qwen2.5");
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = CompletionRequest::new("sys", "user").with_temperature(0.2);
        let body = OllamaChatRequest::from_completion("llama3.2", &request);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "user");
        let temp = json["options"]["temperature"].as_f64().unwrap();
        assert!((temp - 0.2).abs() < 0.001);
    }

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{"model": "llama3.2", "created_at": "2024-01-01T00:00:00Z",
            "message": {"role": "assistant", "content": "{}"}, "done": true}"#;
        let response: OllamaChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.message.content, "{}");
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend = OllamaBackend::new("http://127.0.0.1:1", "llama3.2");
        assert!(!backend.health_check().await);
    }
}
