//! Mock backend for testing
//!
//! Replays a script of replies, one per call, then repeats a fallback reply
//! (a valid recommendation unless configured otherwise). Clones share the
//! script and the call log, so a test can keep a handle while the analyzer
//! owns another.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::types::CompletionRequest;
use super::AIBackend;

/// Reply returned by the mock when no script entry is left
pub const DEFAULT_MOCK_RESPONSE: &str = r#"{
  "identified_inefficiencies": ["Utilization varies widely between departments"],
  "optimization_suggestions": ["Rebalance staff hours toward under-utilized teams"],
  "potential_savings_percent": 10,
  "priority_actions": ["Review IT capacity", "Align budgets with utilization", "Automate HR reporting"]
}"#;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text as the model's answer
    Content(String),
    /// Fail with a transport error carrying this message
    TransportError(String),
    /// Wait, then return this text (for timeout tests)
    Delayed(Duration, String),
}

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    model: String,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    fallback: MockReply,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<CompletionRequest>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy, always answers with the default reply)
    pub fn new() -> Self {
        Self {
            healthy: true,
            model: "mock".to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: MockReply::Content(DEFAULT_MOCK_RESPONSE.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Create a mock that plays `replies` in order before falling back to the default
    pub fn with_script(replies: Vec<MockReply>) -> Self {
        let backend = Self::new();
        if let Ok(mut script) = backend.script.lock() {
            script.extend(replies);
        }
        backend
    }

    /// Create a mock that always answers with `content`
    pub fn always(content: &str) -> Self {
        Self {
            fallback: MockReply::Content(content.to_string()),
            ..Self::new()
        }
    }

    /// Create a mock whose every call fails with a transport error
    pub fn failing(message: &str) -> Self {
        Self {
            fallback: MockReply::TransportError(message.to_string()),
            ..Self::new()
        }
    }

    /// Create a new instance with a different model name (shares the script)
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Number of completion calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request, if any
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }

    fn next_reply(&self) -> MockReply {
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn complete_json(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        match self.next_reply() {
            MockReply::Content(text) => Ok(text),
            MockReply::TransportError(message) => Err(Error::SynthesisTransport(message)),
            MockReply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
