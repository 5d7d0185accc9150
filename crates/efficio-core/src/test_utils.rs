//! Test utilities for efficio-core
//!
//! A mock reasoning server speaking both the OpenAI-compatible chat
//! completions API and the Ollama chat API, for integration tests and local
//! development without a real service.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::DEFAULT_MOCK_RESPONSE;

struct ServerState {
    content: Mutex<String>,
    /// Chat requests still to be answered with HTTP 500
    failures_remaining: AtomicUsize,
    requests: AtomicUsize,
    last_body: Mutex<Option<Value>>,
}

/// Mock reasoning server bound to an ephemeral localhost port
pub struct MockReasoningServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockReasoningServer {
    /// Start a server that answers every chat request with a valid recommendation
    pub async fn start() -> Self {
        Self::start_with(DEFAULT_MOCK_RESPONSE, 0).await
    }

    /// Start a server answering with `content`, failing the first `fail_first` chat requests
    pub async fn start_with(content: &str, fail_first: usize) -> Self {
        let state = Arc::new(ServerState {
            content: Mutex::new(content.to_string()),
            failures_remaining: AtomicUsize::new(fail_first),
            requests: AtomicUsize::new(0),
            last_body: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat_completions))
            .route("/api/tags", get(handle_tags))
            .route("/api/chat", post(handle_ollama_chat))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of chat requests received, failed ones included
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Body of the most recent chat request
    pub fn last_body(&self) -> Option<Value> {
        self.state.last_body.lock().unwrap().clone()
    }

    /// Replace the content returned by later requests
    pub fn set_content(&self, content: &str) {
        *self.state.content.lock().unwrap() = content.to_string();
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockReasoningServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Deserialize)]
struct ChatBody {
    model: String,
}

/// Count the request and decide whether it should fail
fn record(state: &ServerState, body: &Value) -> Option<Response> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    *state.last_body.lock().unwrap() = Some(body.clone());

    let should_fail = state
        .failures_remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    should_fail.then(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "simulated upstream failure",
        )
            .into_response()
    })
}

fn model_of(body: &Value) -> String {
    serde_json::from_value::<ChatBody>(body.clone())
        .map(|b| b.model)
        .unwrap_or_default()
}

/// OpenAI-compatible model listing (health check)
async fn handle_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{ "id": "gpt-3.5-turbo", "object": "model" }]
    }))
}

async fn handle_chat_completions(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = record(&state, &body) {
        return failure;
    }
    let content = state.content.lock().unwrap().clone();
    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": model_of(&body),
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

/// Ollama tags endpoint (health check)
async fn handle_tags() -> Json<Value> {
    Json(json!({
        "models": [{ "name": "llama3.2:latest", "size": 4_000_000_000u64 }]
    }))
}

async fn handle_ollama_chat(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = record(&state, &body) {
        return failure;
    }
    let content = state.content.lock().unwrap().clone();
    Json(json!({
        "model": model_of(&body),
        "message": { "role": "assistant", "content": content },
        "done": true
    }))
    .into_response()
}
