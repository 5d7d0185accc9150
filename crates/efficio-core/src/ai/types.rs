//! Backend-agnostic request types

use std::time::Duration;

use serde::Serialize;

/// A single-turn request for a JSON answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Role instruction sent as the system message
    pub system: String,
    /// Rendered user prompt carrying the metrics summary
    pub user: String,
    pub temperature: f32,
    /// Upper bound for one HTTP round trip
    #[serde(skip)]
    pub timeout: Duration,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.3,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new("sys", "user")
            .with_temperature(0.1)
            .with_timeout(Duration::from_secs(5));
        assert_eq!(request.system, "sys");
        assert_eq!(request.user, "user");
        assert!((request.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(request.timeout, Duration::from_secs(5));
    }
}
