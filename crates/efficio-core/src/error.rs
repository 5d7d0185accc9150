//! Error types for Efficio

use thiserror::Error;

use crate::models::Department;

#[derive(Error, Debug)]
pub enum Error {
    /// Duplicate keys, out-of-range values, malformed rows, empty tables
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// A single department's forecast could not be fit
    #[error("Forecast fitting failed for {department}: {reason}")]
    ForecastFitting {
        department: Department,
        reason: String,
    },

    /// The reasoning service answered, but not with a valid recommendation object
    #[error("Recommendation schema error: {0}")]
    SynthesisSchema(String),

    /// The reasoning service could not be reached, timed out, or returned an error status
    #[error("Recommendation transport error: {0}")]
    SynthesisTransport(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A background analysis task panicked or was cancelled
    #[error("Analysis task failed: {0}")]
    Task(String),
}

impl Error {
    /// Whether a recommendation attempt that failed with this error may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::SynthesisTransport(_) | Error::SynthesisSchema(_))
    }

    /// Short, stable name of the error kind (for logs and CLI output)
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DataIntegrity(_) => "data_integrity",
            Error::ForecastFitting { .. } => "forecast_fitting",
            Error::SynthesisSchema(_) => "synthesis_schema",
            Error::SynthesisTransport(_) => "synthesis_transport",
            Error::Csv(_) => "csv",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Config(_) => "config",
            Error::Task(_) => "task",
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Task(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::SynthesisTransport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
