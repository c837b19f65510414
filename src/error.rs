//! Error types for producers, the statistics store and the orchestrator.

use thiserror::Error;

/// Failure inside one data producer or its external service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProducerError {
    #[error("external service {service} failed: {reason}")]
    ExternalServiceFailure { service: &'static str, reason: String },
    #[error("malformed structured response from {service}: {reason}")]
    MalformedStructuredResponse { service: &'static str, reason: String },
    #[error("producer {0} panicked")]
    Panicked(&'static str),
}

impl ProducerError {
    pub fn external(service: &'static str, reason: impl ToString) -> Self {
        Self::ExternalServiceFailure {
            service,
            reason: reason.to_string(),
        }
    }

    pub fn malformed(service: &'static str, reason: impl ToString) -> Self {
        Self::MalformedStructuredResponse {
            service,
            reason: reason.to_string(),
        }
    }
}

/// Calibration state could not be read or written.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("statistics io: {0}")]
    Io(#[from] std::io::Error),
    #[error("statistics encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("statistics database: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Orchestrator-level failure surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    #[error("producers did not finish within {timeout_secs}s")]
    DeadlineExceeded { timeout_secs: u64 },
    #[error("producer {producer} failed: {source}")]
    ProducerFailed {
        producer: &'static str,
        source: ProducerError,
    },
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl From<StoreError> for AnalyzeError {
    fn from(e: StoreError) -> Self {
        AnalyzeError::PersistenceFailure(e.to_string())
    }
}
