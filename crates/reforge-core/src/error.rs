//! Error types for the evaluation harness

use thiserror::Error;

/// Result type alias for harness operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Main error type for the evaluation harness.
///
/// Per-case and per-variant failures (deploy failures, transport errors)
/// are absorbed into the report structure and never surface here; the only
/// failure that aborts a whole run is [`EvalError::OracleBuild`], since
/// without ground truth no comparison is meaningful.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Candidate source errors (missing baseline, unreadable sample, ...)
    #[error("Candidate source error: {0}")]
    Provider(String),

    /// A candidate source does not define a discoverable callable
    #[error("Invalid candidate source: {0}")]
    InvalidSource(String),

    /// Ground truth could not be established; fatal for the whole run
    #[error("Oracle build failed: {0}")]
    OracleBuild(String),

    /// The run was cancelled before completion
    #[error("Evaluation was cancelled")]
    Cancelled,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(String),
}

impl EvalError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a candidate source error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Create an oracle build error
    pub fn oracle_build(message: impl Into<String>) -> Self {
        Self::OracleBuild(message.into())
    }
}

impl From<reqwest::Error> for EvalError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EvalError::oracle_build("baseline deployment refused");
        assert_eq!(
            err.to_string(),
            "Oracle build failed: baseline deployment refused"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EvalError = io.into();
        assert!(matches!(err, EvalError::Io(_)));
    }
}
