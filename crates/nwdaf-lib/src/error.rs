//! Error taxonomy shared by the upstream clients and the steering loop

use thiserror::Error;

/// Failures surfaced by the Prometheus, NEF and LLM clients and by request
/// validation.
#[derive(Debug, Error)]
pub enum SteeringError {
    /// Network failure, timeout or connection refused
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("backend returned HTTP {status}: {body}")]
    Backend { status: u16, body: String },

    /// Upstream body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration file missing or malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller supplied an unusable value
    #[error("validation error: {0}")]
    Validation(String),
}

impl SteeringError {
    /// Build a backend error from a status and a response body.
    pub fn backend(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        SteeringError::Backend {
            status: status.as_u16(),
            body: body.into(),
        }
    }

    /// Short label used for metric status values.
    pub fn kind(&self) -> &'static str {
        match self {
            SteeringError::Transport(_) => "transport_error",
            SteeringError::Backend { .. } => "backend_error",
            SteeringError::Parse(_) => "parse_error",
            SteeringError::Config(_) => "config_error",
            SteeringError::Validation(_) => "validation_error",
        }
    }
}

impl From<config::ConfigError> for SteeringError {
    fn from(err: config::ConfigError) -> Self {
        SteeringError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SteeringError>;
