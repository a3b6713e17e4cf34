use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration failures. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Rejected ticket-flow requests. Surfaced to the user as a clarification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("cannot {action} a ticket that is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
