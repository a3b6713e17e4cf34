use std::time::Duration;
use thiserror::Error;

/// Any reason the model could not produce a usable answer
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no model endpoint configured")]
    Disabled,
    #[error("missing API key (set {0})")]
    MissingApiKey(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
    #[error("model call exceeded {0:?}")]
    Timeout(Duration),
    #[error("model reply too short to be useful ({0} chars)")]
    UnusableReply(usize),
}
