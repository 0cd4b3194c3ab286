pub mod gemini;
pub mod retry;

use serde::{Deserialize, Serialize};

/// A model variant exposed by the backend, with the role it plays here.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl LlmError {
    /// Transport-class failures (timeout, connection failure, 503) are worth
    /// another attempt. Everything else (bad request, auth, quota) fails
    /// identically on every attempt and propagates immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(e) => e.is_timeout() || e.is_connect(),
            LlmError::Api { status, .. } => *status == 503,
            LlmError::Parse(_) => false,
        }
    }
}
