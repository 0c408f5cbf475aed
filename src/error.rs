use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transient model failure: {0}")]
    Transient(String),

    #[error("model API error {status}: {detail}")]
    Rejected { status: u16, detail: String },

    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Timeouts abort immediately; only transient and malformed responses are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::Transient(_) | ModelError::InvalidResponse(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ModelError::Timeout(_))
    }

    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            408 | 429 | 500 | 502 | 503 | 504 => {
                ModelError::Transient(format!("status {}: {}", status, detail))
            }
            _ => ModelError::Rejected { status, detail },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    #[error("primary analysis timed out on attempt {attempt}")]
    TimedOut { attempt: u32 },

    #[error("primary analysis failed after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: ModelError },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}
