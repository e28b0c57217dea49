//! Error types for the AI module

use thiserror::Error;

/// AI module error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{provider} API error ({status}): {message}")]
    LlmHttp {
        provider: String,
        status: u16,
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Max iterations reached: {0}")]
    MaxIterations(usize),

    #[error("Too many consecutive LLM errors: {0}")]
    ConsecutiveLlmErrors(usize),

    #[error("Turn cancelled")]
    Cancelled,

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AiError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LlmHttp { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Llm(message) => {
                let lower = message.to_lowercase();
                lower.contains("rate limit") || lower.contains("timeout")
            }
            _ => false,
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::LlmHttp {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    /// Errors that end the turn because a loop bound was hit.
    pub fn is_turn_limit(&self) -> bool {
        matches!(
            self,
            Self::MaxIterations(_) | Self::ConsecutiveLlmErrors(_) | Self::Cancelled
        )
    }
}

/// Result type alias for AI operations
pub type Result<T> = std::result::Result<T, AiError>;
