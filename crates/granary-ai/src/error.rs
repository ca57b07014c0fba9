//! Error types for the managed AI clients

use thiserror::Error;

/// Result type alias for AI operations
pub type AiResult<T> = Result<T, AiError>;

/// Errors from embedding, description, and transcription calls
#[derive(Error, Debug)]
pub enum AiError {
    /// Credential missing or rejected
    #[error("AI authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (connect, TLS, timeout)
    #[error("AI request failed: {0}")]
    Http(String),

    /// Non-success status from the service
    #[error("AI service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("AI response parse error: {0}")]
    Parse(String),

    /// Embedding call produced a vector of the wrong dimensionality
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Local file handling before upload failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AiError {
    /// Whether the in-process retry loop should re-attempt this error
    ///
    /// Transport failures and 429/5xx statuses are transient; auth, parse,
    /// and dimension errors are not.
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Auth(_) | Self::Parse(_) | Self::DimensionMismatch { .. } | Self::Io(_) => false,
        }
    }
}
