//! Processing error taxonomy
//!
//! Non-retriable classes (validation, unsupported type, resource limits,
//! deadline) fail a job immediately; the pipeline classes are retriable at
//! the queue level up to the delivery attempt cap.

use thiserror::Error;

/// Result type alias for processing operations
pub type ProcessingResult<T> = Result<T, ProcessingError>;

/// Errors raised while processing a task
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// Malformed task or unusable input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Media type is unknown or disallowed
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Size, duration, or segment-count limit exceeded
    #[error("Resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// Object download failed
    #[error("Object download failed: {0}")]
    Download(String),

    /// Document text extraction failed
    #[error("Document extraction failed: {0}")]
    Extraction(String),

    /// Transcription failed after in-call retries
    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// Visual description failed after in-call retries
    #[error("Description failed: {0}")]
    Description(String),

    /// Embedding generation failed after in-call retries
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Chunk store write failed
    #[error("Chunk storage failed: {0}")]
    Storage(String),

    /// External transcoder invocation failed
    #[error("Transcoder failed: {0}")]
    Transcode(String),

    /// Job wall-clock deadline exceeded
    #[error("Job deadline of {0}s exceeded")]
    Timeout(u64),

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessingError {
    /// Whether the durable queue should re-attempt the task
    ///
    /// Deterministic failures (validation, limits, deadline) would fail the
    /// same way again; everything touching an external service may succeed
    /// on redelivery.
    pub const fn is_retriable(&self) -> bool {
        !matches!(
            self,
            Self::Validation(_)
                | Self::UnsupportedMediaType(_)
                | Self::ResourceLimit(_)
                | Self::Timeout(_)
        )
    }
}

impl From<granary_object_store::ObjectStoreError> for ProcessingError {
    fn from(e: granary_object_store::ObjectStoreError) -> Self {
        Self::Download(e.to_string())
    }
}

impl From<granary_extract::ExtractError> for ProcessingError {
    fn from(e: granary_extract::ExtractError) -> Self {
        match e {
            granary_extract::ExtractError::UnsupportedFormat(msg) => Self::UnsupportedMediaType(msg),
            other => Self::Extraction(other.to_string()),
        }
    }
}

impl From<granary_chunk_data::DatabaseError> for ProcessingError {
    fn from(e: granary_chunk_data::DatabaseError) -> Self {
        Self::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_failures_are_terminal() {
        assert!(!ProcessingError::Validation("bad task".into()).is_retriable());
        assert!(!ProcessingError::ResourceLimit("too big".into()).is_retriable());
        assert!(!ProcessingError::Timeout(3600).is_retriable());
        assert!(ProcessingError::Embedding("503".into()).is_retriable());
        assert!(ProcessingError::Storage("connection reset".into()).is_retriable());
    }
}
