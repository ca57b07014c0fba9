//! Error types for object storage access

use thiserror::Error;

/// Result type alias for object storage operations
pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Errors from the object storage client
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    /// The object key does not exist in the bucket
    #[error("Object not found: {bucket}/{object_key}")]
    NotFound { bucket: String, object_key: String },

    /// Authentication against the storage API failed
    #[error("Storage authentication failed: {0}")]
    Auth(String),

    /// HTTP transport failure
    #[error("Storage request failed: {0}")]
    Http(String),

    /// Local filesystem failure while writing the download
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
