//! Error types for document extraction

use thiserror::Error;

/// Result type alias for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Errors from text extraction and chunking
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The file's format is not one the extractor supports
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Primary and fallback extraction both failed
    #[error("Document extraction failed for {filename}: {message}")]
    Extraction { filename: String, message: String },

    /// Extraction succeeded but produced no usable text
    #[error("Document {0} contains no extractable text")]
    EmptyDocument(String),

    /// Local file read failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
