//! Error types for dual-embedding search

use thiserror::Error;

/// Result type alias for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors surfaced to the search caller
#[derive(Error, Debug)]
pub enum SearchError {
    /// Both query embeddings failed; no search path is available
    #[error("Query embedding failed on both paths: {0}")]
    Embedding(String),

    /// The chunk store rejected or failed the similarity query
    #[error("Search storage error: {0}")]
    Storage(String),

    /// Invalid search parameters
    #[error("Invalid search request: {0}")]
    InvalidRequest(String),
}

impl From<granary_chunk_data::DatabaseError> for SearchError {
    fn from(e: granary_chunk_data::DatabaseError) -> Self {
        Self::Storage(e.to_string())
    }
}
