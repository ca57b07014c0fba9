//! Dual-embedding search for the chat layer
//!
//! Two query embeddings, two parallel cosine searches, one merged ranking.

pub mod error;
pub mod service;

pub use error::{SearchError, SearchResult};
pub use service::{SearchMatch, SearchRequest, SearchService};
