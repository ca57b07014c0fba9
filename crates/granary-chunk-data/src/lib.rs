//! Granary chunk store: PostgreSQL persistence for documents and chunks
//!
//! Chunks carry up to two embedding vectors (768-d text, 1408-d multimodal)
//! in pgvector columns; documents track per-upload processing state.

// Module declarations
pub mod error;
pub mod models;
pub mod pool;
pub mod repository;
pub mod traits;

pub mod mock;
pub use mock::MockDocumentRepository;

// Public exports
pub use error::{DatabaseError, DatabaseErrorExt, DatabaseOperation, DatabaseResult};
pub use models::{
    AudioChunkMetadata, Document, DocumentChunkMetadata, DocumentState, EmbeddingType,
    ImageChunkMetadata, NewChunk, SearchHit, TranscriptMetadata, VideoChunkMetadata,
};
pub use pool::{create_pool, initialize_database};
pub use repository::{DbDocumentRepository, MULTIMODAL_EMBEDDING_DIM, TEXT_EMBEDDING_DIM};
pub use traits::DocumentRepository;
