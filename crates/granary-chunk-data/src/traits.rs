//! Repository trait for document and chunk persistence

use crate::error::DatabaseResult;
use crate::models::{Document, NewChunk, SearchHit};
use async_trait::async_trait;
use pgvector::Vector;
use uuid::Uuid;

/// Gateway to the document and chunk tables
///
/// All writes from the processor go through this trait so tests can run
/// against the in-memory mock.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Find a document by its stored object key
    async fn find_by_object_key(&self, object_key: &str) -> DatabaseResult<Option<Document>>;

    /// Fetch a document by id
    async fn get_document(&self, document_id: Uuid) -> DatabaseResult<Option<Document>>;

    /// Transition a document to `processing` with the given stage
    ///
    /// A no-op when the document is already `completed` or `failed`; state
    /// transitions never go backward.
    async fn mark_processing(&self, document_id: Uuid, stage: &str) -> DatabaseResult<()>;

    /// Update the free-form stage label while processing
    async fn update_stage(&self, document_id: Uuid, stage: &str) -> DatabaseResult<()>;

    /// Insert every chunk for a document in one transaction and mark it `completed`
    ///
    /// Redelivered writes are idempotent: rows violating the
    /// `(document_id, chunk_index)` uniqueness are skipped, making the second
    /// attempt a no-op success.
    async fn commit_chunks(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        chunks: &[NewChunk],
    ) -> DatabaseResult<u64>;

    /// Transition a document to `failed`, recording the error
    ///
    /// Best-effort: also removes any chunk rows a partial attempt left behind
    /// so a failed document owns no chunks.
    async fn mark_failed(&self, document_id: Uuid, error: &str) -> DatabaseResult<()>;

    /// Number of chunks currently persisted for a document
    async fn count_chunks(&self, document_id: Uuid) -> DatabaseResult<i64>;

    /// Cosine search against the 768-d text embedding column
    async fn search_text_embeddings(
        &self,
        user_id: Uuid,
        query: Vector,
        limit: usize,
        mime_types: Option<&[String]>,
    ) -> DatabaseResult<Vec<SearchHit>>;

    /// Cosine search against the 1408-d multimodal embedding column
    async fn search_multimodal_embeddings(
        &self,
        user_id: Uuid,
        query: Vector,
        limit: usize,
        mime_types: Option<&[String]>,
    ) -> DatabaseResult<Vec<SearchHit>>;

    /// Liveness probe for health checks
    async fn is_ready(&self) -> bool;
}
