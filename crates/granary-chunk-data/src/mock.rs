//! In-memory mock repository for testing without PostgreSQL
//!
//! Mirrors the transactional semantics of the real repository: monotonic
//! state transitions, idempotent chunk commits, completed-only visibility,
//! and brute-force cosine search over the stored vectors.

use async_trait::async_trait;
use pgvector::Vector;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};
use crate::models::{Document, DocumentState, NewChunk, SearchHit};
use crate::repository::{MULTIMODAL_EMBEDDING_DIM, TEXT_EMBEDDING_DIM};
use crate::traits::DocumentRepository;

#[derive(Debug, Clone)]
struct StoredChunk {
    id: Uuid,
    document_id: Uuid,
    user_id: Uuid,
    chunk: NewChunk,
}

/// Mock repository holding documents and chunks in memory
#[derive(Default)]
pub struct MockDocumentRepository {
    documents: Mutex<HashMap<Uuid, Document>>,
    chunks: Mutex<Vec<StoredChunk>>,
}

impl MockDocumentRepository {
    /// Create an empty mock repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document row (the external upload path does this in production)
    pub fn insert_document(&self, document: Document) {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(document.id, document);
        }
    }

    /// Snapshot of a document's current row
    pub fn document(&self, document_id: Uuid) -> Option<Document> {
        self.documents
            .lock()
            .ok()
            .and_then(|documents| documents.get(&document_id).cloned())
    }

    /// All chunks persisted for a document, ordered by chunk index
    pub fn chunks_for(&self, document_id: Uuid) -> Vec<NewChunk> {
        let mut owned: Vec<_> = self
            .chunks
            .lock()
            .map(|chunks| {
                chunks
                    .iter()
                    .filter(|c| c.document_id == document_id)
                    .map(|c| c.chunk.clone())
                    .collect()
            })
            .unwrap_or_default();
        owned.sort_by_key(|c| c.chunk_index);
        owned
    }

    fn search(
        &self,
        user_id: Uuid,
        query: &Vector,
        limit: usize,
        mime_types: Option<&[String]>,
        multimodal: bool,
    ) -> Vec<SearchHit> {
        let documents = match self.documents.lock() {
            Ok(documents) => documents.clone(),
            Err(_) => return Vec::new(),
        };
        let chunks = match self.chunks.lock() {
            Ok(chunks) => chunks.clone(),
            Err(_) => return Vec::new(),
        };

        let mut hits: Vec<SearchHit> = chunks
            .iter()
            .filter(|stored| stored.user_id == user_id)
            .filter(|stored| {
                documents.get(&stored.document_id).is_some_and(|d| {
                    d.state == DocumentState::Completed
                        && mime_types.is_none_or(|types| types.contains(&d.mime_type))
                })
            })
            .filter_map(|stored| {
                let embedding = if multimodal {
                    stored.chunk.multimodal_embedding.as_ref()
                } else {
                    stored.chunk.text_embedding.as_ref()
                }?;
                Some(SearchHit {
                    chunk_id: stored.id,
                    document_id: stored.document_id,
                    content: stored.chunk.content.clone(),
                    context: stored.chunk.context.clone(),
                    chunk_index: stored.chunk.chunk_index,
                    metadata: stored.chunk.metadata.clone(),
                    similarity: cosine_similarity(query.as_slice(), embedding.as_slice()),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(limit);
        hits
    }
}

/// Cosine similarity between two equal-length vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl DocumentRepository for MockDocumentRepository {
    async fn find_by_object_key(&self, object_key: &str) -> DatabaseResult<Option<Document>> {
        Ok(self.documents.lock().ok().and_then(|documents| {
            documents
                .values()
                .find(|d| d.object_key == object_key)
                .cloned()
        }))
    }

    async fn get_document(&self, document_id: Uuid) -> DatabaseResult<Option<Document>> {
        Ok(self.document(document_id))
    }

    async fn mark_processing(&self, document_id: Uuid, stage: &str) -> DatabaseResult<()> {
        if let Ok(mut documents) = self.documents.lock()
            && let Some(doc) = documents.get_mut(&document_id)
            && matches!(
                doc.state,
                DocumentState::Pending | DocumentState::Processing
            )
        {
            doc.state = DocumentState::Processing;
            doc.stage = stage.to_string();
            doc.error = None;
        }
        Ok(())
    }

    async fn update_stage(&self, document_id: Uuid, stage: &str) -> DatabaseResult<()> {
        if let Ok(mut documents) = self.documents.lock()
            && let Some(doc) = documents.get_mut(&document_id)
            && doc.state == DocumentState::Processing
        {
            doc.stage = stage.to_string();
        }
        Ok(())
    }

    async fn commit_chunks(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        chunks: &[NewChunk],
    ) -> DatabaseResult<u64> {
        for chunk in chunks {
            if let Some(embedding) = &chunk.text_embedding {
                let actual = embedding.as_slice().len();
                if actual != TEXT_EMBEDDING_DIM {
                    return Err(DatabaseError::DimensionMismatch {
                        column: "text_embedding",
                        expected: TEXT_EMBEDDING_DIM,
                        actual,
                    });
                }
            }
            if let Some(embedding) = &chunk.multimodal_embedding {
                let actual = embedding.as_slice().len();
                if actual != MULTIMODAL_EMBEDDING_DIM {
                    return Err(DatabaseError::DimensionMismatch {
                        column: "multimodal_embedding",
                        expected: MULTIMODAL_EMBEDDING_DIM,
                        actual,
                    });
                }
            }
        }

        let mut inserted = 0u64;
        if let Ok(mut stored) = self.chunks.lock() {
            for chunk in chunks {
                let duplicate = stored
                    .iter()
                    .any(|c| c.document_id == document_id && c.chunk.chunk_index == chunk.chunk_index);
                if duplicate {
                    continue;
                }
                stored.push(StoredChunk {
                    id: Uuid::new_v4(),
                    document_id,
                    user_id,
                    chunk: chunk.clone(),
                });
                inserted = inserted.saturating_add(1);
            }
        }

        if let Ok(mut documents) = self.documents.lock()
            && let Some(doc) = documents.get_mut(&document_id)
            && matches!(
                doc.state,
                DocumentState::Pending | DocumentState::Processing
            )
        {
            doc.state = DocumentState::Completed;
            doc.stage = "completed".to_string();
            doc.error = None;
        }

        Ok(inserted)
    }

    async fn mark_failed(&self, document_id: Uuid, error: &str) -> DatabaseResult<()> {
        if let Ok(mut stored) = self.chunks.lock() {
            stored.retain(|c| c.document_id != document_id);
        }
        if let Ok(mut documents) = self.documents.lock()
            && let Some(doc) = documents.get_mut(&document_id)
            && matches!(
                doc.state,
                DocumentState::Pending | DocumentState::Processing
            )
        {
            doc.state = DocumentState::Failed;
            doc.stage = "failed".to_string();
            doc.error = Some(error.to_string());
        }
        Ok(())
    }

    async fn count_chunks(&self, document_id: Uuid) -> DatabaseResult<i64> {
        Ok(self
            .chunks
            .lock()
            .map(|chunks| {
                chunks
                    .iter()
                    .filter(|c| c.document_id == document_id)
                    .count() as i64
            })
            .unwrap_or(0))
    }

    async fn search_text_embeddings(
        &self,
        user_id: Uuid,
        query: Vector,
        limit: usize,
        mime_types: Option<&[String]>,
    ) -> DatabaseResult<Vec<SearchHit>> {
        let actual = query.as_slice().len();
        if actual != TEXT_EMBEDDING_DIM {
            return Err(DatabaseError::DimensionMismatch {
                column: "text_embedding",
                expected: TEXT_EMBEDDING_DIM,
                actual,
            });
        }
        Ok(self.search(user_id, &query, limit, mime_types, false))
    }

    async fn search_multimodal_embeddings(
        &self,
        user_id: Uuid,
        query: Vector,
        limit: usize,
        mime_types: Option<&[String]>,
    ) -> DatabaseResult<Vec<SearchHit>> {
        let actual = query.as_slice().len();
        if actual != MULTIMODAL_EMBEDDING_DIM {
            return Err(DatabaseError::DimensionMismatch {
                column: "multimodal_embedding",
                expected: MULTIMODAL_EMBEDDING_DIM,
                actual,
            });
        }
        Ok(self.search(user_id, &query, limit, mime_types, true))
    }

    async fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmbeddingType;
    use chrono::Utc;

    fn test_document(state: DocumentState) -> Document {
        Document {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            filename: "report.pdf".to_string(),
            object_key: "uploads/report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size_bytes: 1024,
            state,
            stage: "pending".to_string(),
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn text_chunk(index: i32) -> NewChunk {
        NewChunk {
            content: format!("chunk {index}"),
            context: None,
            chunk_index: index,
            metadata: serde_json::json!({}),
            embedding_type: EmbeddingType::Text,
            text_embedding: Some(Vector::from(vec![0.1; TEXT_EMBEDDING_DIM])),
            multimodal_embedding: None,
        }
    }

    #[tokio::test]
    async fn commit_is_idempotent_on_redelivery() {
        let repo = MockDocumentRepository::new();
        let doc = test_document(DocumentState::Processing);
        let (doc_id, user_id) = (doc.id, doc.user_id);
        repo.insert_document(doc);

        let chunks = vec![text_chunk(0), text_chunk(1)];
        let first = repo.commit_chunks(doc_id, user_id, &chunks).await.unwrap();
        let second = repo.commit_chunks(doc_id, user_id, &chunks).await.unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);
        assert_eq!(repo.count_chunks(doc_id).await.unwrap(), 2);
        assert_eq!(
            repo.document(doc_id).unwrap().state,
            DocumentState::Completed
        );
    }

    #[tokio::test]
    async fn state_transitions_never_go_backward() {
        let repo = MockDocumentRepository::new();
        let doc = test_document(DocumentState::Processing);
        let (doc_id, user_id) = (doc.id, doc.user_id);
        repo.insert_document(doc);

        repo.commit_chunks(doc_id, user_id, &[text_chunk(0)])
            .await
            .unwrap();
        repo.mark_processing(doc_id, "downloading").await.unwrap();
        repo.mark_failed(doc_id, "late failure").await.unwrap();

        let doc = repo.document(doc_id).unwrap();
        assert_eq!(doc.state, DocumentState::Completed);
        assert_eq!(repo.count_chunks(doc_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_documents_own_no_chunks() {
        let repo = MockDocumentRepository::new();
        let doc = test_document(DocumentState::Processing);
        let (doc_id, user_id) = (doc.id, doc.user_id);
        repo.insert_document(doc);

        if let Ok(mut stored) = repo.chunks.lock() {
            stored.push(StoredChunk {
                id: Uuid::new_v4(),
                document_id: doc_id,
                user_id,
                chunk: text_chunk(0),
            });
        }
        repo.mark_failed(doc_id, "embedding service down")
            .await
            .unwrap();

        assert_eq!(repo.count_chunks(doc_id).await.unwrap(), 0);
        let doc = repo.document(doc_id).unwrap();
        assert_eq!(doc.state, DocumentState::Failed);
        assert_eq!(doc.error.as_deref(), Some("embedding service down"));
    }

    #[tokio::test]
    async fn search_rejects_wrong_dimensions() {
        let repo = MockDocumentRepository::new();
        let err = repo
            .search_text_embeddings(Uuid::new_v4(), Vector::from(vec![0.0; 4]), 10, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn search_only_sees_completed_documents() {
        let repo = MockDocumentRepository::new();
        let doc = test_document(DocumentState::Processing);
        let (doc_id, user_id) = (doc.id, doc.user_id);
        repo.insert_document(doc);

        if let Ok(mut stored) = repo.chunks.lock() {
            stored.push(StoredChunk {
                id: Uuid::new_v4(),
                document_id: doc_id,
                user_id,
                chunk: text_chunk(0),
            });
        }

        let query = Vector::from(vec![0.1; TEXT_EMBEDDING_DIM]);
        let hits = repo
            .search_text_embeddings(user_id, query.clone(), 10, None)
            .await
            .unwrap();
        assert!(hits.is_empty());

        repo.commit_chunks(doc_id, user_id, &[text_chunk(1)])
            .await
            .unwrap();
        let hits = repo
            .search_text_embeddings(user_id, query, 10, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].similarity > 0.99);
    }
}
