//! Dual-embedding search service
//!
//! Embeds the query twice (768-d text, 1408-d multimodal) in parallel, runs
//! one cosine search per vector column in parallel, and merges by chunk id
//! keeping the higher similarity. Either path failing degrades the search to
//! the other; both failing is an error.

use granary_ai::{MultimodalEmbedder, TextEmbedder};
use granary_chunk_data::{DocumentRepository, SearchHit};
use granary_common::CorrelationId;
use pgvector::Vector;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{SearchError, SearchResult};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

/// Parameters for one search call
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Owner scope; only this user's chunks are searched
    pub user_id: Uuid,
    /// Natural-language query
    pub query: String,
    /// Maximum results to return
    pub limit: Option<usize>,
    /// Drop results below this cosine similarity
    pub min_similarity: Option<f32>,
    /// Restrict to documents with these MIME types
    pub mime_types: Option<Vec<String>>,
}

/// One merged search result
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchMatch {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub chunk_index: i32,
    pub metadata: serde_json::Value,
    pub similarity: f32,
    /// Which vector column(s) produced this match
    pub matched_by: Vec<&'static str>,
}

/// Search service over the two vector columns
pub struct SearchService {
    text_embedder: Arc<dyn TextEmbedder>,
    multimodal_embedder: Arc<dyn MultimodalEmbedder>,
    repository: Arc<dyn DocumentRepository>,
}

impl SearchService {
    /// Create the service with its dependencies
    pub fn new(
        text_embedder: Arc<dyn TextEmbedder>,
        multimodal_embedder: Arc<dyn MultimodalEmbedder>,
        repository: Arc<dyn DocumentRepository>,
    ) -> Self {
        Self {
            text_embedder,
            multimodal_embedder,
            repository,
        }
    }

    /// Run a dual-embedding search
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for an empty query and `Embedding` when both
    /// query embeddings fail; single-path failures degrade with a warning.
    pub async fn search(&self, request: &SearchRequest) -> SearchResult<Vec<SearchMatch>> {
        if request.query.trim().is_empty() {
            return Err(SearchError::InvalidRequest("empty query".to_string()));
        }
        let correlation_id = CorrelationId::new();
        let limit = request.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let min_similarity = request.min_similarity.unwrap_or(0.0);

        // Both query embeddings in parallel.
        let text_query_input = [request.query.as_str()];
        let (text_embedding, multimodal_embedding) = tokio::join!(
            self.text_embedder.embed(&text_query_input),
            self.multimodal_embedder.embed_text(&request.query),
        );

        let text_query = match text_embedding {
            Ok(mut vectors) if !vectors.is_empty() => Some(Vector::from(vectors.remove(0))),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Text query embedding failed, degrading to multimodal-only");
                None
            }
        };
        let multimodal_query = match multimodal_embedding {
            Ok(vector) => Some(Vector::from(vector)),
            Err(e) => {
                tracing::warn!(error = %e, "Multimodal query embedding failed, degrading to text-only");
                None
            }
        };

        if text_query.is_none() && multimodal_query.is_none() {
            return Err(SearchError::Embedding(
                "both text and multimodal query embeddings failed".to_string(),
            ));
        }

        let mime_types = request.mime_types.as_deref();

        // One cosine search per populated path, in parallel. Each query
        // vector only ever meets its own column.
        let (text_hits, multimodal_hits) = tokio::join!(
            async {
                match &text_query {
                    Some(query) => {
                        self.repository
                            .search_text_embeddings(
                                request.user_id,
                                query.clone(),
                                limit,
                                mime_types,
                            )
                            .await
                    }
                    None => Ok(Vec::new()),
                }
            },
            async {
                match &multimodal_query {
                    Some(query) => {
                        self.repository
                            .search_multimodal_embeddings(
                                request.user_id,
                                query.clone(),
                                limit,
                                mime_types,
                            )
                            .await
                    }
                    None => Ok(Vec::new()),
                }
            },
        );

        let merged = merge_hits(text_hits?, multimodal_hits?);

        let mut matches: Vec<SearchMatch> = merged
            .into_iter()
            .filter(|m| m.similarity >= min_similarity)
            .collect();
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(limit);

        tracing::debug!(
            correlation_id = %correlation_id,
            user_id = %request.user_id,
            results = matches.len(),
            "Dual-embedding search completed"
        );

        Ok(matches)
    }
}

/// Merge per-column hits by chunk id, keeping the higher similarity
fn merge_hits(text_hits: Vec<SearchHit>, multimodal_hits: Vec<SearchHit>) -> Vec<SearchMatch> {
    let mut merged: HashMap<Uuid, SearchMatch> = HashMap::new();

    for (source, hits) in [("text", text_hits), ("multimodal", multimodal_hits)] {
        for hit in hits {
            match merged.get_mut(&hit.chunk_id) {
                Some(existing) => {
                    if hit.similarity > existing.similarity {
                        existing.similarity = hit.similarity;
                    }
                    existing.matched_by.push(source);
                }
                None => {
                    merged.insert(
                        hit.chunk_id,
                        SearchMatch {
                            chunk_id: hit.chunk_id,
                            document_id: hit.document_id,
                            content: hit.content,
                            context: hit.context,
                            chunk_index: hit.chunk_index,
                            metadata: hit.metadata,
                            similarity: hit.similarity,
                            matched_by: vec![source],
                        },
                    );
                }
            }
        }
    }

    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use granary_ai::{MockAiService, deterministic_embedding};
    use granary_chunk_data::{
        Document, DocumentState, EmbeddingType, MockDocumentRepository, NewChunk,
    };

    fn completed_video_document(user_id: Uuid) -> Document {
        Document {
            id: Uuid::new_v4(),
            user_id,
            filename: "earnings.mp4".to_string(),
            object_key: "uploads/earnings.mp4".to_string(),
            mime_type: "video/mp4".to_string(),
            size_bytes: 1024,
            state: DocumentState::Processing,
            stage: "storing".to_string(),
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Seed one video chunk whose transcript embedding matches "quarterly
    /// revenue" wording and whose visual embedding matches "revenue chart".
    async fn seeded_service() -> (SearchService, Uuid, Arc<MockAiService>) {
        let user_id = Uuid::new_v4();
        let repository = Arc::new(MockDocumentRepository::new());
        let ai = Arc::new(MockAiService::new());

        let document = completed_video_document(user_id);
        let document_id = document.id;
        repository.insert_document(document);

        let chunk = NewChunk {
            content: "our quarterly revenue grew twelve percent".to_string(),
            context: Some("a bar chart showing revenue by quarter".to_string()),
            chunk_index: 0,
            metadata: serde_json::json!({"segment_index": 0}),
            embedding_type: EmbeddingType::Multimodal,
            text_embedding: Some(Vector::from(deterministic_embedding(
                "our quarterly revenue grew twelve percent",
                768,
            ))),
            multimodal_embedding: Some(Vector::from(deterministic_embedding(
                "a bar chart showing revenue by quarter",
                1408,
            ))),
        };
        repository
            .commit_chunks(document_id, user_id, &[chunk])
            .await
            .unwrap();

        let service = SearchService::new(
            Arc::clone(&ai) as Arc<dyn TextEmbedder>,
            Arc::clone(&ai) as Arc<dyn MultimodalEmbedder>,
            repository,
        );
        (service, user_id, ai)
    }

    fn request(user_id: Uuid, query: &str) -> SearchRequest {
        SearchRequest {
            user_id,
            query: query.to_string(),
            limit: Some(10),
            min_similarity: Some(0.5),
            mime_types: None,
        }
    }

    #[tokio::test]
    async fn matching_query_merges_both_paths_into_one_result() {
        let (service, user_id, _ai) = seeded_service().await;

        // Identical wording to the stored transcript gives the text path a
        // perfect match; the mock embeds queries deterministically.
        let matches = service
            .search(&request(user_id, "our quarterly revenue grew twelve percent"))
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert!(matches[0].similarity > 0.99);
        assert!(matches[0].matched_by.contains(&"text"));
    }

    #[tokio::test]
    async fn unrelated_query_returns_nothing() {
        let (service, user_id, _ai) = seeded_service().await;

        let matches = service
            .search(&request(user_id, "cat on a sofa"))
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn other_users_see_nothing() {
        let (service, _user_id, _ai) = seeded_service().await;

        let matches = service
            .search(&request(
                Uuid::new_v4(),
                "our quarterly revenue grew twelve percent",
            ))
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn multimodal_failure_degrades_to_text_only() {
        let (service, user_id, ai) = seeded_service().await;
        ai.fail_multimodal_embeddings(true);

        let matches = service
            .search(&request(user_id, "our quarterly revenue grew twelve percent"))
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_by, vec!["text"]);
    }

    #[tokio::test]
    async fn text_failure_degrades_to_multimodal_only() {
        let (service, user_id, ai) = seeded_service().await;
        ai.fail_text_embeddings(true);

        let matches = service
            .search(&request(user_id, "a bar chart showing revenue by quarter"))
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_by, vec!["multimodal"]);
    }

    #[tokio::test]
    async fn both_failures_surface_an_error() {
        let (service, user_id, ai) = seeded_service().await;
        ai.fail_text_embeddings(true);
        ai.fail_multimodal_embeddings(true);

        let err = service
            .search(&request(user_id, "anything"))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Embedding(_)));
    }

    #[tokio::test]
    async fn empty_query_is_invalid() {
        let (service, user_id, _ai) = seeded_service().await;
        let err = service.search(&request(user_id, "  ")).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidRequest(_)));
    }

    #[test]
    fn merge_keeps_the_higher_similarity() {
        let chunk_id = Uuid::new_v4();
        let document_id = Uuid::new_v4();
        let hit = |similarity: f32| SearchHit {
            chunk_id,
            document_id,
            content: "transcript".to_string(),
            context: None,
            chunk_index: 0,
            metadata: serde_json::json!({}),
            similarity,
        };

        let merged = merge_hits(vec![hit(0.62)], vec![hit(0.81)]);
        assert_eq!(merged.len(), 1);
        assert!((merged[0].similarity - 0.81).abs() < f32::EPSILON);
        assert_eq!(merged[0].matched_by, vec!["text", "multimodal"]);
    }
}
