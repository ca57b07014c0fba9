//! PostgreSQL repository for documents and chunks
//!
//! Writes are parameterized sqlx queries; chunk persistence for a document is
//! one transaction so readers never observe a partially indexed document.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseErrorExt, DatabaseOperation, DatabaseResult};
use crate::models::{Document, NewChunk, SearchHit};
use crate::traits::DocumentRepository;

/// Dimensionality of the text embedding column
pub const TEXT_EMBEDDING_DIM: usize = 768;
/// Dimensionality of the multimodal embedding column
pub const MULTIMODAL_EMBEDDING_DIM: usize = 1408;

/// Repository backed by PostgreSQL with pgvector columns
pub struct DbDocumentRepository {
    pool: PgPool,
}

impl DbDocumentRepository {
    /// Create a new repository over an existing pool
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn validate_dimensions(chunk: &NewChunk) -> DatabaseResult<()> {
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
        Ok(())
    }

    async fn vector_search(
        &self,
        column: &'static str,
        user_id: Uuid,
        query: Vector,
        limit: usize,
        mime_types: Option<&[String]>,
    ) -> DatabaseResult<Vec<SearchHit>> {
        let operation = DatabaseOperation::VectorSearch { column };

        // Column name is one of two compile-time constants, never user input.
        let sql = format!(
            r"
            SELECT c.id, c.document_id, c.content, c.context, c.chunk_index, c.metadata,
                   1 - (c.{column} <=> $1) AS similarity
            FROM chunks c
            JOIN documents d ON d.id = c.document_id
            WHERE c.user_id = $2
              AND d.state = 'completed'
              AND c.{column} IS NOT NULL
              AND ($4::text[] IS NULL OR d.mime_type = ANY($4))
            ORDER BY c.{column} <=> $1
            LIMIT $3
            "
        );

        let rows = sqlx::query(&sql)
            .bind(query)
            .bind(user_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(mime_types)
            .fetch_all(&self.pool)
            .await
            .map_db_err(&operation)?;

        let hits = rows
            .iter()
            .map(|row| {
                #[allow(clippy::cast_possible_truncation)]
                let similarity = row.get::<f64, _>("similarity") as f32;
                SearchHit {
                    chunk_id: row.get("id"),
                    document_id: row.get("document_id"),
                    content: row.get("content"),
                    context: row.get("context"),
                    chunk_index: row.get("chunk_index"),
                    metadata: row.get("metadata"),
                    similarity,
                }
            })
            .collect();

        Ok(hits)
    }
}

#[async_trait]
impl DocumentRepository for DbDocumentRepository {
    async fn find_by_object_key(&self, object_key: &str) -> DatabaseResult<Option<Document>> {
        let operation = DatabaseOperation::FindDocumentByObjectKey {
            object_key: object_key.to_string(),
        };

        sqlx::query_as::<_, Document>(
            r"
            SELECT id, user_id, filename, object_key, mime_type, size_bytes,
                   state, stage, error, created_at, updated_at
            FROM documents
            WHERE object_key = $1
            ",
        )
        .bind(object_key)
        .fetch_optional(&self.pool)
        .await
        .map_db_err(&operation)
    }

    async fn get_document(&self, document_id: Uuid) -> DatabaseResult<Option<Document>> {
        let operation = DatabaseOperation::GetDocument {
            document_id: document_id.to_string(),
        };

        sqlx::query_as::<_, Document>(
            r"
            SELECT id, user_id, filename, object_key, mime_type, size_bytes,
                   state, stage, error, created_at, updated_at
            FROM documents
            WHERE id = $1
            ",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_db_err(&operation)
    }

    async fn mark_processing(&self, document_id: Uuid, stage: &str) -> DatabaseResult<()> {
        let operation = DatabaseOperation::UpdateDocumentState {
            document_id: document_id.to_string(),
        };

        // Guard keeps transitions monotonic: completed/failed rows are untouched.
        sqlx::query(
            r"
            UPDATE documents
            SET state = 'processing', stage = $2, error = NULL, updated_at = NOW()
            WHERE id = $1 AND state IN ('pending', 'processing')
            ",
        )
        .bind(document_id)
        .bind(stage)
        .execute(&self.pool)
        .await
        .map_db_err(&operation)?;

        Ok(())
    }

    async fn update_stage(&self, document_id: Uuid, stage: &str) -> DatabaseResult<()> {
        let operation = DatabaseOperation::UpdateDocumentState {
            document_id: document_id.to_string(),
        };

        sqlx::query(
            r"
            UPDATE documents
            SET stage = $2, updated_at = NOW()
            WHERE id = $1 AND state = 'processing'
            ",
        )
        .bind(document_id)
        .bind(stage)
        .execute(&self.pool)
        .await
        .map_db_err(&operation)?;

        Ok(())
    }

    async fn commit_chunks(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        chunks: &[NewChunk],
    ) -> DatabaseResult<u64> {
        let operation = DatabaseOperation::InsertChunks {
            document_id: document_id.to_string(),
        };

        for chunk in chunks {
            Self::validate_dimensions(chunk)?;
        }

        let mut tx = self.pool.begin().await.map_db_err(&operation)?;

        let mut inserted = 0u64;
        for chunk in chunks {
            // ON CONFLICT DO NOTHING makes redelivered tasks a no-op success.
            let result = sqlx::query(
                r"
                INSERT INTO chunks (id, document_id, user_id, content, context,
                                    chunk_index, metadata, embedding_type,
                                    text_embedding, multimodal_embedding)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (document_id, chunk_index) DO NOTHING
                ",
            )
            .bind(Uuid::new_v4())
            .bind(document_id)
            .bind(user_id)
            .bind(&chunk.content)
            .bind(&chunk.context)
            .bind(chunk.chunk_index)
            .bind(&chunk.metadata)
            .bind(chunk.embedding_type.to_string())
            .bind(&chunk.text_embedding)
            .bind(&chunk.multimodal_embedding)
            .execute(&mut *tx)
            .await
            .map_db_err(&operation)?;

            inserted = inserted.saturating_add(result.rows_affected());
        }

        sqlx::query(
            r"
            UPDATE documents
            SET state = 'completed', stage = 'completed', error = NULL, updated_at = NOW()
            WHERE id = $1 AND state IN ('pending', 'processing')
            ",
        )
        .bind(document_id)
        .execute(&mut *tx)
        .await
        .map_db_err(&operation)?;

        tx.commit().await.map_db_err(&operation)?;

        tracing::debug!(
            document_id = %document_id,
            inserted,
            total = chunks.len(),
            "Committed chunk batch"
        );

        Ok(inserted)
    }

    async fn mark_failed(&self, document_id: Uuid, error: &str) -> DatabaseResult<()> {
        let operation = DatabaseOperation::UpdateDocumentState {
            document_id: document_id.to_string(),
        };

        let mut tx = self.pool.begin().await.map_db_err(&operation)?;

        // A failed document owns no chunks; sweep anything a partial attempt wrote.
        sqlx::query("DELETE FROM chunks WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_db_err(&DatabaseOperation::DeleteChunks {
                document_id: document_id.to_string(),
            })?;

        sqlx::query(
            r"
            UPDATE documents
            SET state = 'failed', stage = 'failed', error = $2, updated_at = NOW()
            WHERE id = $1 AND state IN ('pending', 'processing')
            ",
        )
        .bind(document_id)
        .bind(error)
        .execute(&mut *tx)
        .await
        .map_db_err(&operation)?;

        tx.commit().await.map_db_err(&operation)?;

        Ok(())
    }

    async fn count_chunks(&self, document_id: Uuid) -> DatabaseResult<i64> {
        let operation = DatabaseOperation::CountChunks {
            document_id: document_id.to_string(),
        };

        let row = sqlx::query("SELECT COUNT(*) AS count FROM chunks WHERE document_id = $1")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
            .map_db_err(&operation)?;

        Ok(row.get("count"))
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
        self.vector_search("text_embedding", user_id, query, limit, mime_types)
            .await
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
        self.vector_search("multimodal_embedding", user_id, query, limit, mime_types)
            .await
    }

    async fn is_ready(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
