//! Document pipeline: extract, chunk, embed
//!
//! Text chunks carry a 768-d text embedding only; the multimodal column
//! stays null for document media.

use granary_ai::TextEmbedder;
use granary_chunk_data::{DocumentChunkMetadata, EmbeddingType, NewChunk};
use granary_extract::{ChunkerConfig, chunk_text, extract_text};
use pgvector::Vector;

use crate::error::{ProcessingError, ProcessingResult};
use crate::pipeline::PipelineContext;
use crate::progress::stages;

/// Embedding batch size: bounds request payloads without starving throughput
const EMBED_BATCH: usize = 16;

/// Process a text document into embedded chunks
pub async fn process(ctx: &PipelineContext<'_>) -> ProcessingResult<Vec<NewChunk>> {
    ctx.reporter.stage(stages::EXTRACTING, None).await;

    let streamed = ctx.document.size_bytes as u64 > ctx.config.doc_stream_threshold_bytes;
    tracing::debug!(
        document_id = %ctx.document.id,
        streamed,
        "Extracting document text"
    );

    let text = extract_text(ctx.local_path, &ctx.document.mime_type).await?;

    let chunker = ChunkerConfig {
        target_chars: ctx.config.chunk_target_chars,
        overlap_chars: ctx.config.chunk_overlap_chars,
    };
    let text_chunks = chunk_text(&text, &chunker);
    if text_chunks.is_empty() {
        return Err(ProcessingError::Extraction(format!(
            "document {} produced no chunks",
            ctx.document.filename
        )));
    }

    let total = text_chunks.len();
    let mut chunks = Vec::with_capacity(total);

    for (batch_index, batch) in text_chunks.chunks(EMBED_BATCH).enumerate() {
        let done = batch_index.saturating_mul(EMBED_BATCH);
        ctx.reporter
            .stage(&stages::processing_chunk(done, total), Some((done, total)))
            .await;

        let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
        let embeddings = ctx
            .deps
            .text_embedder
            .embed(&texts)
            .await
            .map_err(|e| ProcessingError::Embedding(e.to_string()))?;

        if embeddings.len() != batch.len() {
            return Err(ProcessingError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }

        for (offset, (text_chunk, embedding)) in batch.iter().zip(embeddings).enumerate() {
            let index = done.saturating_add(offset);
            let metadata = DocumentChunkMetadata {
                source_filename: ctx.document.filename.clone(),
                chunk_index: index,
                total_chunks: total,
                char_start: text_chunk.char_start,
                char_end: text_chunk.char_end,
                structure_hint: text_chunk.structure_hint.clone(),
            };

            chunks.push(NewChunk {
                content: text_chunk.content.clone(),
                context: None,
                chunk_index: i32::try_from(index)
                    .map_err(|_| ProcessingError::Validation("chunk index overflow".into()))?,
                metadata: serde_json::to_value(&metadata)
                    .map_err(|e| ProcessingError::Validation(e.to_string()))?,
                embedding_type: EmbeddingType::Text,
                text_embedding: Some(Vector::from(embedding)),
                multimodal_embedding: None,
            });
        }
    }

    ctx.reporter
        .stage(stages::GENERATING_EMBEDDINGS, Some((total, total)))
        .await;

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{NullReporter, PipelineDeps};
    use crate::transcode::MockTranscoder;
    use chrono::Utc;
    use granary_ai::MockAiService;
    use granary_chunk_data::Document;
    use granary_chunk_data::DocumentState;
    use granary_config::ProcessingConfig;
    use std::sync::Arc;
    use uuid::Uuid;

    fn deps() -> PipelineDeps {
        let ai = Arc::new(MockAiService::new());
        PipelineDeps {
            text_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::TextEmbedder>,
            multimodal_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::MultimodalEmbedder>,
            describer: Arc::clone(&ai) as Arc<dyn granary_ai::VisionDescriber>,
            transcriber: ai as Arc<dyn granary_ai::Transcriber>,
            transcoder: Arc::new(MockTranscoder::with_duration(0.0)),
        }
    }

    fn document(filename: &str, mime: &str, size: i64) -> Document {
        Document {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            filename: filename.to_string(),
            object_key: format!("uploads/{filename}"),
            mime_type: mime.to_string(),
            size_bytes: size,
            state: DocumentState::Processing,
            stage: "downloading".to_string(),
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn short_document_yields_one_text_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "A short note about quarterly revenue.").unwrap();

        let deps = deps();
        let doc = document("notes.txt", "text/plain", 37);
        let config = ProcessingConfig::from_env();
        let ctx = PipelineContext {
            document: &doc,
            local_path: &path,
            work_dir: dir.path(),
            config: &config,
            deps: &deps,
            reporter: &NullReporter,
        };

        let chunks = process(&ctx).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].embedding_type, EmbeddingType::Text);
        assert_eq!(chunks[0].text_embedding.as_ref().unwrap().as_slice().len(), 768);
        assert!(chunks[0].multimodal_embedding.is_none());
        assert_eq!(chunks[0].metadata["char_start"], 0);
        assert_eq!(chunks[0].metadata["char_end"], 37);
    }

    #[tokio::test]
    async fn long_document_yields_contiguous_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let paragraph = "Revenue grew steadily across the quarter. \
            Costs were flat and margins improved.\n\n";
        std::fs::write(&path, paragraph.repeat(60)).unwrap();

        let deps = deps();
        let doc = document("report.txt", "text/plain", 4800);
        let config = ProcessingConfig::from_env();
        let ctx = PipelineContext {
            document: &doc,
            local_path: &path,
            work_dir: dir.path(),
            config: &config,
            deps: &deps,
            reporter: &NullReporter,
        };

        let chunks = process(&ctx).await.unwrap();
        assert!(chunks.len() >= 4);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as i32);
            assert_eq!(chunk.metadata["total_chunks"], chunks.len());
        }
    }

    #[tokio::test]
    async fn embedding_failure_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "some text").unwrap();

        let ai = Arc::new(MockAiService::new());
        ai.fail_text_embeddings(true);
        let deps = PipelineDeps {
            text_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::TextEmbedder>,
            multimodal_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::MultimodalEmbedder>,
            describer: Arc::clone(&ai) as Arc<dyn granary_ai::VisionDescriber>,
            transcriber: ai as Arc<dyn granary_ai::Transcriber>,
            transcoder: Arc::new(MockTranscoder::with_duration(0.0)),
        };
        let doc = document("notes.txt", "text/plain", 9);
        let config = ProcessingConfig::from_env();
        let ctx = PipelineContext {
            document: &doc,
            local_path: &path,
            work_dir: dir.path(),
            config: &config,
            deps: &deps,
            reporter: &NullReporter,
        };

        let err = process(&ctx).await.unwrap_err();
        assert!(matches!(err, ProcessingError::Embedding(_)));
    }
}
