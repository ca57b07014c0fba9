//! Image pipeline: describe, dual-embed, one chunk
//!
//! The stored `content` is the AI description, never the filename. When the
//! description call fails, a structured placeholder keeps the image
//! retrievable by filename and the failure lands in metadata.

use granary_ai::{MediaKind, MultimodalEmbedder, TextEmbedder, VisionDescriber};
use granary_chunk_data::{EmbeddingType, ImageChunkMetadata, NewChunk};
use pgvector::Vector;

use crate::classify::MediaClass;
use crate::error::{ProcessingError, ProcessingResult};
use crate::pipeline::PipelineContext;
use crate::progress::stages;

/// Process an image into exactly one dual-embedded chunk
pub async fn process(ctx: &PipelineContext<'_>) -> ProcessingResult<Vec<NewChunk>> {
    ctx.reporter.stage(stages::DESCRIBING_IMAGE, None).await;

    let mime = MediaClass::image_mime_for(&ctx.document.object_key);
    let format = mime.trim_start_matches("image/").to_string();

    let (content, description_error) = match ctx
        .deps
        .describer
        .describe_image(ctx.local_path, &mime)
        .await
    {
        Ok(description) => (description, None),
        Err(e) => {
            tracing::warn!(
                document_id = %ctx.document.id,
                error = %e,
                "Image description failed, storing placeholder"
            );
            (
                format!(
                    "Image file {} ({format}); automatic description unavailable.",
                    ctx.document.filename
                ),
                Some(e.to_string()),
            )
        }
    };

    ctx.reporter.stage(stages::GENERATING_EMBEDDINGS, None).await;

    let text_embed_input = [content.as_str()];
    let (text_result, multimodal_result) = tokio::join!(
        ctx.deps.text_embedder.embed(&text_embed_input),
        ctx.deps
            .multimodal_embedder
            .embed_media(ctx.local_path, MediaKind::Image, Some(&content)),
    );

    let text_embedding = text_result
        .map_err(|e| ProcessingError::Embedding(e.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| ProcessingError::Embedding("empty text embedding batch".into()))?;
    let multimodal_embedding =
        multimodal_result.map_err(|e| ProcessingError::Embedding(e.to_string()))?;

    let metadata = ImageChunkMetadata {
        source_filename: ctx.document.filename.clone(),
        width: None,
        height: None,
        format,
        description_model: ctx.deps.describer.model_name().to_string(),
        description_error,
    };

    Ok(vec![NewChunk {
        content,
        context: None,
        chunk_index: 0,
        metadata: serde_json::to_value(&metadata)
            .map_err(|e| ProcessingError::Validation(e.to_string()))?,
        embedding_type: EmbeddingType::Multimodal,
        text_embedding: Some(Vector::from(text_embedding)),
        multimodal_embedding: Some(Vector::from(multimodal_embedding)),
    }])
}
