//! Audio pipeline: transcribe, embed, one chunk
//!
//! Transcription failure does not fail the job; the chunk records the
//! failure with `has_audio=false` so the file stays retrievable.

use granary_ai::{TextEmbedder, Transcriber};
use granary_chunk_data::{AudioChunkMetadata, EmbeddingType, NewChunk, TranscriptMetadata};
use pgvector::Vector;

use crate::error::{ProcessingError, ProcessingResult};
use crate::pipeline::{NO_AUDIO_PLACEHOLDER, PipelineContext};
use crate::progress::stages;
use crate::transcode::Transcoder;

/// Process an audio file into one transcript chunk
pub async fn process(ctx: &PipelineContext<'_>) -> ProcessingResult<Vec<NewChunk>> {
    let duration = ctx
        .deps
        .transcoder
        .probe_duration(ctx.local_path)
        .await?;
    #[allow(clippy::cast_precision_loss)]
    let max_duration = ctx.config.audio_max_duration_sec as f64;
    if duration > max_duration {
        return Err(ProcessingError::ResourceLimit(format!(
            "audio duration {duration:.0}s exceeds limit of {max_duration:.0}s"
        )));
    }

    ctx.reporter.stage(stages::TRANSCRIBING_AUDIO, None).await;

    let transcript = match ctx
        .deps
        .transcriber
        .transcribe(ctx.local_path, &ctx.document.mime_type)
        .await
    {
        Ok(transcription) => {
            let has_audio = !transcription.text.trim().is_empty();
            let content = if has_audio {
                transcription.text.clone()
            } else {
                NO_AUDIO_PLACEHOLDER.to_string()
            };
            (
                content,
                TranscriptMetadata {
                    language: transcription.language,
                    confidence: transcription.confidence,
                    model: transcription.model,
                    timestamp: transcription.timestamp,
                    has_audio,
                    error: None,
                },
            )
        }
        Err(e) => {
            tracing::warn!(
                document_id = %ctx.document.id,
                error = %e,
                "Audio transcription failed, storing failure chunk"
            );
            (
                format!(
                    "Transcription unavailable for {}: {e}",
                    ctx.document.filename
                ),
                TranscriptMetadata {
                    language: "und".to_string(),
                    confidence: 0.0,
                    model: String::new(),
                    timestamp: chrono::Utc::now(),
                    has_audio: false,
                    error: Some(e.to_string()),
                },
            )
        }
    };
    let (content, transcript_metadata) = transcript;

    ctx.reporter.stage(stages::GENERATING_EMBEDDINGS, None).await;

    let text_embedding = ctx
        .deps
        .text_embedder
        .embed(&[content.as_str()])
        .await
        .map_err(|e| ProcessingError::Embedding(e.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| ProcessingError::Embedding("empty text embedding batch".into()))?;

    let metadata = AudioChunkMetadata {
        source_filename: ctx.document.filename.clone(),
        transcript: transcript_metadata,
    };

    Ok(vec![NewChunk {
        content,
        context: None,
        chunk_index: 0,
        metadata: serde_json::to_value(&metadata)
            .map_err(|e| ProcessingError::Validation(e.to_string()))?,
        embedding_type: EmbeddingType::Text,
        text_embedding: Some(Vector::from(text_embedding)),
        multimodal_embedding: None,
    }])
}
