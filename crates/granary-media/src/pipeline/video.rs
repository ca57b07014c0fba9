//! Video pipeline: probe, segment, transcribe + describe, dual-embed
//!
//! Segments are cut sequentially (concurrent transcoder runs contend on the
//! input file); within a segment, transcription and visual description run
//! in parallel, then both embeddings run in parallel. Every chunk carries a
//! text embedding of its transcript and a multimodal embedding of its
//! visuals, so transcripts stay searchable lexically and visuals
//! cross-modally.

use granary_ai::{
    MediaKind, MultimodalEmbedder, TextEmbedder, Transcriber, Transcription, VisionDescriber,
};
use granary_chunk_data::{EmbeddingType, NewChunk, TranscriptMetadata, VideoChunkMetadata};
use pgvector::Vector;

use crate::error::{ProcessingError, ProcessingResult};
use crate::pipeline::{NO_AUDIO_PLACEHOLDER, PipelineContext};
use crate::progress::stages;
use crate::transcode::Transcoder;

/// Process a video into one dual-embedded chunk per fixed-length segment
pub async fn process(ctx: &PipelineContext<'_>) -> ProcessingResult<Vec<NewChunk>> {
    let duration = ctx
        .deps
        .transcoder
        .probe_duration(ctx.local_path)
        .await?;
    if duration <= 0.0 {
        return Err(ProcessingError::Validation(format!(
            "video {} has no measurable duration",
            ctx.document.filename
        )));
    }

    #[allow(clippy::cast_precision_loss)]
    let max_duration = ctx.config.video_max_duration_sec as f64;
    if duration > max_duration {
        return Err(ProcessingError::ResourceLimit(format!(
            "video duration {duration:.0}s exceeds limit of {max_duration:.0}s"
        )));
    }

    #[allow(clippy::cast_precision_loss)]
    let segment_len = ctx.config.video_segment_len_sec as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total_segments = (duration / segment_len).ceil().max(1.0) as usize;
    if total_segments > ctx.config.video_max_segments {
        return Err(ProcessingError::ResourceLimit(format!(
            "video implies {total_segments} segments, limit is {}",
            ctx.config.video_max_segments
        )));
    }

    tracing::info!(
        document_id = %ctx.document.id,
        duration_sec = duration,
        total_segments,
        "Segmenting video"
    );

    let mut chunks = Vec::with_capacity(total_segments);

    for segment_index in 0..total_segments {
        ctx.reporter
            .stage(
                stages::TRANSCRIBING_VIDEO,
                Some((segment_index, total_segments)),
            )
            .await;

        #[allow(clippy::cast_precision_loss)]
        let start_sec = segment_index as f64 * segment_len;
        let end_sec = (start_sec + segment_len).min(duration);
        let window = end_sec - start_sec;

        let segment_path = ctx.work_dir.join(format!("segment_{segment_index:03}.mp4"));

        // Sequential cut: the transcoder races against itself on one input.
        ctx.deps
            .transcoder
            .cut_segment(ctx.local_path, start_sec, window, &segment_path)
            .await?;

        let result = process_segment(
            ctx,
            &segment_path,
            segment_index,
            total_segments,
            start_sec,
            end_sec,
        )
        .await;

        // The segment file is inside the job's work dir, so the TempDir drop
        // would catch it; eager removal keeps peak disk usage to one segment.
        if let Err(e) = tokio::fs::remove_file(&segment_path).await {
            tracing::warn!(path = %segment_path.display(), error = %e, "Segment cleanup failed");
        }

        chunks.push(result?);
    }

    ctx.reporter
        .stage(
            stages::TRANSCRIBING_VIDEO,
            Some((total_segments, total_segments)),
        )
        .await;

    Ok(chunks)
}

/// Transcribe + describe a segment in parallel, then embed both ways
async fn process_segment(
    ctx: &PipelineContext<'_>,
    segment_path: &std::path::Path,
    segment_index: usize,
    total_segments: usize,
    start_sec: f64,
    end_sec: f64,
) -> ProcessingResult<NewChunk> {
    let (transcription_result, description_result) = tokio::join!(
        ctx.deps.transcriber.transcribe(segment_path, "video/mp4"),
        ctx.deps.describer.describe_segment(segment_path, "video/mp4"),
    );

    // Transcription failure degrades to a failure-note chunk; description
    // failure fails the segment and therefore the job.
    let (content, transcript_metadata) = fold_transcription(
        transcription_result,
        &ctx.document.filename,
        segment_index,
    );
    let visual_context =
        description_result.map_err(|e| ProcessingError::Description(e.to_string()))?;

    let text_embed_input = [content.as_str()];
    let (text_result, multimodal_result) = tokio::join!(
        ctx.deps.text_embedder.embed(&text_embed_input),
        ctx.deps.multimodal_embedder.embed_media(
            segment_path,
            MediaKind::Video,
            Some(&visual_context),
        ),
    );

    let text_embedding = text_result
        .map_err(|e| ProcessingError::Embedding(e.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| ProcessingError::Embedding("empty text embedding batch".into()))?;
    let multimodal_embedding =
        multimodal_result.map_err(|e| ProcessingError::Embedding(e.to_string()))?;

    let metadata = VideoChunkMetadata {
        source_filename: ctx.document.filename.clone(),
        segment_index,
        total_segments,
        start_offset_sec: start_sec,
        end_offset_sec: end_sec,
        duration_sec: end_sec - start_sec,
        transcript: transcript_metadata,
    };

    Ok(NewChunk {
        content,
        context: Some(visual_context),
        chunk_index: i32::try_from(segment_index)
            .map_err(|_| ProcessingError::Validation("segment index overflow".into()))?,
        metadata: serde_json::to_value(&metadata)
            .map_err(|e| ProcessingError::Validation(e.to_string()))?,
        embedding_type: EmbeddingType::Multimodal,
        text_embedding: Some(Vector::from(text_embedding)),
        multimodal_embedding: Some(Vector::from(multimodal_embedding)),
    })
}

fn fold_transcription(
    result: Result<Transcription, granary_ai::AiError>,
    filename: &str,
    segment_index: usize,
) -> (String, TranscriptMetadata) {
    match result {
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
                filename,
                segment_index,
                error = %e,
                "Segment transcription failed, storing failure note"
            );
            (
                format!("Transcription unavailable for segment {segment_index} of {filename}: {e}"),
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{NullReporter, PipelineDeps, StageReporter};
    use crate::transcode::MockTranscoder;
    use async_trait::async_trait;
    use chrono::Utc;
    use granary_ai::MockAiService;
    use granary_chunk_data::{Document, DocumentState};
    use granary_config::ProcessingConfig;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    fn deps_with(ai: Arc<MockAiService>, duration: f64) -> PipelineDeps {
        PipelineDeps {
            text_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::TextEmbedder>,
            multimodal_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::MultimodalEmbedder>,
            describer: Arc::clone(&ai) as Arc<dyn granary_ai::VisionDescriber>,
            transcriber: ai as Arc<dyn granary_ai::Transcriber>,
            transcoder: Arc::new(MockTranscoder::with_duration(duration)),
        }
    }

    fn video_document(filename: &str) -> Document {
        Document {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            filename: filename.to_string(),
            object_key: format!("uploads/{filename}"),
            mime_type: "video/mp4".to_string(),
            size_bytes: 10 * 1024 * 1024,
            state: DocumentState::Processing,
            stage: "downloading".to_string(),
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct RecordingReporter {
        stages: Mutex<Vec<(String, Option<(usize, usize)>)>>,
    }

    #[async_trait]
    impl StageReporter for RecordingReporter {
        async fn stage(&self, stage: &str, work: Option<(usize, usize)>) {
            if let Ok(mut stages) = self.stages.lock() {
                stages.push((stage.to_string(), work));
            }
        }
    }

    async fn run(
        duration: f64,
        ai: Arc<MockAiService>,
        reporter: &dyn StageReporter,
    ) -> ProcessingResult<Vec<NewChunk>> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talk.mp4");
        std::fs::write(&path, b"fake mp4 bytes").unwrap();

        let deps = deps_with(ai, duration);
        let doc = video_document("talk.mp4");
        let config = ProcessingConfig::from_env();
        let ctx = PipelineContext {
            document: &doc,
            local_path: &path,
            work_dir: dir.path(),
            config: &config,
            deps: &deps,
            reporter,
        };
        let result = process(&ctx).await;

        // Work dir must hold no segment files on any exit path.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("segment_"))
            .collect();
        assert!(leftovers.is_empty(), "segments not cleaned: {leftovers:?}");

        result
    }

    #[tokio::test]
    async fn seventy_five_seconds_yields_three_segments() {
        let chunks = run(75.0, Arc::new(MockAiService::new()), &NullReporter)
            .await
            .unwrap();

        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as i32);
            assert_eq!(chunk.metadata["segment_index"], i);
            assert_eq!(chunk.metadata["total_segments"], 3);
            assert_eq!(chunk.embedding_type, EmbeddingType::Multimodal);
            assert!(!chunk.content.is_empty());
            assert!(chunk.context.as_ref().is_some_and(|c| !c.is_empty()));
            assert_eq!(chunk.text_embedding.as_ref().unwrap().as_slice().len(), 768);
            assert_eq!(
                chunk.multimodal_embedding.as_ref().unwrap().as_slice().len(),
                1408
            );
        }
        assert_eq!(chunks[2].metadata["start_offset_sec"], 60.0);
        assert_eq!(chunks[2].metadata["end_offset_sec"], 75.0);
    }

    #[tokio::test]
    async fn exact_window_yields_one_segment() {
        let chunks = run(30.0, Arc::new(MockAiService::new()), &NullReporter)
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata["duration_sec"], 30.0);
    }

    #[tokio::test]
    async fn just_over_two_windows_yields_three_segments() {
        let chunks = run(60.5, Arc::new(MockAiService::new()), &NullReporter)
            .await
            .unwrap();
        assert_eq!(chunks.len(), 3);
    }

    #[tokio::test]
    async fn over_limit_duration_is_rejected() {
        let err = run(1200.0, Arc::new(MockAiService::new()), &NullReporter)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::ResourceLimit(_)));
    }

    #[tokio::test]
    async fn description_failure_fails_the_job() {
        let ai = Arc::new(MockAiService::new());
        ai.fail_descriptions(true);
        let err = run(45.0, ai, &NullReporter).await.unwrap_err();
        assert!(matches!(err, ProcessingError::Description(_)));
    }

    #[tokio::test]
    async fn embedding_failure_fails_the_job() {
        let ai = Arc::new(MockAiService::new());
        ai.fail_multimodal_embeddings(true);
        let err = run(45.0, ai, &NullReporter).await.unwrap_err();
        assert!(matches!(err, ProcessingError::Embedding(_)));
    }

    #[tokio::test]
    async fn transcription_failure_degrades_to_failure_note() {
        let ai = Arc::new(MockAiService::new());
        ai.fail_transcriptions(true);
        let chunks = run(45.0, ai, &NullReporter).await.unwrap();

        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.content.contains("Transcription unavailable"));
            assert_eq!(chunk.metadata["transcript"]["has_audio"], false);
            assert!(chunk.text_embedding.is_some());
            assert!(chunk.multimodal_embedding.is_some());
        }
    }

    #[tokio::test]
    async fn progress_work_tuples_advance_monotonically() {
        let reporter = RecordingReporter {
            stages: Mutex::new(Vec::new()),
        };
        run(75.0, Arc::new(MockAiService::new()), &reporter)
            .await
            .unwrap();

        let stages = reporter.stages.lock().unwrap();
        let tuples: Vec<(usize, usize)> = stages.iter().filter_map(|(_, work)| *work).collect();
        assert_eq!(tuples.first(), Some(&(0, 3)));
        assert_eq!(tuples.last(), Some(&(3, 3)));
        for window in tuples.windows(2) {
            assert!(window[1].0 >= window[0].0);
        }
    }
}
