//! Media dispatcher: the per-job state machine
//!
//! Downloads the object into a job-scoped temp directory, classifies it,
//! enforces resource limits, runs the matching pipeline, and commits the
//! resulting chunks in one logical write. The temp directory is dropped on
//! every exit path, including cancellation, so no job leaks files.

use async_trait::async_trait;
use granary_common::CorrelationId;
use granary_chunk_data::{DocumentRepository, DocumentState};
use granary_config::ProcessingConfig;
use granary_object_store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::classify::MediaClass;
use crate::error::{ProcessingError, ProcessingResult};
use crate::pipeline::{PipelineContext, PipelineDeps, StageReporter, audio, document, image, video};
use crate::progress::{Progress, stages};

/// Task envelope handed to the processor by the durable queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub document_id: Uuid,
    pub object_key: String,
    pub mime_type: String,
    pub size: i64,
    pub attempt: u32,
}

/// Stage reporter persisting labels to the document row
///
/// Progress percent is derived state: it lives here for the job's lifetime
/// and is logged, never stored.
struct RepoReporter {
    repository: Arc<dyn DocumentRepository>,
    document_id: Uuid,
    progress: Mutex<Progress>,
}

#[async_trait]
impl StageReporter for RepoReporter {
    async fn stage(&self, stage: &str, work: Option<(usize, usize)>) {
        let percent = self
            .progress
            .lock()
            .map(|mut p| p.report(stage, work))
            .unwrap_or(0);

        tracing::debug!(
            document_id = %self.document_id,
            stage,
            percent,
            "Stage transition"
        );

        if let Err(e) = self.repository.update_stage(self.document_id, stage).await {
            tracing::warn!(
                document_id = %self.document_id,
                stage,
                error = %e,
                "Stage update failed"
            );
        }
    }
}

/// Orchestrates one processing job end to end
pub struct MediaDispatcher {
    repository: Arc<dyn DocumentRepository>,
    object_store: Arc<dyn ObjectStore>,
    deps: PipelineDeps,
    config: ProcessingConfig,
}

impl MediaDispatcher {
    /// Create a dispatcher over the shared clients
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        object_store: Arc<dyn ObjectStore>,
        deps: PipelineDeps,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            repository,
            object_store,
            deps,
            config,
        }
    }

    /// Run one task to completion
    ///
    /// On success the document is `completed` with all chunks committed.
    /// Errors propagate to the caller, which owns the `failed` transition.
    ///
    /// # Errors
    ///
    /// Returns the first pipeline error; see [`ProcessingError`] for the
    /// retriable/terminal split.
    pub async fn process(&self, task: &TaskEnvelope) -> ProcessingResult<()> {
        // Same (document, attempt) as the dispatcher's enqueue line, so the
        // two services' logs join on this id.
        let correlation_id = CorrelationId::for_job(task.document_id, task.attempt);
        tracing::info!(
            correlation_id = %correlation_id,
            document_id = %task.document_id,
            attempt = task.attempt,
            "Job started"
        );

        let document = self
            .repository
            .get_document(task.document_id)
            .await?
            .ok_or_else(|| {
                ProcessingError::Validation(format!("unknown document {}", task.document_id))
            })?;

        // Redelivery of an already-completed task is a no-op success.
        if document.state == DocumentState::Completed {
            tracing::info!(
                document_id = %document.id,
                attempt = task.attempt,
                "Document already completed, acknowledging redelivery"
            );
            return Ok(());
        }

        if document.object_key != task.object_key {
            return Err(ProcessingError::Validation(format!(
                "task object key {} does not match document {}",
                task.object_key, document.object_key
            )));
        }

        let reporter = RepoReporter {
            repository: Arc::clone(&self.repository),
            document_id: document.id,
            progress: Mutex::new(Progress::new()),
        };

        self.repository
            .mark_processing(document.id, stages::DOWNLOADING)
            .await?;
        reporter.stage(stages::DOWNLOADING, None).await;

        // Job-scoped scratch space; drop removes it on every exit path.
        let work_dir = tempfile::tempdir()?;
        let local_path = self
            .object_store
            .download(&task.object_key, work_dir.path())
            .await?;

        reporter.stage(stages::CLASSIFYING, None).await;
        let class = MediaClass::detect(&document.mime_type, &document.object_key)
            .ok_or_else(|| ProcessingError::UnsupportedMediaType(document.mime_type.clone()))?;

        self.enforce_size_limits(class, document.size_bytes)?;

        tracing::info!(
            document_id = %document.id,
            media_class = %class,
            size_bytes = document.size_bytes,
            "Dispatching to pipeline"
        );

        let ctx = PipelineContext {
            document: &document,
            local_path: &local_path,
            work_dir: work_dir.path(),
            config: &self.config,
            deps: &self.deps,
            reporter: &reporter,
        };

        let chunks = match class {
            MediaClass::Document => document::process(&ctx).await?,
            MediaClass::Image => image::process(&ctx).await?,
            MediaClass::Audio => audio::process(&ctx).await?,
            MediaClass::Video => video::process(&ctx).await?,
        };

        if chunks.is_empty() {
            return Err(ProcessingError::Validation(format!(
                "pipeline produced no chunks for {}",
                document.filename
            )));
        }

        reporter.stage(stages::STORING, None).await;
        self.repository
            .commit_chunks(document.id, document.user_id, &chunks)
            .await?;
        reporter.stage(stages::COMPLETED, None).await;

        tracing::info!(
            correlation_id = %correlation_id,
            document_id = %document.id,
            chunks = chunks.len(),
            "Processing completed"
        );

        Ok(())
    }

    fn enforce_size_limits(&self, class: MediaClass, size_bytes: i64) -> ProcessingResult<()> {
        #[allow(clippy::cast_sign_loss)]
        let size = size_bytes.max(0) as u64;
        match class {
            MediaClass::Document if size > self.config.doc_max_bytes => {
                Err(ProcessingError::ResourceLimit(format!(
                    "document size {size} exceeds limit of {}",
                    self.config.doc_max_bytes
                )))
            }
            MediaClass::Image if size > self.config.image_max_bytes => {
                Err(ProcessingError::ResourceLimit(format!(
                    "image size {size} exceeds limit of {}",
                    self.config.image_max_bytes
                )))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::MockTranscoder;
    use chrono::Utc;
    use granary_ai::MockAiService;
    use granary_chunk_data::{Document, MockDocumentRepository};
    use granary_object_store::MockObjectStore;

    fn seeded(
        filename: &str,
        mime: &str,
        size: i64,
        bytes: &[u8],
        duration: f64,
    ) -> (MediaDispatcher, Arc<MockDocumentRepository>, Document) {
        let repository = Arc::new(MockDocumentRepository::new());
        let object_store = Arc::new(MockObjectStore::new());
        let ai = Arc::new(MockAiService::new());

        let document = Document {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            filename: filename.to_string(),
            object_key: format!("uploads/{filename}"),
            mime_type: mime.to_string(),
            size_bytes: size,
            state: DocumentState::Pending,
            stage: "pending".to_string(),
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        repository.insert_document(document.clone());
        object_store.put(&document.object_key, bytes.to_vec());

        let deps = PipelineDeps {
            text_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::TextEmbedder>,
            multimodal_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::MultimodalEmbedder>,
            describer: Arc::clone(&ai) as Arc<dyn granary_ai::VisionDescriber>,
            transcriber: ai as Arc<dyn granary_ai::Transcriber>,
            transcoder: Arc::new(MockTranscoder::with_duration(duration)),
        };
        let dispatcher = MediaDispatcher::new(
            Arc::clone(&repository) as Arc<dyn DocumentRepository>,
            object_store,
            deps,
            ProcessingConfig::from_env(),
        );
        (dispatcher, repository, document)
    }

    fn task_for(document: &Document) -> TaskEnvelope {
        TaskEnvelope {
            document_id: document.id,
            object_key: document.object_key.clone(),
            mime_type: document.mime_type.clone(),
            size: document.size_bytes,
            attempt: 0,
        }
    }

    #[tokio::test]
    async fn text_document_completes_with_chunks() {
        let (dispatcher, repository, document) = seeded(
            "notes.txt",
            "text/plain",
            64,
            b"Quarterly revenue grew twelve percent over the prior period.",
            0.0,
        );

        dispatcher.process(&task_for(&document)).await.unwrap();

        let row = repository.document(document.id).unwrap();
        assert_eq!(row.state, DocumentState::Completed);
        assert_eq!(row.stage, "completed");
        assert!(repository.count_chunks(document.id).await.unwrap() >= 1);
    }

    #[tokio::test]
    async fn video_produces_segment_chunks() {
        let (dispatcher, repository, document) =
            seeded("talk.mp4", "video/mp4", 1024, b"fake mp4", 75.0);

        dispatcher.process(&task_for(&document)).await.unwrap();

        let chunks = repository.chunks_for(document.id);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.text_embedding.is_some()
            && c.multimodal_embedding.is_some()));
    }

    #[tokio::test]
    async fn completed_document_redelivery_is_noop() {
        let (dispatcher, repository, document) = seeded(
            "notes.txt",
            "text/plain",
            32,
            b"Short note for the archive.",
            0.0,
        );

        dispatcher.process(&task_for(&document)).await.unwrap();
        let count_after_first = repository.count_chunks(document.id).await.unwrap();

        dispatcher.process(&task_for(&document)).await.unwrap();
        assert_eq!(
            repository.count_chunks(document.id).await.unwrap(),
            count_after_first
        );
        assert_eq!(
            repository.document(document.id).unwrap().state,
            DocumentState::Completed
        );
    }

    #[tokio::test]
    async fn unsupported_type_is_a_validation_failure() {
        let (dispatcher, _repository, document) = seeded(
            "archive.zip",
            "application/zip",
            128,
            b"PK...",
            0.0,
        );

        let err = dispatcher.process(&task_for(&document)).await.unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedMediaType(_)));
    }

    #[tokio::test]
    async fn oversize_image_fails_fast() {
        let (dispatcher, _repository, document) = seeded(
            "huge.jpg",
            "image/jpeg",
            64 * 1024 * 1024,
            b"fake jpeg",
            0.0,
        );

        let err = dispatcher.process(&task_for(&document)).await.unwrap_err();
        assert!(matches!(err, ProcessingError::ResourceLimit(_)));
    }

    #[tokio::test]
    async fn mismatched_object_key_is_rejected() {
        let (dispatcher, _repository, document) =
            seeded("notes.txt", "text/plain", 16, b"note", 0.0);

        let mut task = task_for(&document);
        task.object_key = "uploads/other.txt".to_string();
        let err = dispatcher.process(&task).await.unwrap_err();
        assert!(matches!(err, ProcessingError::Validation(_)));
    }
}
