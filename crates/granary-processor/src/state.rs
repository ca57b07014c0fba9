//! Shared application state for the processor service

use granary_ai::{MultimodalEmbedder, TextEmbedder, Transcriber};
use granary_chunk_data::DocumentRepository;
use granary_media::MediaDispatcher;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// In-memory record of one active processing job
///
/// Created when a task is accepted, removed when the job finishes or fails;
/// nothing here is persisted.
#[derive(Debug, Clone)]
pub struct ActiveJob {
    pub document_id: Uuid,
    pub object_key: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// Registry of in-flight jobs, keyed by document id
pub type JobRegistry = Arc<Mutex<HashMap<Uuid, ActiveJob>>>;

/// Handles shared by every request handler
#[derive(Clone)]
pub struct AppState {
    /// The per-job state machine
    pub dispatcher: Arc<MediaDispatcher>,
    /// Document/chunk store, for failure transitions and health
    pub repository: Arc<dyn DocumentRepository>,
    /// Process-wide concurrency cap; no permits free means `429 busy`
    pub permits: Arc<Semaphore>,
    /// Wall-clock deadline per job
    pub job_deadline: Duration,
    /// In-flight job records
    pub jobs: JobRegistry,
    /// Downstream readiness probes for /health
    pub text_embedder: Arc<dyn TextEmbedder>,
    pub multimodal_embedder: Arc<dyn MultimodalEmbedder>,
    pub transcriber: Arc<dyn Transcriber>,
}

impl AppState {
    /// Number of currently running jobs
    pub fn active_jobs(&self) -> usize {
        self.jobs.lock().map(|jobs| jobs.len()).unwrap_or(0)
    }
}
