//! Wiring of production clients into the application state

use anyhow::{Context, Result};
use granary_ai::ManagedAiClient;
use granary_chunk_data::{DbDocumentRepository, DocumentRepository, initialize_database};
use granary_config::ApplicationConfig;
use granary_media::{FfmpegTranscoder, MediaDispatcher, PipelineDeps};
use granary_object_store::{HttpObjectStore, ObjectStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::state::AppState;

/// Build the full application state from configuration
///
/// # Errors
///
/// Returns an error if the database, object store, or AI clients cannot be
/// initialized
pub async fn build_state(config: &ApplicationConfig) -> Result<AppState> {
    let pool = initialize_database(&config.database)
        .await
        .context("chunk store initialization failed")?;
    let repository: Arc<dyn DocumentRepository> = Arc::new(DbDocumentRepository::new(pool));

    let object_store: Arc<dyn ObjectStore> = Arc::new(
        HttpObjectStore::new(&config.object_store).context("object store client failed")?,
    );

    let ai = Arc::new(ManagedAiClient::new(config.ai.clone()).context("AI client failed")?);

    let deps = PipelineDeps {
        text_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::TextEmbedder>,
        multimodal_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::MultimodalEmbedder>,
        describer: Arc::clone(&ai) as Arc<dyn granary_ai::VisionDescriber>,
        transcriber: Arc::clone(&ai) as Arc<dyn granary_ai::Transcriber>,
        transcoder: Arc::new(FfmpegTranscoder::new()),
    };

    let dispatcher = Arc::new(MediaDispatcher::new(
        Arc::clone(&repository),
        object_store,
        deps,
        config.processing.clone(),
    ));

    Ok(AppState {
        dispatcher,
        repository,
        permits: Arc::new(Semaphore::new(config.processing.max_concurrent_jobs)),
        job_deadline: Duration::from_secs(config.processing.job_deadline_seconds),
        jobs: Arc::new(Mutex::new(HashMap::new())),
        text_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::TextEmbedder>,
        multimodal_embedder: Arc::clone(&ai) as Arc<dyn granary_ai::MultimodalEmbedder>,
        transcriber: ai as Arc<dyn granary_ai::Transcriber>,
    })
}
