//! Per-media-class processing pipelines
//!
//! Each pipeline turns one downloaded file into an ordered list of chunks
//! with embeddings attached. The dispatcher owns downloads, classification,
//! limits, and the final chunk-store commit.

pub mod audio;
pub mod document;
pub mod image;
pub mod video;

use async_trait::async_trait;
use granary_ai::{MultimodalEmbedder, TextEmbedder, Transcriber, VisionDescriber};
use granary_chunk_data::Document;
use granary_config::ProcessingConfig;
use std::path::Path;
use std::sync::Arc;

use crate::transcode::Transcoder;

/// Placeholder content for media with no audible speech
pub const NO_AUDIO_PLACEHOLDER: &str = "[no audio]";

/// Sink for stage transitions during a job
///
/// Implementations persist the stage label and fold the optional `(done,
/// total)` tuple into the monotonic progress value.
#[async_trait]
pub trait StageReporter: Send + Sync {
    /// Record a stage transition
    async fn stage(&self, stage: &str, work: Option<(usize, usize)>);
}

/// No-op reporter for tests that don't observe stages
pub struct NullReporter;

#[async_trait]
impl StageReporter for NullReporter {
    async fn stage(&self, _stage: &str, _work: Option<(usize, usize)>) {}
}

/// Shared AI and transcoder handles for the pipelines
#[derive(Clone)]
pub struct PipelineDeps {
    pub text_embedder: Arc<dyn TextEmbedder>,
    pub multimodal_embedder: Arc<dyn MultimodalEmbedder>,
    pub describer: Arc<dyn VisionDescriber>,
    pub transcriber: Arc<dyn Transcriber>,
    pub transcoder: Arc<dyn Transcoder>,
}

/// Everything a pipeline needs to process one downloaded file
pub struct PipelineContext<'a> {
    /// The document row being processed
    pub document: &'a Document,
    /// Local path of the downloaded object
    pub local_path: &'a Path,
    /// Job-scoped scratch directory (deleted when the job ends)
    pub work_dir: &'a Path,
    /// Processing limits
    pub config: &'a ProcessingConfig,
    /// AI and transcoder handles
    pub deps: &'a PipelineDeps,
    /// Stage sink
    pub reporter: &'a dyn StageReporter,
}
