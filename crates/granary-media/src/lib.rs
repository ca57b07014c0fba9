//! Media processing core: classification, pipelines, and the dispatcher
//!
//! Turns a downloaded object into committed chunks: classify by MIME,
//! enforce per-class resource limits, run the matching pipeline (document,
//! image, audio, video), and hand the batch to the chunk store.

pub mod classify;
pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod transcode;

pub use classify::MediaClass;
pub use dispatcher::{MediaDispatcher, TaskEnvelope};
pub use error::{ProcessingError, ProcessingResult};
pub use pipeline::{NO_AUDIO_PLACEHOLDER, NullReporter, PipelineContext, PipelineDeps, StageReporter};
pub use progress::{Progress, stages};
pub use transcode::{FfmpegTranscoder, MockTranscoder, Transcoder};
