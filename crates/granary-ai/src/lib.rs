//! Managed AI service clients for granary
//!
//! Four seams behind traits: 768-d text embeddings, 1408-d multimodal
//! embeddings, vision descriptions, and Gemini-family transcription. The
//! REST client talks JSON predict/generateContent; the mock is deterministic.

pub mod client;
pub mod error;
pub mod retry;
pub mod traits;

pub mod mock;
pub use mock::{MockAiService, deterministic_embedding};

pub use client::ManagedAiClient;
pub use error::{AiError, AiResult};
pub use retry::{RetryConfig, retry_with_backoff};
pub use traits::{
    MediaKind, MultimodalEmbedder, TextEmbedder, Transcriber, Transcription, VisionDescriber,
    truncate_to_tokens,
};
