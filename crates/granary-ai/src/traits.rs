//! Trait abstractions for the managed AI services
//!
//! Four seams: text embeddings, multimodal embeddings, vision description,
//! and transcription. The processor holds them as `Arc<dyn …>` so tests swap
//! in the in-crate mocks.

use crate::error::AiResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Media payload kinds accepted by the multimodal endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

/// Transcript returned by the transcription client
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    /// Natural-language transcript, empty when no speech was detected
    pub text: String,
    /// BCP-47 language tag reported by the model
    pub language: String,
    /// Model-reported confidence in [0, 1]
    pub confidence: f32,
    /// Identifier of the model that produced the transcript
    pub model: String,
    /// When the transcription completed
    pub timestamp: DateTime<Utc>,
}

/// Generator of 768-d text embeddings
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed a batch of texts, one vector per input
    async fn embed(&self, texts: &[&str]) -> AiResult<Vec<Vec<f32>>>;

    /// Dimensionality of the produced vectors
    fn dimensions(&self) -> usize;

    /// Whether the client initialized successfully
    async fn is_ready(&self) -> bool;
}

/// Generator of 1408-d multimodal embeddings
#[async_trait]
pub trait MultimodalEmbedder: Send + Sync {
    /// Embed a media file contextualized by a short text snippet
    ///
    /// `contextual_text` is truncated to the model's token budget before the
    /// call; pass the description or visual context, not the full transcript.
    async fn embed_media(
        &self,
        media_path: &Path,
        kind: MediaKind,
        contextual_text: Option<&str>,
    ) -> AiResult<Vec<f32>>;

    /// Embed plain text into the multimodal vector space (query side)
    async fn embed_text(&self, text: &str) -> AiResult<Vec<f32>>;

    /// Dimensionality of the produced vectors
    fn dimensions(&self) -> usize;

    /// Whether the client initialized successfully
    async fn is_ready(&self) -> bool;
}

/// Multimodal description of images and video segments
#[async_trait]
pub trait VisionDescriber: Send + Sync {
    /// Dense natural-language description of an image
    async fn describe_image(&self, image_path: &Path, mime_type: &str) -> AiResult<String>;

    /// Natural-language description of a video segment's visual content
    async fn describe_segment(&self, segment_path: &Path, mime_type: &str) -> AiResult<String>;

    /// Identifier of the model used for descriptions
    fn model_name(&self) -> &str;

    /// Whether the client initialized successfully
    async fn is_ready(&self) -> bool;
}

/// Audio/video transcription through a multimodal model
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio track of a media file
    ///
    /// Media with no audible speech yields an empty transcript, not an error.
    async fn transcribe(&self, media_path: &Path, mime_type: &str) -> AiResult<Transcription>;

    /// Whether the client initialized successfully
    async fn is_ready(&self) -> bool;
}

/// Truncate contextual text to a whitespace-token budget
///
/// The multimodal embedding model accepts only a short contextual snippet;
/// anything longer is cut at the token limit.
pub fn truncate_to_tokens(text: &str, token_limit: usize) -> String {
    let tokens: Vec<&str> = text.split_whitespace().take(token_limit).collect();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::truncate_to_tokens;

    #[test]
    fn truncation_respects_token_budget() {
        let text = "a b c d e f";
        assert_eq!(truncate_to_tokens(text, 3), "a b c");
        assert_eq!(truncate_to_tokens(text, 32), text);
        assert_eq!(truncate_to_tokens("", 32), "");
    }
}
