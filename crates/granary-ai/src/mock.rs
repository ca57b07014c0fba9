//! Deterministic mock AI service for testing
//!
//! Embeddings are derived from the input text so distinct inputs map to
//! distinct directions; identical inputs always agree. Failure toggles let
//! tests drive the degraded search paths and the retry/fallback behavior.

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{AiError, AiResult};
use crate::traits::{
    MediaKind, MultimodalEmbedder, TextEmbedder, Transcriber, Transcription, VisionDescriber,
};

const MOCK_MODEL: &str = "mock-model";

/// Mock implementation of every AI seam
#[derive(Default)]
pub struct MockAiService {
    fail_text_embeddings: AtomicBool,
    fail_multimodal_embeddings: AtomicBool,
    fail_descriptions: AtomicBool,
    fail_transcriptions: AtomicBool,
}

impl MockAiService {
    /// Create a mock that succeeds on every call
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent text embedding calls fail
    pub fn fail_text_embeddings(&self, fail: bool) {
        self.fail_text_embeddings.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent multimodal embedding calls fail
    pub fn fail_multimodal_embeddings(&self, fail: bool) {
        self.fail_multimodal_embeddings
            .store(fail, Ordering::SeqCst);
    }

    /// Make subsequent description calls fail
    pub fn fail_descriptions(&self, fail: bool) {
        self.fail_descriptions.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent transcription calls fail
    pub fn fail_transcriptions(&self, fail: bool) {
        self.fail_transcriptions.store(fail, Ordering::SeqCst);
    }

    fn unavailable() -> AiError {
        AiError::Status {
            status: 503,
            message: "mock failure".to_string(),
        }
    }
}

/// Deterministic embedding of a string: seeded by a byte rollup, normalized
pub fn deterministic_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let mut seed: u64 = 1_469_598_103_934_665_603;
    for byte in text.bytes() {
        seed ^= u64::from(byte);
        seed = seed.wrapping_mul(1_099_511_628_211);
    }

    let mut values = Vec::with_capacity(dimensions);
    let mut state = seed;
    for _ in 0..dimensions {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        #[allow(clippy::cast_precision_loss)]
        let value = ((state >> 33) as f32 / (u32::MAX as f32)) - 0.5;
        values.push(value);
    }

    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut values {
            *value /= norm;
        }
    }
    values
}

#[async_trait]
impl TextEmbedder for MockAiService {
    async fn embed(&self, texts: &[&str]) -> AiResult<Vec<Vec<f32>>> {
        if self.fail_text_embeddings.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(texts
            .iter()
            .map(|t| deterministic_embedding(t, 768))
            .collect())
    }

    fn dimensions(&self) -> usize {
        768
    }

    async fn is_ready(&self) -> bool {
        !self.fail_text_embeddings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MultimodalEmbedder for MockAiService {
    async fn embed_media(
        &self,
        media_path: &Path,
        _kind: MediaKind,
        contextual_text: Option<&str>,
    ) -> AiResult<Vec<f32>> {
        if self.fail_multimodal_embeddings.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        // Seed from the contextual text when present so media embeddings line
        // up with query-side text embeddings of similar wording.
        let seed = contextual_text
            .map(ToString::to_string)
            .unwrap_or_else(|| media_path.display().to_string());
        Ok(deterministic_embedding(&seed, 1408))
    }

    async fn embed_text(&self, text: &str) -> AiResult<Vec<f32>> {
        if self.fail_multimodal_embeddings.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(deterministic_embedding(text, 1408))
    }

    fn dimensions(&self) -> usize {
        1408
    }

    async fn is_ready(&self) -> bool {
        !self.fail_multimodal_embeddings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionDescriber for MockAiService {
    async fn describe_image(&self, image_path: &Path, _mime_type: &str) -> AiResult<String> {
        if self.fail_descriptions.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(format!(
            "A whiteboard covered in handwritten notes and diagrams, photographed indoors ({}).",
            image_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        ))
    }

    async fn describe_segment(&self, segment_path: &Path, _mime_type: &str) -> AiResult<String> {
        if self.fail_descriptions.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(format!(
            "A presenter standing beside a bar chart slide ({}).",
            segment_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        ))
    }

    fn model_name(&self) -> &str {
        MOCK_MODEL
    }

    async fn is_ready(&self) -> bool {
        !self.fail_descriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for MockAiService {
    async fn transcribe(&self, media_path: &Path, _mime_type: &str) -> AiResult<Transcription> {
        if self.fail_transcriptions.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        // File names containing "silent" simulate media with no speech.
        let name = media_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let text = if name.contains("silent") {
            String::new()
        } else {
            format!("spoken words from {name}")
        };
        Ok(Transcription {
            text,
            language: "en".to_string(),
            confidence: 0.9,
            model: MOCK_MODEL.to_string(),
            timestamp: Utc::now(),
        })
    }

    async fn is_ready(&self) -> bool {
        !self.fail_transcriptions.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_are_deterministic_and_normalized() {
        let a = deterministic_embedding("quarterly revenue", 768);
        let b = deterministic_embedding("quarterly revenue", 768);
        let c = deterministic_embedding("cat on a sofa", 768);

        assert_eq!(a, b);
        assert_ne!(a, c);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn failure_toggles_surface_errors() {
        let mock = MockAiService::new();
        assert!(mock.embed(&["ok"]).await.is_ok());
        mock.fail_text_embeddings(true);
        assert!(mock.embed(&["ok"]).await.is_err());
    }
}
