//! REST clients for the managed AI endpoints
//!
//! One client covers all four seams: text embeddings, multimodal embeddings,
//! vision descriptions, and transcription. Calls are plain JSON predict /
//! generateContent requests over reqwest with bearer auth and bounded retry.

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use granary_config::AiConfig;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;

use crate::error::{AiError, AiResult};
use crate::retry::{RetryConfig, retry_with_backoff};
use crate::traits::{
    MediaKind, MultimodalEmbedder, TextEmbedder, Transcriber, Transcription, VisionDescriber,
    truncate_to_tokens,
};

const DESCRIBE_IMAGE_PROMPT: &str = "Describe this image in dense natural language for retrieval: \
    objects, scene, any visible text, composition, and notable context. \
    Respond with the description only.";

const DESCRIBE_SEGMENT_PROMPT: &str = "Describe the visual content of this video segment in dense \
    natural language for retrieval: what is shown, any on-screen text or slides, scene changes. \
    Respond with the description only.";

const TRANSCRIBE_PROMPT: &str = "Transcribe the speech in this media. Respond with JSON only: \
    {\"transcript\": \"...\", \"language\": \"<bcp-47>\", \"confidence\": <0..1>}. \
    Use an empty transcript string if there is no audible speech.";

/// Client for the managed AI service
///
/// Cheap to clone behind an `Arc`; holds one connection pool for every
/// endpoint it talks to.
pub struct ManagedAiClient {
    client: reqwest::Client,
    config: AiConfig,
    retry: RetryConfig,
    access_token: Option<String>,
}

impl ManagedAiClient {
    /// Build a client from configuration
    ///
    /// The project-scoped credential is read from `GRANARY_AI_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(config: AiConfig) -> AiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AiError::Http(e.to_string()))?;

        let retry = RetryConfig::default().with_max_attempts(config.retry_attempts.max(1) as u32);

        Ok(Self {
            client,
            config,
            retry,
            access_token: std::env::var("GRANARY_AI_TOKEN").ok(),
        })
    }

    fn model_url(&self, model: &str, verb: &str) -> String {
        format!(
            "{}/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.config.endpoint_base(),
            self.config.project,
            self.config.region,
            model,
            verb
        )
    }

    async fn post_json(&self, url: &str, body: &Value) -> AiResult<Value> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AiError::Http(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AiError::Auth(format!("status {status}")));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))
    }

    async fn generate_text(&self, parts: Vec<Value>) -> AiResult<String> {
        let url = self.model_url(&self.config.generation_model, "generateContent");
        let body = json!({
            "contents": [{ "role": "user", "parts": parts }]
        });

        let response = retry_with_backoff(&self.retry, || self.post_json(&url, &body)).await?;

        let text: String = response["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AiError::Parse("empty generation response".to_string()));
        }
        Ok(text)
    }

    async fn media_part(path: &Path, mime_type: &str) -> AiResult<Value> {
        let bytes = tokio::fs::read(path).await?;
        Ok(json!({
            "inlineData": {
                "mimeType": mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(bytes)
            }
        }))
    }

    fn check_dimensions(&self, vector: &[f32], expected: usize) -> AiResult<()> {
        if vector.len() == expected {
            Ok(())
        } else {
            Err(AiError::DimensionMismatch {
                expected,
                actual: vector.len(),
            })
        }
    }

    fn parse_vector(value: &Value) -> Option<Vec<f32>> {
        value.as_array().map(|values| {
            values
                .iter()
                .filter_map(Value::as_f64)
                .map(|v| v as f32)
                .collect()
        })
    }

    async fn multimodal_predict(&self, instance: Value) -> AiResult<Vec<f32>> {
        let url = self.model_url(&self.config.multimodal_embedding_model, "predict");
        let body = json!({
            "instances": [instance],
            "parameters": { "dimension": self.config.multimodal_embedding_dimensions }
        });

        let response = retry_with_backoff(&self.retry, || self.post_json(&url, &body)).await?;
        let prediction = &response["predictions"][0];

        let vector = Self::parse_vector(&prediction["imageEmbedding"])
            .or_else(|| Self::parse_vector(&prediction["videoEmbeddings"][0]["embedding"]))
            .or_else(|| Self::parse_vector(&prediction["textEmbedding"]))
            .ok_or_else(|| AiError::Parse("no embedding in prediction".to_string()))?;

        self.check_dimensions(&vector, self.config.multimodal_embedding_dimensions)?;
        Ok(vector)
    }
}

#[async_trait]
impl TextEmbedder for ManagedAiClient {
    async fn embed(&self, texts: &[&str]) -> AiResult<Vec<Vec<f32>>> {
        let url = self.model_url(&self.config.text_embedding_model, "predict");
        let instances: Vec<Value> = texts.iter().map(|t| json!({ "content": t })).collect();
        let body = json!({ "instances": instances });

        let response = retry_with_backoff(&self.retry, || self.post_json(&url, &body)).await?;

        let predictions = response["predictions"]
            .as_array()
            .ok_or_else(|| AiError::Parse("missing predictions".to_string()))?;

        let mut vectors = Vec::with_capacity(predictions.len());
        for prediction in predictions {
            let vector = Self::parse_vector(&prediction["embeddings"]["values"])
                .ok_or_else(|| AiError::Parse("missing embedding values".to_string()))?;
            self.check_dimensions(&vector, self.config.text_embedding_dimensions)?;
            vectors.push(vector);
        }

        if vectors.len() != texts.len() {
            return Err(AiError::Parse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.config.text_embedding_dimensions
    }

    async fn is_ready(&self) -> bool {
        self.access_token.is_some() || self.config.endpoint_override.is_some()
    }
}

#[async_trait]
impl MultimodalEmbedder for ManagedAiClient {
    async fn embed_media(
        &self,
        media_path: &Path,
        kind: MediaKind,
        contextual_text: Option<&str>,
    ) -> AiResult<Vec<f32>> {
        let bytes = tokio::fs::read(media_path).await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

        let mut instance = match kind {
            MediaKind::Image => json!({ "image": { "bytesBase64Encoded": encoded } }),
            MediaKind::Video | MediaKind::Audio => {
                json!({ "video": { "bytesBase64Encoded": encoded } })
            }
        };
        if let Some(text) = contextual_text {
            let snippet = truncate_to_tokens(text, self.config.multimodal_context_token_limit);
            if !snippet.is_empty() {
                instance["text"] = json!(snippet);
            }
        }

        self.multimodal_predict(instance).await
    }

    async fn embed_text(&self, text: &str) -> AiResult<Vec<f32>> {
        self.multimodal_predict(json!({ "text": text })).await
    }

    fn dimensions(&self) -> usize {
        self.config.multimodal_embedding_dimensions
    }

    async fn is_ready(&self) -> bool {
        self.access_token.is_some() || self.config.endpoint_override.is_some()
    }
}

#[async_trait]
impl VisionDescriber for ManagedAiClient {
    async fn describe_image(&self, image_path: &Path, mime_type: &str) -> AiResult<String> {
        let parts = vec![
            Self::media_part(image_path, mime_type).await?,
            json!({ "text": DESCRIBE_IMAGE_PROMPT }),
        ];
        self.generate_text(parts).await
    }

    async fn describe_segment(&self, segment_path: &Path, mime_type: &str) -> AiResult<String> {
        let parts = vec![
            Self::media_part(segment_path, mime_type).await?,
            json!({ "text": DESCRIBE_SEGMENT_PROMPT }),
        ];
        self.generate_text(parts).await
    }

    fn model_name(&self) -> &str {
        &self.config.generation_model
    }

    async fn is_ready(&self) -> bool {
        self.access_token.is_some() || self.config.endpoint_override.is_some()
    }
}

#[async_trait]
impl Transcriber for ManagedAiClient {
    async fn transcribe(&self, media_path: &Path, mime_type: &str) -> AiResult<Transcription> {
        let parts = vec![
            Self::media_part(media_path, mime_type).await?,
            json!({ "text": TRANSCRIBE_PROMPT }),
        ];
        let raw = self.generate_text(parts).await?;

        Ok(parse_transcription(&raw, &self.config.generation_model))
    }

    async fn is_ready(&self) -> bool {
        self.access_token.is_some() || self.config.endpoint_override.is_some()
    }
}

/// Parse the model's transcription reply
///
/// The model is asked for JSON; replies that aren't valid JSON are treated
/// as the transcript itself so a chatty model never fails the call.
fn parse_transcription(raw: &str, model: &str) -> Transcription {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);

    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        let text = value["transcript"].as_str().unwrap_or_default().to_string();
        #[allow(clippy::cast_possible_truncation)]
        let confidence = value["confidence"].as_f64().unwrap_or(0.0) as f32;
        return Transcription {
            text,
            language: value["language"].as_str().unwrap_or("und").to_string(),
            confidence,
            model: model.to_string(),
            timestamp: Utc::now(),
        };
    }

    Transcription {
        text: trimmed.to_string(),
        language: "und".to_string(),
        confidence: 0.0,
        model: model.to_string(),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: &str) -> AiConfig {
        let mut config = AiConfig::from_env();
        config.project = "test-project".to_string();
        config.endpoint_override = Some(endpoint.to_string());
        config
    }

    #[tokio::test]
    async fn text_embedding_round_trip() {
        let server = MockServer::start().await;
        let values: Vec<f32> = vec![0.25; 768];
        Mock::given(method("POST"))
            .and(path_regex(r".*text-embedding-005:predict$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{ "embeddings": { "values": values } }]
            })))
            .mount(&server)
            .await;

        let client = ManagedAiClient::new(test_config(&server.uri())).unwrap();
        let vectors = client.embed(&["hello world"]).await.unwrap();

        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), 768);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{ "embeddings": { "values": [0.1, 0.2, 0.3] } }]
            })))
            .mount(&server)
            .await;

        let client = ManagedAiClient::new(test_config(&server.uri())).unwrap();
        let err = client.embed(&["hello"]).await.unwrap_err();

        assert!(matches!(err, AiError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        let values: Vec<f32> = vec![0.5; 768];
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{ "embeddings": { "values": values } }]
            })))
            .mount(&server)
            .await;

        let client = ManagedAiClient::new(test_config(&server.uri())).unwrap();
        let vectors = client.embed(&["retry me"]).await.unwrap();
        assert_eq!(vectors[0].len(), 768);
    }

    #[test]
    fn transcription_json_reply_is_parsed() {
        let parsed = parse_transcription(
            r#"{"transcript": "hello world", "language": "en", "confidence": 0.94}"#,
            "gemini-2.0-flash",
        );
        assert_eq!(parsed.text, "hello world");
        assert_eq!(parsed.language, "en");
        assert!((parsed.confidence - 0.94).abs() < f32::EPSILON);
    }

    #[test]
    fn transcription_fenced_json_is_parsed() {
        let parsed = parse_transcription(
            "```json\n{\"transcript\": \"hi\", \"language\": \"en\", \"confidence\": 1.0}\n```",
            "gemini-2.0-flash",
        );
        assert_eq!(parsed.text, "hi");
    }

    #[test]
    fn transcription_plain_reply_becomes_transcript() {
        let parsed = parse_transcription("just some words", "gemini-2.0-flash");
        assert_eq!(parsed.text, "just some words");
        assert_eq!(parsed.language, "und");
    }
}
