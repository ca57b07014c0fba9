//! Domain models for database entities

use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing state of an uploaded document
///
/// Transitions are monotonic along `pending -> processing -> (completed | failed)`;
/// the repository enforces that no transition goes backward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::str::FromStr for DocumentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid document state: {s}")),
        }
    }
}

impl From<String> for DocumentState {
    fn from(s: String) -> Self {
        s.as_str().parse().unwrap_or(Self::Pending)
    }
}

impl std::fmt::Display for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{state}")
    }
}

/// Which retrieval path a chunk primarily serves
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingType {
    Text,
    Multimodal,
}

impl std::str::FromStr for EmbeddingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "multimodal" => Ok(Self::Multimodal),
            _ => Err(format!("Invalid embedding type: {s}")),
        }
    }
}

impl std::fmt::Display for EmbeddingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Multimodal => write!(f, "multimodal"),
        }
    }
}

/// A user-uploaded file tracked through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub object_key: String,
    pub mime_type: String,
    pub size_bytes: i64,
    #[sqlx(try_from = "String")]
    pub state: DocumentState,
    pub stage: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A chunk ready to be persisted, with its embeddings
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub content: String,
    pub context: Option<String>,
    pub chunk_index: i32,
    pub metadata: serde_json::Value,
    pub embedding_type: EmbeddingType,
    pub text_embedding: Option<Vector>,
    pub multimodal_embedding: Option<Vector>,
}

/// One similarity hit from a vector search
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub context: Option<String>,
    pub chunk_index: i32,
    pub metadata: serde_json::Value,
    pub similarity: f32,
}

/// Transcript details recorded in audio and video chunk metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptMetadata {
    pub language: String,
    pub confidence: f32,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub has_audio: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Metadata stored with a document-derived chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunkMetadata {
    pub source_filename: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub char_start: usize,
    pub char_end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure_hint: Option<String>,
}

/// Metadata stored with an image chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageChunkMetadata {
    pub source_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub format: String,
    pub description_model: String,
    /// Populated when the AI description failed and a placeholder was stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_error: Option<String>,
}

/// Metadata stored with an audio chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioChunkMetadata {
    pub source_filename: String,
    pub transcript: TranscriptMetadata,
}

/// Metadata stored with a video segment chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoChunkMetadata {
    pub source_filename: String,
    pub segment_index: usize,
    pub total_segments: usize,
    pub start_offset_sec: f64,
    pub end_offset_sec: f64,
    pub duration_sec: f64,
    pub transcript: TranscriptMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_state_round_trips_through_strings() {
        for state in [
            DocumentState::Pending,
            DocumentState::Processing,
            DocumentState::Completed,
            DocumentState::Failed,
        ] {
            let parsed: DocumentState = state.to_string().parse().expect("parse state");
            assert_eq!(parsed, state);
        }
        assert!("paused".parse::<DocumentState>().is_err());
    }

    #[test]
    fn video_metadata_serializes_expected_shape() {
        let metadata = VideoChunkMetadata {
            source_filename: "talk.mp4".to_string(),
            segment_index: 1,
            total_segments: 3,
            start_offset_sec: 30.0,
            end_offset_sec: 60.0,
            duration_sec: 30.0,
            transcript: TranscriptMetadata {
                language: "en".to_string(),
                confidence: 0.94,
                model: "gemini-2.0-flash".to_string(),
                timestamp: Utc::now(),
                has_audio: true,
                error: None,
            },
        };
        let value = serde_json::to_value(&metadata).expect("serialize");
        assert_eq!(value["segment_index"], 1);
        assert_eq!(value["transcript"]["has_audio"], true);
        assert!(value["transcript"].get("error").is_none());
    }
}
