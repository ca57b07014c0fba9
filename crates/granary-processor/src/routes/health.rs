//! Health endpoint reporting downstream readiness

use axum::Json;
use axum::extract::State;
use granary_ai::{MultimodalEmbedder, TextEmbedder, Transcriber};
use granary_chunk_data::DocumentRepository;
use serde::Serialize;

use crate::state::AppState;

/// Per-service readiness flags
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub ai_text: bool,
    pub ai_multimodal: bool,
    pub transcription: bool,
    pub chunk_store: bool,
}

/// Health response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_jobs: usize,
    pub services: ServiceHealth,
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (ai_text, ai_multimodal, transcription, chunk_store) = tokio::join!(
        state.text_embedder.is_ready(),
        state.multimodal_embedder.is_ready(),
        state.transcriber.is_ready(),
        state.repository.is_ready(),
    );

    let healthy = ai_text && ai_multimodal && transcription && chunk_store;

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        active_jobs: state.active_jobs(),
        services: ServiceHealth {
            ai_text,
            ai_multimodal,
            transcription,
            chunk_store,
        },
    })
}
