//! Event handler: object-finalized event -> durable task
//!
//! Thin by design: resolve the event to a document row, enqueue one task,
//! return well inside the event source's delivery timeout. Media processing
//! happens in the processor under its own deadline.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use granary_chunk_data::{Document, DocumentRepository};
use granary_common::CorrelationId;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::events::StorageEvent;
use crate::queue::{TaskPayload, TaskQueue};

const RESOLVE_INITIAL_BACKOFF_MS: u64 = 200;
const DB_RETRY_ATTEMPTS: usize = 3;

/// Handler state
#[derive(Clone)]
pub struct DispatcherState {
    pub repository: Arc<dyn DocumentRepository>,
    pub queue: Arc<dyn TaskQueue>,
    pub upload_bucket: String,
    pub resolve_attempts: usize,
}

/// Event handler response body
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Build the dispatcher router
pub fn create_router(state: DispatcherState) -> Router {
    Router::new()
        .route("/events", post(handle_event))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "granary-dispatcher"
    }))
}

/// `POST /events`
pub async fn handle_event(
    State(state): State<DispatcherState>,
    body: Result<Json<StorageEvent>, JsonRejection>,
) -> (StatusCode, Json<EventResponse>) {
    // Parse failures are acknowledged: redelivering a malformed event can
    // never succeed.
    let Json(event) = match body {
        Ok(json) => json,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Unparseable storage event, acknowledging");
            return ack("ignored", Some(rejection.to_string()));
        }
    };

    if event.bucket != state.upload_bucket {
        tracing::debug!(
            bucket = %event.bucket,
            "Event for foreign bucket, acknowledging"
        );
        return ack("ignored", None);
    }

    tracing::info!(
        object_key = %event.name,
        event_id = %event.event_id,
        size = event.size,
        "Processing finalized-object event"
    );

    // The upload path writes the document row around the same time the event
    // fires; resolution retries with backoff to absorb that race.
    let document = match resolve_document(&state, &event.name).await {
        Ok(Some(document)) => document,
        Ok(None) => {
            tracing::warn!(
                object_key = %event.name,
                event_id = %event.event_id,
                "No document row for finalized object, acknowledging without enqueue"
            );
            return ack("unmatched", None);
        }
        Err(e) => {
            // Persistent lookup failure: let the event source redeliver.
            tracing::error!(object_key = %event.name, error = %e, "Document lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(EventResponse {
                    status: "error",
                    message: Some(e),
                }),
            );
        }
    };

    let payload = TaskPayload {
        document_id: document.id,
        object_key: document.object_key.clone(),
        mime_type: document.mime_type.clone(),
        size: document.size_bytes,
        attempt: 0,
    };

    match state.queue.enqueue(&payload).await {
        Ok(()) => {
            // The processor derives the same id from (document, attempt).
            let correlation_id = CorrelationId::for_job(document.id, payload.attempt);
            tracing::info!(
                correlation_id = %correlation_id,
                document_id = %document.id,
                object_key = %event.name,
                "Task enqueued"
            );
            ack("enqueued", None)
        }
        Err(e) => {
            tracing::error!(document_id = %document.id, error = %e, "Enqueue failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(EventResponse {
                    status: "error",
                    message: Some(e.to_string()),
                }),
            )
        }
    }
}

const fn ack(status: &'static str, message: Option<String>) -> (StatusCode, Json<EventResponse>) {
    (StatusCode::OK, Json(EventResponse { status, message }))
}

/// Resolve an object key to its document row
///
/// Missing rows are retried with exponential backoff up to the configured
/// attempt cap; database errors are retried a fixed small number of times
/// before giving up with `Err`.
async fn resolve_document(
    state: &DispatcherState,
    object_key: &str,
) -> Result<Option<Document>, String> {
    let mut db_failures = 0usize;
    let mut backoff = Duration::from_millis(RESOLVE_INITIAL_BACKOFF_MS);

    for attempt in 0..state.resolve_attempts.max(1) {
        match state.repository.find_by_object_key(object_key).await {
            Ok(Some(document)) => return Ok(Some(document)),
            Ok(None) => {
                tracing::debug!(
                    object_key,
                    attempt,
                    "Document not yet visible, backing off"
                );
            }
            Err(e) => {
                db_failures = db_failures.saturating_add(1);
                if db_failures >= DB_RETRY_ATTEMPTS {
                    return Err(e.to_string());
                }
                tracing::warn!(object_key, error = %e, "Lookup failed, retrying");
            }
        }

        if attempt.saturating_add(1) < state.resolve_attempts.max(1) {
            tokio::time::sleep(backoff).await;
            backoff = backoff.saturating_mul(2);
        }
    }

    Ok(None)
}
