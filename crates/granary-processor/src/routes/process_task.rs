//! Task intake endpoint
//!
//! Accepts a task envelope, takes a concurrency permit, and runs the job in
//! the background. With no permit free the request is rejected with `429
//! busy` so the durable queue performs the re-attempt; nothing is queued
//! in-process.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use chrono::Utc;
use granary_media::TaskEnvelope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::runner::run_job;
use crate::state::{ActiveJob, AppState};

/// `POST /process-task` request body
#[derive(Debug, Deserialize)]
pub struct ProcessTaskRequest {
    pub document_id: Uuid,
    pub object_key: String,
    pub mime_type: String,
    pub size: i64,
    #[serde(default)]
    pub attempt: u32,
}

/// `POST /process-task` response body
#[derive(Debug, Serialize)]
pub struct ProcessTaskResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `POST /process-task`
pub async fn process_task(
    State(state): State<AppState>,
    body: Result<Json<ProcessTaskRequest>, JsonRejection>,
) -> (StatusCode, Json<ProcessTaskResponse>) {
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Malformed task body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ProcessTaskResponse {
                    status: "invalid",
                    message: Some(rejection.to_string()),
                }),
            );
        }
    };

    if request.object_key.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ProcessTaskResponse {
                status: "invalid",
                message: Some("object_key must not be empty".to_string()),
            }),
        );
    }

    // Backpressure: at capacity the queue retries, we never buffer.
    let permit = match state.permits.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::info!(
                document_id = %request.document_id,
                attempt = request.attempt,
                "At concurrency cap, rejecting task"
            );
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ProcessTaskResponse {
                    status: "busy",
                    message: None,
                }),
            );
        }
    };

    let task = TaskEnvelope {
        document_id: request.document_id,
        object_key: request.object_key.clone(),
        mime_type: request.mime_type,
        size: request.size,
        attempt: request.attempt,
    };

    if let Ok(mut jobs) = state.jobs.lock() {
        jobs.insert(
            task.document_id,
            ActiveJob {
                document_id: task.document_id,
                object_key: request.object_key,
                started_at: Utc::now(),
            },
        );
    }

    tracing::info!(
        document_id = %task.document_id,
        attempt = task.attempt,
        "Task accepted"
    );

    tokio::spawn(run_job(state, task, permit));

    (
        StatusCode::OK,
        Json(ProcessTaskResponse {
            status: "accepted",
            message: None,
        }),
    )
}
