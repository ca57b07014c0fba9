//! Service-level tests for the event handler

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use granary_chunk_data::{Document, DocumentState, MockDocumentRepository};
use granary_dispatcher::{DispatcherState, MockTaskQueue, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

struct TestHarness {
    router: Router,
    repository: Arc<MockDocumentRepository>,
    queue: Arc<MockTaskQueue>,
}

fn harness() -> TestHarness {
    let repository = Arc::new(MockDocumentRepository::new());
    let queue = Arc::new(MockTaskQueue::new());
    let state = DispatcherState {
        repository: Arc::clone(&repository) as _,
        queue: Arc::clone(&queue) as _,
        upload_bucket: "granary-uploads".to_string(),
        resolve_attempts: 1,
    };
    TestHarness {
        router: create_router(state),
        repository,
        queue,
    }
}

fn seed_document(repository: &MockDocumentRepository, object_key: &str) -> Document {
    let document = Document {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        filename: object_key.rsplit('/').next().unwrap_or(object_key).to_string(),
        object_key: object_key.to_string(),
        mime_type: "application/pdf".to_string(),
        size_bytes: 2048,
        state: DocumentState::Pending,
        stage: "pending".to_string(),
        error: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    repository.insert_document(document.clone());
    document
}

fn event_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/events")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}

#[tokio::test]
async fn matched_event_enqueues_one_task() {
    let harness = harness();
    let document = seed_document(&harness.repository, "uploads/report.pdf");

    let response = harness
        .router
        .oneshot(event_request(&json!({
            "bucket": "granary-uploads",
            "name": "uploads/report.pdf",
            "size": "2048",
            "contentType": "application/pdf",
            "generation": "1722470000000000",
            "eventId": "evt-1"
        })))
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "enqueued");

    let tasks = harness.queue.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].document_id, document.id);
    assert_eq!(tasks[0].object_key, "uploads/report.pdf");
    assert_eq!(tasks[0].mime_type, "application/pdf");
    assert_eq!(tasks[0].attempt, 0);
}

#[tokio::test]
async fn foreign_bucket_events_are_dropped() {
    let harness = harness();
    seed_document(&harness.repository, "uploads/report.pdf");

    let response = harness
        .router
        .oneshot(event_request(&json!({
            "bucket": "someone-elses-bucket",
            "name": "uploads/report.pdf",
            "size": 2048
        })))
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ignored");
    assert!(harness.queue.tasks().is_empty());
}

#[tokio::test]
async fn unmatched_object_is_acked_without_enqueue() {
    let harness = harness();

    let response = harness
        .router
        .oneshot(event_request(&json!({
            "bucket": "granary-uploads",
            "name": "uploads/phantom.pdf",
            "size": 10
        })))
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "unmatched");
    assert!(harness.queue.tasks().is_empty());
}

#[tokio::test]
async fn unparseable_event_is_acknowledged() {
    let harness = harness();

    let response = harness
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/events")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("not json at all"))
                .expect("request builds"),
        )
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ignored");
}

#[tokio::test]
async fn enqueue_failure_returns_500_for_redelivery() {
    let harness = harness();
    seed_document(&harness.repository, "uploads/report.pdf");
    harness.queue.fail(true);

    let response = harness
        .router
        .oneshot(event_request(&json!({
            "bucket": "granary-uploads",
            "name": "uploads/report.pdf",
            "size": 2048
        })))
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
