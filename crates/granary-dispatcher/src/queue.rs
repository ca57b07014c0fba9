//! Durable task queue client
//!
//! The queue delivers at-least-once with capped exponential retry; the
//! dispatcher only creates tasks. One HTTP implementation talks to the
//! queue's create-task endpoint; the mock records payloads for tests.

use async_trait::async_trait;
use granary_config::QueueConfig;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Task body delivered to the processor (its `/process-task` request)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskPayload {
    pub document_id: Uuid,
    pub object_key: String,
    pub mime_type: String,
    pub size: i64,
    pub attempt: u32,
}

/// Errors from task creation
#[derive(Error, Debug)]
pub enum QueueError {
    /// Queue API transport failure
    #[error("Queue request failed: {0}")]
    Http(String),

    /// Queue API returned a non-success status
    #[error("Queue returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Trait for submitting durable tasks
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Create exactly one task for the payload
    async fn enqueue(&self, payload: &TaskPayload) -> QueueResult<()>;
}

/// HTTP client for the queue's create-task endpoint
pub struct HttpTaskQueue {
    client: reqwest::Client,
    config: QueueConfig,
}

impl HttpTaskQueue {
    /// Build a queue client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| QueueError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl TaskQueue for HttpTaskQueue {
    async fn enqueue(&self, payload: &TaskPayload) -> QueueResult<()> {
        let url = format!(
            "{}/queues/{}/tasks",
            self.config.endpoint.trim_end_matches('/'),
            self.config.queue_name
        );

        // Deadline and retry policy ride along so the queue owns redelivery.
        let body = serde_json::json!({
            "task": {
                "url": self.config.processor_url,
                "dispatch_deadline_seconds": self.config.dispatch_deadline_seconds,
                "max_attempts": self.config.max_attempts,
                "body": payload,
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| QueueError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(QueueError::Status {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(
            document_id = %payload.document_id,
            queue = %self.config.queue_name,
            "Task enqueued"
        );
        Ok(())
    }
}

/// Mock queue recording every enqueued payload
#[derive(Default)]
pub struct MockTaskQueue {
    tasks: Mutex<Vec<TaskPayload>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MockTaskQueue {
    /// Create an empty mock queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads enqueued so far
    pub fn tasks(&self) -> Vec<TaskPayload> {
        self.tasks.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Make subsequent enqueues fail
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskQueue for MockTaskQueue {
    async fn enqueue(&self, payload: &TaskPayload) -> QueueResult<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(QueueError::Status {
                status: 503,
                message: "mock queue failure".to_string(),
            });
        }
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(payload.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> TaskPayload {
        TaskPayload {
            document_id: Uuid::new_v4(),
            object_key: "uploads/a.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 1024,
            attempt: 0,
        }
    }

    #[tokio::test]
    async fn posts_task_to_named_queue() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/queues/granary-processing/tasks"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = QueueConfig::from_env();
        config.endpoint = server.uri();
        let queue = HttpTaskQueue::new(config).expect("client builds");

        queue.enqueue(&payload()).await.expect("enqueue succeeds");
    }

    #[tokio::test]
    async fn queue_errors_are_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut config = QueueConfig::from_env();
        config.endpoint = server.uri();
        let queue = HttpTaskQueue::new(config).expect("client builds");

        let err = queue.enqueue(&payload()).await.unwrap_err();
        assert!(matches!(err, QueueError::Status { status: 500, .. }));
    }
}
