//! Background job execution
//!
//! One spawned task per accepted job, holding a semaphore permit for its
//! lifetime. The deadline is enforced with a timeout that drops the
//! in-flight pipeline future, which releases the job's temp directory, then
//! records the failure. Every exit path updates the document row.

use granary_chunk_data::DocumentRepository;
use granary_media::TaskEnvelope;
use tokio::sync::OwnedSemaphorePermit;

use crate::state::AppState;

/// Run one job to completion, failure, or deadline
pub async fn run_job(state: AppState, task: TaskEnvelope, permit: OwnedSemaphorePermit) {
    let document_id = task.document_id;

    let outcome = tokio::time::timeout(state.job_deadline, state.dispatcher.process(&task)).await;

    match outcome {
        Ok(Ok(())) => {
            tracing::info!(document_id = %document_id, "Job finished");
        }
        Ok(Err(e)) => {
            tracing::error!(
                document_id = %document_id,
                error = %e,
                retriable = e.is_retriable(),
                "Job failed"
            );
            mark_failed(&state, document_id, &e.to_string()).await;
        }
        Err(_) => {
            let deadline_secs = state.job_deadline.as_secs();
            tracing::error!(
                document_id = %document_id,
                deadline_secs,
                "Job exceeded deadline, aborting"
            );
            mark_failed(
                &state,
                document_id,
                &format!("Job deadline of {deadline_secs}s exceeded"),
            )
            .await;
        }
    }

    if let Ok(mut jobs) = state.jobs.lock() {
        jobs.remove(&document_id);
    }
    drop(permit);
}

/// Record the failed transition; progress resets to zero with it
async fn mark_failed(state: &AppState, document_id: uuid::Uuid, error: &str) {
    if let Err(e) = state.repository.mark_failed(document_id, error).await {
        tracing::error!(
            document_id = %document_id,
            error = %e,
            "Failed to record job failure"
        );
    }
}
