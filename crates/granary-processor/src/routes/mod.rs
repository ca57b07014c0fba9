//! HTTP routes for the processor service

pub mod health;
pub mod process_task;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

/// Build the processor router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/process-task", post(process_task::process_task))
        .route("/health", get(health::health_check))
        .with_state(state)
}
