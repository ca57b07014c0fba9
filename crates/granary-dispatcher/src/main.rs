//! Granary queue dispatcher service

use granary_chunk_data::{DbDocumentRepository, initialize_database};
use granary_config::{ApplicationConfig, Validate};
use granary_dispatcher::{DispatcherState, HttpTaskQueue, create_router};
use std::sync::Arc;
use tracing::info;

type MainResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> MainResult {
    let env_file = granary_common::initialize_environment();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting granary dispatcher...");
    if let Some(path) = env_file {
        info!(path = %path.display(), "Loaded environment overrides");
    }

    let config = ApplicationConfig::from_env();
    config.validate()?;

    let pool = initialize_database(&config.database).await?;
    let state = DispatcherState {
        repository: Arc::new(DbDocumentRepository::new(pool)),
        queue: Arc::new(HttpTaskQueue::new(config.queue.clone())?),
        upload_bucket: config.object_store.upload_bucket.clone(),
        resolve_attempts: config.queue.resolve_attempts,
    };

    let app = create_router(state);
    let addr = config.dispatcher.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Dispatcher listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(granary_common::shutdown_signal())
        .await?;

    info!("Dispatcher stopped");
    Ok(())
}
