//! Granary processor service
//!
//! Headless worker: accepts tasks from the durable queue, processes media,
//! writes chunks.

use granary_config::{ApplicationConfig, Validate};
use granary_processor::{build_state, create_router};
use tracing::info;

type MainResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> MainResult {
    let env_file = granary_common::initialize_environment();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting granary processor...");
    if let Some(path) = env_file {
        info!(path = %path.display(), "Loaded environment overrides");
    }

    let config = ApplicationConfig::from_env();
    config.validate()?;
    info!(
        max_concurrent_jobs = config.processing.max_concurrent_jobs,
        database = %config.database.safe_connection_string(),
        "Configuration loaded"
    );

    let state = build_state(&config).await?;
    let app = create_router(state);

    let addr = config.processor.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Processor listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(granary_common::shutdown_signal())
        .await?;

    info!("Processor stopped");
    Ok(())
}
