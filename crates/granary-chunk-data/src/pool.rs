//! Connection pool creation and database initialization

use crate::error::{DatabaseError, DatabaseResult};
use granary_config::DatabaseConfig;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Create a connection pool from the database configuration
///
/// # Errors
///
/// Returns an error if the database is unreachable or credentials are wrong
pub async fn create_pool(config: &DatabaseConfig) -> DatabaseResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.timeout_seconds))
        .connect_with(config.connect_options())
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))
}

/// Create the pool and run embedded migrations when configured to
///
/// # Errors
///
/// Returns an error if the pool cannot be created or a migration fails
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<PgPool> {
    let pool = create_pool(config).await?;

    if config.auto_migrate {
        tracing::info!(
            database = %config.safe_connection_string(),
            "Running embedded migrations"
        );
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    }

    Ok(pool)
}
