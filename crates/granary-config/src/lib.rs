//! Centralized configuration management for granary
//!
//! This crate provides a unified configuration system for the ingestion
//! pipeline: safe defaults defined as constants, environment variable
//! overrides, and runtime validation.
//!
//! Configuration follows a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. Environment variable overrides (`GRANARY_*`)
//! 3. Runtime validation

pub mod error;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use validation::Validate;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

// =============================================================================
// SAFE DEFAULTS - Work for any environment (dev, staging, prod, test)
// =============================================================================

// Processing limits
const DEFAULT_MAX_CONCURRENT_JOBS: usize = 1; // Media jobs are memory-bound
const DEFAULT_JOB_DEADLINE_SECONDS: u64 = 3600; // Matches external runtime cap
const DEFAULT_DOC_MAX_BYTES: u64 = 100 * 1024 * 1024;
const DEFAULT_DOC_STREAM_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_IMAGE_MAX_BYTES: u64 = 20 * 1024 * 1024;
const DEFAULT_AUDIO_MAX_DURATION_SEC: u64 = 3600;
const DEFAULT_VIDEO_MAX_DURATION_SEC: u64 = 900;
const DEFAULT_VIDEO_SEGMENT_LEN_SEC: u64 = 30;
const DEFAULT_VIDEO_MAX_SEGMENTS: usize = 30;

// Chunking
const DEFAULT_CHUNK_TARGET_CHARS: usize = 1000;
const DEFAULT_CHUNK_OVERLAP_CHARS: usize = 100;

// AI service
const DEFAULT_AI_REGION: &str = "us-central1";
const DEFAULT_TEXT_EMBEDDING_MODEL: &str = "text-embedding-005";
const DEFAULT_TEXT_EMBEDDING_DIMENSIONS: usize = 768;
const DEFAULT_MULTIMODAL_EMBEDDING_MODEL: &str = "multimodalembedding@001";
const DEFAULT_MULTIMODAL_EMBEDDING_DIMENSIONS: usize = 1408;
const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_MULTIMODAL_CONTEXT_TOKEN_LIMIT: usize = 32;
const DEFAULT_AI_TIMEOUT_SECONDS: u64 = 120;
const DEFAULT_RETRY_ATTEMPTS: usize = 3;

// Database (safe local defaults)
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_NAME: &str = "granary";
const DEFAULT_DB_USER: &str = "granary";
const DEFAULT_DB_PASSWORD: &str = "localdev123";
const DEFAULT_DB_SSL_MODE: &str = "disable";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DB_MIN_CONNECTIONS: u32 = 2;
const DEFAULT_DB_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_AUTO_MIGRATE: bool = true;

// Object storage
const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
const DEFAULT_UPLOAD_BUCKET: &str = "granary-uploads";
const DEFAULT_STORAGE_TIMEOUT_SECONDS: u64 = 300;

// Durable task queue
const DEFAULT_QUEUE_NAME: &str = "granary-processing";
const DEFAULT_QUEUE_DISPATCH_DEADLINE_SECONDS: u64 = 3600;
const DEFAULT_QUEUE_MAX_ATTEMPTS: usize = 5;
const DEFAULT_RESOLVE_ATTEMPTS: usize = 4;

// HTTP services
const DEFAULT_PROCESSOR_HOST: &str = "0.0.0.0";
const DEFAULT_PROCESSOR_PORT: u16 = 8080;
const DEFAULT_DISPATCHER_HOST: &str = "0.0.0.0";
const DEFAULT_DISPATCHER_PORT: u16 = 8081;

/// Core configuration for the entire granary application
///
/// All settings have safe defaults and can be overridden via environment
/// variables. No profile/environment selection needed - same defaults work
/// everywhere.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApplicationConfig {
    /// Processing limits and concurrency
    pub processing: ProcessingConfig,

    /// Managed AI service configuration
    pub ai: AiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Object storage configuration
    pub object_store: ObjectStoreConfig,

    /// Durable task queue configuration
    pub queue: QueueConfig,

    /// Processor HTTP service configuration
    pub processor: ServiceConfig,

    /// Dispatcher HTTP service configuration
    pub dispatcher: ServiceConfig,
}

impl ApplicationConfig {
    /// Load the full configuration from the environment with safe defaults
    pub fn from_env() -> Self {
        Self {
            processing: ProcessingConfig::from_env(),
            ai: AiConfig::from_env(),
            database: DatabaseConfig::from_env(),
            object_store: ObjectStoreConfig::from_env(),
            queue: QueueConfig::from_env(),
            processor: ServiceConfig::from_env(
                "GRANARY_PROCESSOR",
                DEFAULT_PROCESSOR_HOST,
                DEFAULT_PROCESSOR_PORT,
            ),
            dispatcher: ServiceConfig::from_env(
                "GRANARY_DISPATCHER",
                DEFAULT_DISPATCHER_HOST,
                DEFAULT_DISPATCHER_PORT,
            ),
        }
    }
}

impl Validate for ApplicationConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.processing.validate()?;
        self.ai.validate()?;
        self.database.validate()?;
        self.object_store.validate()?;
        self.queue.validate()?;
        self.processor.validate()?;
        self.dispatcher.validate()?;
        Ok(())
    }
}

/// Processing limits for the media pipelines
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProcessingConfig {
    /// Process-wide cap on concurrent processing jobs
    ///
    /// Default is 1: media jobs hold decoded segments in memory, so excess
    /// load is pushed back to the durable queue instead of queued in-process.
    pub max_concurrent_jobs: usize,

    /// Wall-clock deadline for a single job in seconds
    pub job_deadline_seconds: u64,

    /// Maximum document size in bytes
    pub doc_max_bytes: u64,

    /// Documents above this size use streamed extraction
    pub doc_stream_threshold_bytes: u64,

    /// Maximum image size in bytes
    pub image_max_bytes: u64,

    /// Maximum audio duration in seconds
    pub audio_max_duration_sec: u64,

    /// Maximum video duration in seconds
    pub video_max_duration_sec: u64,

    /// Fixed video segment window length in seconds
    pub video_segment_len_sec: u64,

    /// Maximum number of video segments per job
    pub video_max_segments: usize,

    /// Target chunk size for document chunking, in characters
    pub chunk_target_chars: usize,

    /// Overlap between adjacent document chunks, in characters
    pub chunk_overlap_chars: usize,
}

impl ProcessingConfig {
    /// Load processing configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: env_parse("GRANARY_MAX_CONCURRENT_JOBS")
                .unwrap_or(DEFAULT_MAX_CONCURRENT_JOBS),
            job_deadline_seconds: env_parse("GRANARY_JOB_DEADLINE_SECONDS")
                .unwrap_or(DEFAULT_JOB_DEADLINE_SECONDS),
            doc_max_bytes: env_parse("GRANARY_DOC_MAX_BYTES").unwrap_or(DEFAULT_DOC_MAX_BYTES),
            doc_stream_threshold_bytes: env_parse("GRANARY_DOC_STREAM_THRESHOLD_BYTES")
                .unwrap_or(DEFAULT_DOC_STREAM_THRESHOLD_BYTES),
            image_max_bytes: env_parse("GRANARY_IMAGE_MAX_BYTES")
                .unwrap_or(DEFAULT_IMAGE_MAX_BYTES),
            audio_max_duration_sec: env_parse("GRANARY_AUDIO_MAX_DURATION_SEC")
                .unwrap_or(DEFAULT_AUDIO_MAX_DURATION_SEC),
            video_max_duration_sec: env_parse("GRANARY_VIDEO_MAX_DURATION_SEC")
                .unwrap_or(DEFAULT_VIDEO_MAX_DURATION_SEC),
            video_segment_len_sec: env_parse("GRANARY_VIDEO_SEGMENT_LEN_SEC")
                .unwrap_or(DEFAULT_VIDEO_SEGMENT_LEN_SEC),
            video_max_segments: env_parse("GRANARY_VIDEO_MAX_SEGMENTS")
                .unwrap_or(DEFAULT_VIDEO_MAX_SEGMENTS),
            chunk_target_chars: env_parse("GRANARY_CHUNK_TARGET_CHARS")
                .unwrap_or(DEFAULT_CHUNK_TARGET_CHARS),
            chunk_overlap_chars: env_parse("GRANARY_CHUNK_OVERLAP_CHARS")
                .unwrap_or(DEFAULT_CHUNK_OVERLAP_CHARS),
        }
    }
}

impl Validate for ProcessingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_bounds(
            "processing.max_concurrent_jobs",
            self.max_concurrent_jobs as u64,
            1..=64,
        )?;
        validation::validate_bounds(
            "processing.job_deadline_seconds",
            self.job_deadline_seconds,
            1..=86_400,
        )?;
        validation::validate_bounds(
            "processing.video_segment_len_sec",
            self.video_segment_len_sec,
            1..=self.video_max_duration_sec,
        )?;
        validation::validate_bounds(
            "processing.video_max_segments",
            self.video_max_segments as u64,
            1..=1000,
        )?;
        if self.chunk_overlap_chars >= self.chunk_target_chars {
            return Err(ConfigError::Generic {
                message: format!(
                    "chunk_overlap_chars ({}) must be smaller than chunk_target_chars ({})",
                    self.chunk_overlap_chars, self.chunk_target_chars
                ),
            });
        }
        Ok(())
    }
}

/// Managed AI service configuration (embeddings, descriptions, transcription)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AiConfig {
    /// Cloud project the AI endpoints are scoped to
    pub project: String,

    /// Region the AI endpoints are served from
    pub region: String,

    /// Override for the AI endpoint base URL (tests point this at a local double)
    #[serde(default)]
    pub endpoint_override: Option<String>,

    /// Text embedding model identifier
    pub text_embedding_model: String,

    /// Text embedding dimensionality (768 for the standard text model)
    pub text_embedding_dimensions: usize,

    /// Multimodal embedding model identifier
    pub multimodal_embedding_model: String,

    /// Multimodal embedding dimensionality (1408 for the standard model)
    pub multimodal_embedding_dimensions: usize,

    /// Generation model used for descriptions and transcription
    pub generation_model: String,

    /// Token budget for contextual text sent with multimodal embeddings
    pub multimodal_context_token_limit: usize,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// In-process retry attempts for transient failures
    pub retry_attempts: usize,
}

impl AiConfig {
    /// Load AI configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            project: std::env::var("GRANARY_AI_PROJECT").unwrap_or_default(),
            region: std::env::var("GRANARY_AI_REGION")
                .unwrap_or_else(|_| DEFAULT_AI_REGION.to_string()),
            endpoint_override: std::env::var("GRANARY_AI_ENDPOINT").ok(),
            text_embedding_model: std::env::var("GRANARY_TEXT_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_TEXT_EMBEDDING_MODEL.to_string()),
            text_embedding_dimensions: env_parse("GRANARY_TEXT_EMBEDDING_DIMENSIONS")
                .unwrap_or(DEFAULT_TEXT_EMBEDDING_DIMENSIONS),
            multimodal_embedding_model: std::env::var("GRANARY_MULTIMODAL_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_MULTIMODAL_EMBEDDING_MODEL.to_string()),
            multimodal_embedding_dimensions: env_parse("GRANARY_MULTIMODAL_EMBEDDING_DIMENSIONS")
                .unwrap_or(DEFAULT_MULTIMODAL_EMBEDDING_DIMENSIONS),
            generation_model: std::env::var("GRANARY_GENERATION_MODEL")
                .unwrap_or_else(|_| DEFAULT_GENERATION_MODEL.to_string()),
            multimodal_context_token_limit: env_parse("GRANARY_MULTIMODAL_CONTEXT_TOKEN_LIMIT")
                .unwrap_or(DEFAULT_MULTIMODAL_CONTEXT_TOKEN_LIMIT),
            timeout_seconds: env_parse("GRANARY_AI_TIMEOUT_SECONDS")
                .unwrap_or(DEFAULT_AI_TIMEOUT_SECONDS),
            retry_attempts: env_parse("GRANARY_RETRY_ATTEMPTS").unwrap_or(DEFAULT_RETRY_ATTEMPTS),
        }
    }

    /// Base URL for the regional AI endpoint
    pub fn endpoint_base(&self) -> String {
        self.endpoint_override.clone().unwrap_or_else(|| {
            format!("https://{}-aiplatform.googleapis.com/v1", self.region)
        })
    }
}

impl Validate for AiConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::require("ai.region", &self.region)?;
        validation::require("ai.text_embedding_model", &self.text_embedding_model)?;
        validation::require(
            "ai.multimodal_embedding_model",
            &self.multimodal_embedding_model,
        )?;
        validation::require("ai.generation_model", &self.generation_model)?;
        validation::validate_bounds(
            "ai.text_embedding_dimensions",
            self.text_embedding_dimensions as u64,
            1..=10_000,
        )?;
        validation::validate_bounds(
            "ai.multimodal_embedding_dimensions",
            self.multimodal_embedding_dimensions as u64,
            1..=10_000,
        )?;
        if let Some(endpoint) = &self.endpoint_override {
            validation::validate_endpoint("ai.endpoint_override", endpoint)?;
        }
        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DatabaseConfig {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Database name
    pub database: String,
    /// Username
    pub username: String,
    /// Password (never logged; see `safe_connection_string`)
    pub password: String,
    /// SSL mode ("disable", "prefer", "require")
    pub ssl_mode: String,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Minimum pool connections kept warm
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub timeout_seconds: u64,
    /// Run embedded migrations on startup
    pub auto_migrate: bool,
}

impl DatabaseConfig {
    /// Load database configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("GRANARY_DB_HOST").unwrap_or_else(|_| DEFAULT_DB_HOST.to_string()),
            port: env_parse("GRANARY_DB_PORT").unwrap_or(DEFAULT_DB_PORT),
            database: std::env::var("GRANARY_DB_NAME")
                .unwrap_or_else(|_| DEFAULT_DB_NAME.to_string()),
            username: std::env::var("GRANARY_DB_USER")
                .unwrap_or_else(|_| DEFAULT_DB_USER.to_string()),
            password: std::env::var("GRANARY_DB_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_DB_PASSWORD.to_string()),
            ssl_mode: std::env::var("GRANARY_DB_SSL_MODE")
                .unwrap_or_else(|_| DEFAULT_DB_SSL_MODE.to_string()),
            max_connections: env_parse("GRANARY_DB_MAX_CONNECTIONS")
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            min_connections: env_parse("GRANARY_DB_MIN_CONNECTIONS")
                .unwrap_or(DEFAULT_DB_MIN_CONNECTIONS),
            timeout_seconds: env_parse("GRANARY_DB_TIMEOUT_SECONDS")
                .unwrap_or(DEFAULT_DB_TIMEOUT_SECONDS),
            auto_migrate: env_parse("GRANARY_DB_AUTO_MIGRATE").unwrap_or(DEFAULT_AUTO_MIGRATE),
        }
    }

    /// Build sqlx connect options from this configuration
    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = match self.ssl_mode.as_str() {
            "require" => PgSslMode::Require,
            "prefer" => PgSslMode::Prefer,
            _ => PgSslMode::Disable,
        };
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    /// Connection description safe for logging (no password)
    pub fn safe_connection_string(&self) -> String {
        format!(
            "{}@{}:{}/{} (ssl: {})",
            self.username, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::require("database.host", &self.host)?;
        validation::validate_bounds("database.port", u64::from(self.port), 1..=65_535)?;
        validation::require("database.database", &self.database)?;
        validation::validate_bounds(
            "database.max_connections",
            u64::from(self.max_connections),
            1..=1000,
        )?;
        Ok(())
    }
}

/// Object storage configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ObjectStoreConfig {
    /// Storage API endpoint
    pub endpoint: String,
    /// Bucket that receives user uploads
    pub upload_bucket: String,
    /// Download timeout in seconds
    pub timeout_seconds: u64,
}

impl ObjectStoreConfig {
    /// Load object storage configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("GRANARY_STORAGE_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_STORAGE_ENDPOINT.to_string()),
            upload_bucket: std::env::var("GRANARY_UPLOAD_BUCKET")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_BUCKET.to_string()),
            timeout_seconds: env_parse("GRANARY_STORAGE_TIMEOUT_SECONDS")
                .unwrap_or(DEFAULT_STORAGE_TIMEOUT_SECONDS),
        }
    }
}

impl Validate for ObjectStoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_endpoint("object_store.endpoint", &self.endpoint)?;
        validation::require("object_store.upload_bucket", &self.upload_bucket)?;
        Ok(())
    }
}

/// Durable task queue configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QueueConfig {
    /// Queue API endpoint (create-task endpoint base)
    pub endpoint: String,
    /// Named queue for processing tasks
    pub queue_name: String,
    /// Full URL of the processor's task endpoint
    pub processor_url: String,
    /// Per-task dispatch deadline in seconds
    pub dispatch_deadline_seconds: u64,
    /// Maximum delivery attempts before the queue gives up
    pub max_attempts: usize,
    /// In-handler attempts to resolve an event to a document row
    pub resolve_attempts: usize,
}

impl QueueConfig {
    /// Load queue configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("GRANARY_QUEUE_ENDPOINT")
                .unwrap_or_else(|_| "https://cloudtasks.googleapis.com/v2".to_string()),
            queue_name: std::env::var("GRANARY_QUEUE_NAME")
                .unwrap_or_else(|_| DEFAULT_QUEUE_NAME.to_string()),
            processor_url: std::env::var("GRANARY_PROCESSOR_URL")
                .unwrap_or_else(|_| "http://localhost:8080/process-task".to_string()),
            dispatch_deadline_seconds: env_parse("GRANARY_QUEUE_DISPATCH_DEADLINE_SECONDS")
                .unwrap_or(DEFAULT_QUEUE_DISPATCH_DEADLINE_SECONDS),
            max_attempts: env_parse("GRANARY_QUEUE_MAX_ATTEMPTS")
                .unwrap_or(DEFAULT_QUEUE_MAX_ATTEMPTS),
            resolve_attempts: env_parse("GRANARY_RESOLVE_ATTEMPTS")
                .unwrap_or(DEFAULT_RESOLVE_ATTEMPTS),
        }
    }
}

impl Validate for QueueConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_endpoint("queue.endpoint", &self.endpoint)?;
        validation::validate_endpoint("queue.processor_url", &self.processor_url)?;
        validation::require("queue.queue_name", &self.queue_name)?;
        validation::validate_bounds("queue.max_attempts", self.max_attempts as u64, 1..=100)?;
        Ok(())
    }
}

/// HTTP service bind configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ServiceConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl ServiceConfig {
    /// Load service configuration with a per-service env prefix
    pub fn from_env(prefix: &str, default_host: &str, default_port: u16) -> Self {
        Self {
            host: std::env::var(format!("{prefix}_HOST"))
                .unwrap_or_else(|_| default_host.to_string()),
            port: std::env::var(format!("{prefix}_PORT"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default_port),
        }
    }

    /// Socket address string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::require("service.host", &self.host)?;
        validation::validate_bounds("service.port", u64::from(self.port), 1..=65_535)?;
        Ok(())
    }
}

/// Parse an environment variable, ignoring unset or malformed values
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = ApplicationConfig::from_env();
        config.validate().expect("default configuration is valid");
    }

    #[test]
    fn default_dimensions_match_models() {
        let ai = AiConfig::from_env();
        assert_eq!(ai.text_embedding_dimensions, 768);
        assert_eq!(ai.multimodal_embedding_dimensions, 1408);
    }

    #[test]
    fn safe_connection_string_hides_password() {
        let db = DatabaseConfig::from_env();
        assert!(!db.safe_connection_string().contains(&db.password));
    }

    #[test]
    fn endpoint_base_prefers_override() {
        let mut ai = AiConfig::from_env();
        ai.endpoint_override = Some("http://localhost:9999".to_string());
        assert_eq!(ai.endpoint_base(), "http://localhost:9999");
        ai.endpoint_override = None;
        assert!(ai.endpoint_base().contains(&ai.region));
    }

    #[test]
    fn overlap_must_be_smaller_than_target() {
        let mut processing = ProcessingConfig::from_env();
        processing.chunk_overlap_chars = processing.chunk_target_chars;
        assert!(processing.validate().is_err());
    }
}
