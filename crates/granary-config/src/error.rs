//! Configuration error types

use thiserror::Error;

/// Why a configuration section refused to validate
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A URL setting is missing its scheme or host
    #[error("{field} is not an http(s) endpoint: {url:?}")]
    InvalidEndpoint { field: String, url: String },

    /// A required setting is empty
    #[error("{field} must be set and non-empty")]
    MissingField { field: String },

    /// A numeric setting fell outside its allowed range
    #[error("{field} = {value} is outside the allowed range {min}..={max}")]
    OutOfBounds {
        field: String,
        value: u64,
        min: u64,
        max: u64,
    },

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error message
    #[error("Configuration error: {message}")]
    Generic { message: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
