//! Startup checks for loaded configuration
//!
//! Loading never fails (defaults fill every gap), so validation is the
//! gate that keeps a service binary from starting with values the pipeline
//! cannot honor: a zero job cap, an overlap wider than a chunk, a queue
//! endpoint with no scheme. Each check names the offending field the way
//! it appears in the environment docs (`section.field`).

use crate::{ConfigError, ConfigResult};
use std::ops::RangeInclusive;

/// Trait for configuration sections that can veto startup
pub trait Validate {
    /// Check this section, reporting the first violation found
    ///
    /// # Errors
    /// Returns a [`ConfigError`] naming the field that failed
    fn validate(&self) -> ConfigResult<()>;
}

/// Require an `http://` or `https://` endpoint with something after the scheme
///
/// # Errors
/// Returns `ConfigError::InvalidEndpoint` when the scheme is missing or the
/// URL is scheme-only
pub fn validate_endpoint(field: &str, url: &str) -> ConfigResult<()> {
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match host {
        Some(rest) if !rest.trim_matches('/').is_empty() => Ok(()),
        _ => Err(ConfigError::InvalidEndpoint {
            field: field.to_string(),
            url: url.to_string(),
        }),
    }
}

/// Require a numeric value inside an inclusive range
///
/// # Errors
/// Returns `ConfigError::OutOfBounds` carrying the violated bounds
pub fn validate_bounds(field: &str, value: u64, bounds: RangeInclusive<u64>) -> ConfigResult<()> {
    if bounds.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfBounds {
            field: field.to_string(),
            value,
            min: *bounds.start(),
            max: *bounds.end(),
        })
    }
}

/// Require a setting to carry a non-blank value
///
/// # Errors
/// Returns `ConfigError::MissingField` when the value is empty or whitespace
pub fn require(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingField {
            field: field.to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_need_a_scheme_and_a_host() {
        assert!(validate_endpoint("queue.endpoint", "https://tasks.internal/v2").is_ok());
        assert!(validate_endpoint("queue.endpoint", "http://localhost:8080").is_ok());
        assert!(validate_endpoint("queue.endpoint", "tasks.internal").is_err());
        assert!(validate_endpoint("queue.endpoint", "https://").is_err());
        assert!(validate_endpoint("queue.endpoint", "https:///").is_err());
    }

    #[test]
    fn bounds_violations_name_the_field() {
        let err = validate_bounds("processing.max_concurrent_jobs", 0, 1..=64).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("processing.max_concurrent_jobs"));
        assert!(message.contains('1') && message.contains("64"));
        assert!(validate_bounds("processing.max_concurrent_jobs", 64, 1..=64).is_ok());
    }

    #[test]
    fn blank_values_are_missing() {
        assert!(require("ai.region", "us-central1").is_ok());
        assert!(require("ai.region", "   ").is_err());
    }
}
