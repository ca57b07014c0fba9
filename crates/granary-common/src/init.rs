//! Process bootstrap for the service binaries
//!
//! Both binaries are configured entirely through the environment; during
//! development a `.env` file in or above the working directory supplies
//! overrides. The file is applied at most once per process, before tracing
//! exists, so the applied path is handed back for the caller to log after
//! its subscriber is installed.

use std::path::PathBuf;
use std::sync::OnceLock;

static ENV_FILE: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Apply `.env` overrides to the process environment
///
/// Returns the path of the file that was applied, or `None` when no file
/// was found. Repeated calls return the first result without re-reading.
pub fn initialize_environment() -> Option<&'static PathBuf> {
    ENV_FILE.get_or_init(|| dotenvy::dotenv().ok()).as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_calls_are_stable() {
        assert_eq!(initialize_environment(), initialize_environment());
    }
}
