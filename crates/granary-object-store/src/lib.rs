//! Read-only object storage client for the processor
//!
//! Downloads uploaded objects into a job-scoped temporary directory. The
//! directory owns every file the job touches, so cleanup is guaranteed by
//! drop on all exit paths.

pub mod client;
pub mod error;

pub mod mock;
pub use mock::MockObjectStore;

pub use client::HttpObjectStore;
pub use error::{ObjectStoreError, ObjectStoreResult};

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Trait for fetching uploaded objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download an object into `dest_dir`, returning the local path
    ///
    /// The file name is derived from the final path component of the object
    /// key so downstream tooling (extractors, the transcoder) sees a natural
    /// extension.
    async fn download(&self, object_key: &str, dest_dir: &Path) -> ObjectStoreResult<PathBuf>;

    /// Liveness probe for health checks
    async fn is_ready(&self) -> bool;
}

/// Derive a safe local file name from an object key
pub(crate) fn local_file_name(object_key: &str) -> String {
    let name = object_key.rsplit('/').next().unwrap_or(object_key);
    if name.is_empty() {
        "download.bin".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::local_file_name;

    #[test]
    fn file_name_uses_last_key_component() {
        assert_eq!(local_file_name("uploads/u1/talk.mp4"), "talk.mp4");
        assert_eq!(local_file_name("flat.pdf"), "flat.pdf");
        assert_eq!(local_file_name("trailing/"), "download.bin");
    }
}
