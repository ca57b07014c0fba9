//! In-memory object store for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ObjectStoreError, ObjectStoreResult};
use crate::{ObjectStore, local_file_name};

/// Mock store serving objects from an in-memory map
#[derive(Default)]
pub struct MockObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MockObjectStore {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register object bytes under a key
    pub fn put(&self, object_key: &str, bytes: Vec<u8>) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(object_key.to_string(), bytes);
        }
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn download(&self, object_key: &str, dest_dir: &Path) -> ObjectStoreResult<PathBuf> {
        let bytes = self
            .objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(object_key).cloned())
            .ok_or_else(|| ObjectStoreError::NotFound {
                bucket: "mock".to_string(),
                object_key: object_key.to_string(),
            })?;

        let dest = dest_dir.join(local_file_name(object_key));
        tokio::fs::write(&dest, bytes).await?;
        Ok(dest)
    }

    async fn is_ready(&self) -> bool {
        true
    }
}
