//! HTTP object storage client (JSON storage API)

use async_trait::async_trait;
use granary_config::ObjectStoreConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ObjectStoreError, ObjectStoreResult};
use crate::{ObjectStore, local_file_name};

/// Client for the storage JSON API (`GET .../b/{bucket}/o/{key}?alt=media`)
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    access_token: Option<String>,
}

impl HttpObjectStore {
    /// Build a client from configuration
    ///
    /// The bearer token is read from `GRANARY_STORAGE_TOKEN`; absent, requests
    /// go out unauthenticated (local emulators, public buckets).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed
    pub fn new(config: &ObjectStoreConfig) -> ObjectStoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ObjectStoreError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bucket: config.upload_bucket.clone(),
            access_token: std::env::var("GRANARY_STORAGE_TOKEN").ok(),
        })
    }

    fn media_url(&self, object_key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}?alt=media",
            self.endpoint,
            self.bucket,
            urlencoding::encode(object_key)
        )
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn download(&self, object_key: &str, dest_dir: &Path) -> ObjectStoreResult<PathBuf> {
        let url = self.media_url(object_key);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ObjectStoreError::Http(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            reqwest::StatusCode::NOT_FOUND => {
                return Err(ObjectStoreError::NotFound {
                    bucket: self.bucket.clone(),
                    object_key: object_key.to_string(),
                });
            }
            status @ (reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN) => {
                return Err(ObjectStoreError::Auth(format!(
                    "status {status} for {object_key}"
                )));
            }
            status => {
                return Err(ObjectStoreError::Http(format!(
                    "status {status} for {object_key}"
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ObjectStoreError::Http(e.to_string()))?;

        let dest = dest_dir.join(local_file_name(object_key));
        tokio::fs::write(&dest, &bytes).await?;

        tracing::debug!(
            object_key,
            bytes = bytes.len(),
            path = %dest.display(),
            "Downloaded object"
        );

        Ok(dest)
    }

    async fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: &str) -> ObjectStoreConfig {
        ObjectStoreConfig {
            endpoint: endpoint.to_string(),
            upload_bucket: "test-bucket".to_string(),
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn downloads_object_to_dest_dir() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/test-bucket/o/uploads%2Fnotes.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&server)
            .await;

        let store = HttpObjectStore::new(&test_config(&server.uri())).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let local = store.download("uploads/notes.txt", dir.path()).await.unwrap();

        assert_eq!(local.file_name().unwrap(), "notes.txt");
        assert_eq!(std::fs::read(&local).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn missing_object_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = HttpObjectStore::new(&test_config(&server.uri())).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = store.download("uploads/gone.pdf", dir.path()).await.unwrap_err();

        assert!(matches!(err, ObjectStoreError::NotFound { .. }));
    }
}
