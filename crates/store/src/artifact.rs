//! Artifact blob storage behind `object_store`.
//!
//! Captures and diff visualizations are content blobs addressed by key.
//! Deletes are idempotent: rotation may race a prior rotation or retry
//! after a partial failure, and "already gone" is success.

use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tracing::info;

use pagewatch_core::config::ArtifactConfig;

use crate::error::StoreError;

/// Content blob store: put/get/delete plus a retrievable URL per key.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store a blob and return its retrievable URL.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String, StoreError>;

    /// Fetch a blob's bytes.
    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Delete a blob. Succeeds when the key is already gone.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Retrievable URL for a key.
    fn url_for(&self, key: &str) -> String;
}

/// `object_store`-backed artifact store (local filesystem, S3, or memory).
pub struct ObjectArtifactStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    public_base_url: Option<String>,
}

impl ObjectArtifactStore {
    /// Pick the backend from configuration: S3 when a bucket is set,
    /// the local filesystem under `data_dir/artifacts` otherwise.
    pub fn from_config(config: &ArtifactConfig) -> Result<Self, StoreError> {
        if config.is_s3() {
            Self::s3(config)
        } else {
            Self::local(config)
        }
    }

    pub fn local(config: &ArtifactConfig) -> Result<Self, StoreError> {
        let dir = config.data_dir.join("artifacts");
        std::fs::create_dir_all(&dir)?;
        let canonical = std::fs::canonicalize(&dir).unwrap_or(dir);
        let store = LocalFileSystem::new_with_prefix(&canonical)
            .map_err(StoreError::ObjectStore)?;
        info!("Artifacts: local backend at {}", canonical.display());
        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            public_base_url: config.public_base_url.clone(),
        })
    }

    pub fn s3(config: &ArtifactConfig) -> Result<Self, StoreError> {
        let bucket = config
            .s3_bucket
            .as_deref()
            .ok_or_else(|| StoreError::NotConfigured("S3_BUCKET not set".into()))?;

        let mut builder = AmazonS3Builder::new()
            .with_region(&config.region)
            .with_bucket_name(bucket);

        if let Some(ref key) = config.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(ref secret) = config.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(ref endpoint) = config.endpoint_url {
            if !endpoint.is_empty() {
                // object_store requires absolute endpoint URLs.
                let endpoint_url =
                    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                        endpoint.clone()
                    } else {
                        format!("https://{endpoint}")
                    };
                builder = builder
                    .with_endpoint(&endpoint_url)
                    .with_allow_http(endpoint_url.starts_with("http://"));
            }
        }

        let store = builder.build()?;
        let prefix = config
            .s3_prefix
            .as_deref()
            .unwrap_or("")
            .trim_matches('/')
            .to_string();

        info!("Artifacts: S3 backend bucket={} prefix={:?}", bucket, prefix);
        Ok(Self {
            store: Arc::new(store),
            prefix,
            public_base_url: config.public_base_url.clone(),
        })
    }

    /// In-memory backend for tests.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            prefix: String::new(),
            public_base_url: None,
        }
    }

    fn object_path(&self, key: &str) -> ObjectPath {
        if self.prefix.is_empty() {
            ObjectPath::from(key)
        } else {
            ObjectPath::from(format!("{}/{}", self.prefix, key))
        }
    }
}

#[async_trait::async_trait]
impl ArtifactStore for ObjectArtifactStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String, StoreError> {
        let path = self.object_path(key);
        self.store.put(&path, bytes.into()).await?;
        tracing::debug!(key, content_type, "artifact stored");
        Ok(self.url_for(key))
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let path = self.object_path(key);
        match self.store.get(&path).await {
            Ok(result) => Ok(result.bytes().await?),
            Err(object_store::Error::NotFound { .. }) => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(key);
        match self.store.delete(&path).await {
            Ok(()) => Ok(()),
            // Idempotent: already gone is fine.
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn url_for(&self, key: &str) -> String {
        let full = if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        };
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), full),
            None => format!("/artifacts/{full}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_roundtrip() {
        let store = ObjectArtifactStore::memory();
        let url = store
            .put("captures/a.png", Bytes::from_static(b"png bytes"), "image/png")
            .await
            .unwrap();
        assert_eq!(url, "/artifacts/captures/a.png");
        assert_eq!(store.get("captures/a.png").await.unwrap().as_ref(), b"png bytes");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = ObjectArtifactStore::memory();
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = ObjectArtifactStore::memory();
        store
            .put("k", Bytes::from_static(b"x"), "application/octet-stream")
            .await
            .unwrap();
        store.delete("k").await.unwrap();
        // Second delete of the same key is still success.
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.is_err());
    }
}
