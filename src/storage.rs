//! Object storage for uploaded images.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;
}

/// Keys are relative, slash-separated and never climb out of the root.
fn check_key(key: &str) -> Result<(), StorageError> {
    let path = Path::new(key);
    let ok = !key.is_empty()
        && !key.contains('\\')
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Files under a local directory, served by the router at `public_prefix`.
pub struct LocalDiskStorage {
    root: PathBuf,
    public_prefix: String,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, public_prefix: &str) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for LocalDiskStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        check_key(key)?;
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::info!(key, path = %path.display(), "stored upload on local disk");

        Ok(StoredObject {
            key: key.to_string(),
            url: format!("{}/{}", self.public_prefix, key),
        })
    }
}

/// S3-compatible bucket (AWS, MinIO, R2, Supabase storage).
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl S3Storage {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base: String) -> Self {
        Self {
            client,
            bucket,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub async fn from_config(
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
        public_url: Option<&str>,
        access_key_id: Option<&str>,
        secret_access_key: Option<&str>,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()));
        if let (Some(key), Some(secret)) = (access_key_id, secret_access_key) {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                key,
                secret,
                None,
                None,
                "folio-static",
            ));
        }
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_config);

        let public_base = match (public_url, endpoint) {
            (Some(url), _) => url.to_string(),
            (None, Some(endpoint)) => {
                format!("{}/{}", endpoint.trim_end_matches('/'), bucket)
            }
            (None, None) => format!("https://{bucket}.s3.{region}.amazonaws.com"),
        };

        Self::new(client, bucket.to_string(), public_base)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        check_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        tracing::info!("Uploaded object to s3://{}/{}", self.bucket, key);

        Ok(StoredObject {
            key: key.to_string(),
            url: format!("{}/{}", self.public_base, key),
        })
    }
}

/// Build the configured backend.
pub async fn from_config(config: &StorageConfig) -> std::sync::Arc<dyn ObjectStorage> {
    match config {
        StorageConfig::Local { dir, public_prefix } => {
            tracing::info!(dir, "Using local disk storage for uploads");
            std::sync::Arc::new(LocalDiskStorage::new(dir, public_prefix))
        }
        StorageConfig::S3 {
            bucket,
            region,
            endpoint,
            public_url,
            access_key_id,
            secret_access_key,
        } => {
            tracing::info!(bucket, "Using S3 storage for uploads");
            std::sync::Arc::new(
                S3Storage::from_config(
                    bucket,
                    region,
                    endpoint.as_deref(),
                    public_url.as_deref(),
                    access_key_id.as_deref(),
                    secret_access_key.as_deref(),
                )
                .await,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_check() {
        assert!(check_key("portfolio/images/1-abc.png").is_ok());
        assert!(check_key("../etc/passwd").is_err());
        assert!(check_key("/abs/path.png").is_err());
        assert!(check_key("a\\b.png").is_err());
        assert!(check_key("").is_err());
    }

    #[tokio::test]
    async fn test_local_put_writes_file_and_builds_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path(), "/uploads/");

        let stored = storage
            .put("portfolio/images/1-abcd.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();

        assert_eq!(stored.url, "/uploads/portfolio/images/1-abcd.png");
        let written = std::fs::read(dir.path().join("portfolio/images/1-abcd.png")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_local_put_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path(), "/uploads");
        let result = storage.put("../escape.png", vec![0], "image/png").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
