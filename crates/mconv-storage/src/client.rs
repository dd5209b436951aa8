//! S3-compatible object store client.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::paths::{content_type_for, is_valid_object_path};
use crate::uploader::StorageUploader;

/// Object metadata key recording when the upload happened.
pub const UPLOADED_AT_KEY: &str = "uploadedAt";

/// Object store client.
#[derive(Clone)]
pub struct ObjectStoreClient {
    client: Client,
    config: StorageConfig,
}

impl std::fmt::Debug for ObjectStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreClient")
            .field("endpoint_url", &self.config.endpoint_url)
            .field("bucket", &self.config.bucket_name)
            .finish()
    }
}

impl ObjectStoreClient {
    /// Create a new client from configuration.
    pub fn new(config: StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "mconv",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            config,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(StorageConfig::from_env()?))
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket_name
    }

    /// Upload a file with the given object metadata.
    pub async fn upload_file(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StorageResult<()> {
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.config.bucket_name)
            .key(key)
            .body(body)
            .content_type(content_type)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(())
    }

    /// Generate a presigned URL for GET.
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.config.bucket_name)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Delete an object.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.config.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }
}

fn checked(path: &str) -> StorageResult<&str> {
    if is_valid_object_path(path) {
        Ok(path)
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

#[async_trait]
impl StorageUploader for ObjectStoreClient {
    async fn upload(
        &self,
        local: &Path,
        destination: &str,
        mut metadata: HashMap<String, String>,
    ) -> StorageResult<String> {
        let key = checked(destination)?;
        metadata.insert(UPLOADED_AT_KEY.to_string(), chrono::Utc::now().to_rfc3339());
        self.upload_file(local, key, content_type_for(local), metadata)
            .await?;
        Ok(self.config.public_url(key))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.delete_object(checked(path)?).await
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> StorageResult<String> {
        self.presign_get(checked(path)?, ttl).await
    }
}
