//! Object store configuration.

use crate::error::{StorageError, StorageResult};

/// Public host objects are served from unless overridden.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://storage.googleapis.com";

/// S3-interoperability endpoint used when none is configured.
pub const DEFAULT_ENDPOINT_URL: &str = "https://storage.googleapis.com";

/// Configuration for the object store client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// S3 API endpoint
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region ("auto" works for GCS interop and R2)
    pub region: String,
    /// Base of public object URLs, without trailing slash
    pub public_base_url: String,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> StorageResult<Self> {
        let required = |key: &str| {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| StorageError::config_error(format!("{} not set", key)))
        };

        Ok(Self {
            endpoint_url: var("STORAGE_ENDPOINT_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_string()),
            access_key_id: required("STORAGE_ACCESS_KEY_ID")?,
            secret_access_key: required("STORAGE_SECRET_ACCESS_KEY")?,
            bucket_name: required("STORAGE_BUCKET")?,
            region: var("STORAGE_REGION").unwrap_or_else(|| "auto".to_string()),
            public_base_url: var("STORAGE_PUBLIC_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
        })
    }

    /// Public URL of an object.
    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket_name, path)
    }
}
