//! The storage capability used by job runners.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Durable storage for finished outputs.
#[async_trait]
pub trait StorageUploader: Send + Sync {
    /// Store `local` at `destination`, returning its public URL.
    async fn upload(
        &self,
        local: &Path,
        destination: &str,
        metadata: HashMap<String, String>,
    ) -> StorageResult<String>;

    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Time-limited read URL.
    async fn signed_url(&self, path: &str, ttl: Duration) -> StorageResult<String>;
}
