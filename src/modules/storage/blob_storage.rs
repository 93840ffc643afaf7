use async_trait::async_trait;

use crate::core::error::Result;

/// Blob storage capability the file lifecycle depends on
///
/// Keys are opaque to the storage; the upload path derives them from file ids.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` under `key`, overwriting any previous blob, and return its URL
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String>;

    /// Fetch a blob; `None` when the key is absent. Not on the lifecycle
    /// path; kept for reading back stored content.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove a blob. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}
