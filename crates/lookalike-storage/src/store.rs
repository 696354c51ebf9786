//! Blob store abstraction.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Object storage that serves what it stores under a public URL base.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key` and return its public URL.
    ///
    /// The caller is responsible for key uniqueness. Nothing is checked or retried.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String>;

    /// Read back a stored object.
    async fn fetch(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Public URL for `key`. Does not check that the object exists.
    fn public_url(&self, key: &str) -> String;

    /// Verify the backing store is reachable.
    async fn check_connectivity(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// `<base>/<key>`, tolerating a single trailing slash on the base.
pub fn join_public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.strip_suffix('/').unwrap_or(base), key)
}
