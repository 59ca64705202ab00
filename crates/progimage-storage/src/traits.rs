//! Storage abstraction trait
//!
//! This module defines the object store contract every backend implements.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Bytes handed to `put_object`. Read errors abort the write.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Live stream over a stored object's bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Metadata recorded alongside an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub content_type: String,
    pub size: u64,
}

/// Object store contract
///
/// Objects are create-once: a key appears only after `put_object` finished
/// successfully and stays until `remove_object`. A failed or aborted put
/// leaves nothing behind.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Whether the configured bucket (or root directory) exists
    async fn bucket_exists(&self) -> StorageResult<bool>;

    /// Create the configured bucket
    async fn make_bucket(&self) -> StorageResult<()>;

    /// Create the bucket if it doesn't already exist
    async fn ensure_bucket(&self) -> StorageResult<()> {
        let exists = self.bucket_exists().await.map_err(|e| {
            StorageError::BackendError(format!("error checking bucket exists: {}", e))
        })?;
        if exists {
            return Ok(());
        }
        self.make_bucket()
            .await
            .map_err(|e| StorageError::BackendError(format!("error creating bucket: {}", e)))
    }

    /// Stream `reader` into a new object. `size` is a hint; `None` means unknown.
    async fn put_object(
        &self,
        key: &str,
        reader: ObjectReader,
        size: Option<u64>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Open a stream over an object's bytes
    async fn get_object(&self, key: &str) -> StorageResult<ByteStream>;

    /// Fetch object metadata; `StorageError::NotFound` when absent
    async fn stat_object(&self, key: &str) -> StorageResult<ObjectInfo>;

    /// Delete an object. Deleting an absent key is not an error.
    async fn remove_object(&self, key: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
