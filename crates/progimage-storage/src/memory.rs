use crate::object;
use crate::traits::{ByteStream, ObjectInfo, ObjectReader, Storage, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::sync::Arc;

/// In-process storage backed by `object_store`'s in-memory store.
///
/// Contents vanish with the process; intended for tests and local demos.
#[derive(Clone)]
pub struct MemoryStorage {
    store: Arc<dyn ObjectStore>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn bucket_exists(&self) -> StorageResult<bool> {
        Ok(true)
    }

    async fn make_bucket(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        reader: ObjectReader,
        _size: Option<u64>,
        content_type: &str,
    ) -> StorageResult<()> {
        let written = object::put_stream(&self.store, key, reader, content_type).await?;
        tracing::debug!(key = %key, size_bytes = written, "Memory storage upload successful");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> StorageResult<ByteStream> {
        object::get_stream(&self.store, key).await
    }

    async fn stat_object(&self, key: &str) -> StorageResult<ObjectInfo> {
        object::stat(&self.store, key).await
    }

    async fn remove_object(&self, key: &str) -> StorageResult<()> {
        object::remove(&self.store, key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
