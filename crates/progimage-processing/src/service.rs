//! `ImageService` over object storage.

use crate::upload::{IdentifierGenerator, IngestOptions, IngestPipeline};
use async_trait::async_trait;
use futures::TryStreamExt;
use progimage_core::{Image, ImageData, ImageError, ImageService};
use progimage_storage::{Storage, StorageError};
use std::io;
use std::sync::Arc;
use tokio_util::io::StreamReader;

/// Stores images through the ingest pipeline and serves them straight from
/// the backend.
pub struct StorageImageService {
    storage: Arc<dyn Storage>,
    pipeline: IngestPipeline,
}

impl StorageImageService {
    pub fn new(
        storage: Arc<dyn Storage>,
        ids: Arc<dyn IdentifierGenerator>,
        options: IngestOptions,
    ) -> Self {
        let pipeline = IngestPipeline::new(Arc::clone(&storage), ids, options);
        Self { storage, pipeline }
    }
}

fn lookup_error(id: &str, err: StorageError) -> ImageError {
    match err {
        StorageError::NotFound(_) | StorageError::InvalidKey(_) => ImageError::NotFound,
        other => ImageError::backend(format!("error getting image {}", id), other),
    }
}

#[async_trait]
impl ImageService for StorageImageService {
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Image, ImageError> {
        let info = self
            .storage
            .stat_object(id)
            .await
            .map_err(|e| lookup_error(id, e))?;
        let stream = self
            .storage
            .get_object(id)
            .await
            .map_err(|e| lookup_error(id, e))?;

        let reader = StreamReader::new(stream.map_err(io::Error::other));
        Ok(Image::new(id, info.content_type, Box::pin(reader)))
    }

    async fn store(&self, data: ImageData) -> Result<String, ImageError> {
        self.pipeline.run(data).await
    }
}
