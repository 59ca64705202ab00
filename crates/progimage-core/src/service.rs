use async_trait::async_trait;

use crate::error::ImageError;
use crate::models::{Image, ImageData};

/// Store and fetch images by identifier.
///
/// Implemented over object storage by the processing crate and over HTTP by
/// the API client.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Fetch a stored image. Absent identifiers yield `ImageError::NotFound`.
    async fn get(&self, id: &str) -> Result<Image, ImageError>;

    /// Validate and persist an image stream, returning its new identifier.
    ///
    /// Data that does not decode as a supported image yields
    /// `ImageError::UnrecognisedImageType`.
    async fn store(&self, data: ImageData) -> Result<String, ImageError>;
}
