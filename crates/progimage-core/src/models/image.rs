use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Image bytes as a one-shot, non-seekable stream.
pub type ImageData = Pin<Box<dyn AsyncRead + Send>>;

/// An image flowing between ingestion, storage and transformation.
///
/// `data` can be read exactly once; whoever holds the `Image` owns the stream.
pub struct Image {
    pub id: String,
    pub content_type: String,
    pub data: ImageData,
}

impl Image {
    pub fn new(id: impl Into<String>, content_type: impl Into<String>, data: ImageData) -> Self {
        Self {
            id: id.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// The recognised kind for this image's content type, if any.
    pub fn kind(&self) -> Option<ImageKind> {
        ImageKind::from_content_type(&self.content_type)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Image formats the service can decode and encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
}

impl ImageKind {
    pub const ALL: [ImageKind; 3] = [ImageKind::Png, ImageKind::Jpeg, ImageKind::Gif];

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
        }
    }

    /// Short token used in URLs, e.g. `/image/{id}.jpg`.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        // Stored metadata may carry parameters, e.g. "image/png; charset=binary"
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        ImageKind::ALL
            .into_iter()
            .find(|kind| kind.content_type() == essence)
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Body returned by the create endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImageResponse {
    pub id: String,
}
