//! Shared application state.

use progimage_core::ImageService;
use progimage_processing::TransformerRegistry;
use std::sync::Arc;
use std::time::Duration;

/// State handed to every handler.
///
/// Both collaborators are read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub images: Arc<dyn ImageService>,
    pub transformers: Arc<TransformerRegistry>,
    /// Deadline applied to format conversions; `None` disables it.
    pub transform_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(
        images: Arc<dyn ImageService>,
        transformers: TransformerRegistry,
        transform_timeout: Option<Duration>,
    ) -> Self {
        Self {
            images,
            transformers: Arc::new(transformers),
            transform_timeout,
        }
    }
}
