//! Storage setup and initialization

use anyhow::Result;
use progimage_core::Config;
use progimage_storage::{create_storage, Storage};
use std::sync::Arc;

/// Build the configured backend and, when asked to, make sure its bucket exists.
///
/// A failure to create the bucket is logged rather than fatal; requests will
/// surface the problem if it persists.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage...");
    let storage = create_storage(config).await?;
    tracing::info!(
        backend = %storage.backend_type(),
        "Storage initialized successfully"
    );

    if config.ensure_bucket() {
        match storage.ensure_bucket().await {
            Ok(()) => tracing::info!("Storage bucket ready"),
            Err(e) => tracing::error!(error = %e, "Failed to ensure storage bucket exists"),
        }
    }

    Ok(storage)
}
