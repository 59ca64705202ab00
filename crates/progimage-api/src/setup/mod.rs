//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use progimage_core::Config;
use progimage_processing::{IngestOptions, StorageImageService, TransformerRegistry, UuidGenerator};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let storage = storage::setup_storage(&config).await?;

    let images = StorageImageService::new(
        storage,
        Arc::new(UuidGenerator),
        IngestOptions {
            max_bytes: config.max_upload_bytes(),
            deadline: config.ingest_timeout(),
        },
    );
    let state = Arc::new(AppState::new(
        Arc::new(images),
        TransformerRegistry::standard(),
        config.transform_timeout(),
    ));

    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
