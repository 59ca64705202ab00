//! ProgImage Core Library
//!
//! Domain models, the `ImageService` contract, error types and configuration
//! shared by every ProgImage component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod service;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ImageServiceConfig, LogFormat};
pub use error::{AppError, BoxError, ErrorMetadata, ImageError, LogLevel};
pub use models::{Image, ImageData, ImageKind, StoredImageResponse};
pub use service::ImageService;
pub use storage_types::StorageBackend;
