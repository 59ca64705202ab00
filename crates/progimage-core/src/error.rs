//! Error types module
//!
//! `ImageError` is the contract-level error returned by every `ImageService`
//! implementation. Collaborators are only expected to special-case `NotFound`
//! and `UnrecognisedImageType`; everything else is an opaque backend failure.
//!
//! `AppError` is the HTTP-facing taxonomy. It self-describes its response
//! characteristics through `ErrorMetadata`.

use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found")]
    NotFound,

    #[error("unrecognised image data")]
    UnrecognisedImageType,

    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("{operation} did not finish within {after:?}")]
    DeadlineExceeded {
        operation: &'static str,
        after: Duration,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImageError {
    /// Wrap a transport or storage failure with context.
    pub fn backend(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ImageError::Backend {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like validation failures
    Debug,
    /// Recoverable issues
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unrecognised image type: {0}")]
    UnrecognisedImageType(String),

    #[error("Unsupported image type: {0}")]
    UnsupportedImageType(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::NotFound => AppError::NotFound(err.to_string()),
            ImageError::UnrecognisedImageType => AppError::UnrecognisedImageType(err.to_string()),
            ImageError::Backend { .. } => AppError::Storage(err.to_string()),
            ImageError::DeadlineExceeded { .. } => AppError::Timeout(err.to_string()),
            ImageError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::UnrecognisedImageType(_) => (
            400,
            "UNRECOGNISED_IMAGE_TYPE",
            false,
            Some("Upload a PNG, JPEG or GIF image"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedImageType(_) => (
            400,
            "UNSUPPORTED_IMAGE_TYPE",
            false,
            Some("Request one of the supported extensions: png, jpg, gif"),
            false,
            LogLevel::Debug,
        ),
        AppError::ImageProcessing(_) => (
            500,
            "IMAGE_PROCESSING_ERROR",
            false,
            Some("Request the image in its original format"),
            true,
            LogLevel::Error,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the image ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Timeout(_) => (
            504,
            "DEADLINE_EXCEEDED",
            true,
            Some("Retry with a smaller image"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Storage(_) => "Storage",
            AppError::UnrecognisedImageType(_) => "UnrecognisedImageType",
            AppError::UnsupportedImageType(_) => "UnsupportedImageType",
            AppError::ImageProcessing(_) => "ImageProcessing",
            AppError::NotFound(_) => "NotFound",
            AppError::Timeout(_) => "Timeout",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::ImageProcessing(_) => "Failed to convert image".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::UnrecognisedImageType(msg)
            | AppError::UnsupportedImageType(msg)
            | AppError::NotFound(msg)
            | AppError::Timeout(msg) => msg.clone(),
        }
    }
}
