//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`. Domain errors convert into
//! `AppError` first so every failure renders with the same status, body and
//! log level.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use progimage_core::{AppError, ErrorMetadata, ImageError, LogLevel};
use progimage_processing::TransformError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    fn from_app_error(err: &AppError, with_details: bool) -> Self {
        Self {
            error: err.client_message(),
            details: with_details.then(|| err.detailed_message()),
            error_type: with_details.then(|| err.error_type().to_string()),
            code: err.error_code().to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action().map(String::from),
        }
    }
}

/// Wrapper so `IntoResponse` can be implemented for the core `AppError`.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<ImageError> for HttpAppError {
    fn from(err: ImageError) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<TransformError> for HttpAppError {
    fn from(err: TransformError) -> Self {
        let app = match err {
            TransformError::Read { .. } => AppError::Storage(err.to_string()),
            TransformError::Decode { .. } | TransformError::Encode { .. } => {
                AppError::ImageProcessing(err.to_string())
            }
            TransformError::DeadlineExceeded(_) => AppError::Timeout(err.to_string()),
            TransformError::Interrupted => AppError::Internal(err.to_string()),
        };
        HttpAppError(app)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Request failed");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.eq_ignore_ascii_case("production") || env.eq_ignore_ascii_case("prod"))
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let with_details = !is_production_env() && !app_error.is_sensitive();
        let body = ErrorResponse::from_app_error(app_error, with_details);

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    #[test]
    fn test_image_sentinels_map_to_statuses() {
        let HttpAppError(err) = ImageError::NotFound.into();
        assert_eq!(err.http_status_code(), 404);

        let HttpAppError(err) = ImageError::UnrecognisedImageType.into();
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.client_message(), "unrecognised image data");
    }

    #[test]
    fn test_transform_errors_are_server_errors() {
        let decode = TransformError::Decode {
            content_type: "image/png".to_string(),
            source: image_error(),
        };
        let HttpAppError(err) = decode.into();
        assert!(matches!(err, AppError::ImageProcessing(_)));
        assert_eq!(err.http_status_code(), 500);

        let read = TransformError::Read {
            content_type: "image/gif".to_string(),
            source: io::Error::other("connection reset"),
        };
        let HttpAppError(err) = read.into();
        assert!(matches!(err, AppError::Storage(_)));

        let HttpAppError(err) = TransformError::DeadlineExceeded(Duration::from_secs(1)).into();
        assert_eq!(err.http_status_code(), 504);
    }

    fn image_error() -> image::ImageError {
        image::ImageError::IoError(io::Error::other("bad data"))
    }

    #[test]
    fn test_error_response_shape() {
        let err = AppError::NotFound("image abc not found".to_string());
        let json = serde_json::to_value(ErrorResponse::from_app_error(&err, true)).unwrap();
        assert_eq!(json["error"], "image abc not found");
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["recoverable"], false);
        assert_eq!(json["error_type"], "NotFound");

        let json = serde_json::to_value(ErrorResponse::from_app_error(&err, false)).unwrap();
        assert!(json.get("details").is_none());
        assert!(json.get("error_type").is_none());
    }
}
