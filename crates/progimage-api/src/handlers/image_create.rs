use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{body::Body, extract::State, http::StatusCode, response::IntoResponse, Json};
use futures::TryStreamExt;
use progimage_core::StoredImageResponse;
use std::io;
use std::sync::Arc;
use tokio_util::io::StreamReader;

/// `POST /image/create`: stream the request body into storage.
///
/// The body is never buffered here; the service enforces the size ceiling.
#[tracing::instrument(skip(state, body), fields(operation = "create_image"))]
pub async fn create_image(
    State(state): State<Arc<AppState>>,
    body: Body,
) -> Result<impl IntoResponse, HttpAppError> {
    let reader = StreamReader::new(body.into_data_stream().map_err(io::Error::other));

    let id = state.images.store(Box::pin(reader)).await?;

    Ok((StatusCode::CREATED, Json(StoredImageResponse { id })))
}
