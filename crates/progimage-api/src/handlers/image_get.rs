use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use futures::{stream, StreamExt};
use progimage_core::{AppError, Image, ImageError};
use progimage_processing::{EncodeCompletion, Transformer};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

/// `GET /image/{id}` and `GET /image/{id}.{ext}`.
///
/// A segment that splits on `.` into exactly two parts asks for a conversion;
/// anything else is treated as a plain identifier.
#[tracing::instrument(skip(state), fields(operation = "get_image"))]
pub async fn get_image(
    Path(segment): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, HttpAppError> {
    let parts: Vec<&str> = segment.split('.').collect();
    if let [id, ext] = parts.as_slice() {
        return get_converted(&state, id, ext).await;
    }

    let image = fetch(&state, &segment).await?;
    let body = Body::from_stream(ReaderStream::new(image.data));
    Ok(stream_image(image.content_type, body))
}

async fn get_converted(state: &AppState, id: &str, ext: &str) -> Result<Response, HttpAppError> {
    let transformer: Transformer = state
        .transformers
        .get(ext)
        .copied()
        .ok_or_else(|| AppError::UnsupportedImageType("unsupported image type".to_string()))?;

    let image = fetch(state, id).await?;
    let from = image.content_type.clone();
    let to = transformer.content_type();

    let (output, completion) = transformer
        .transform_with_deadline(image, state.transform_timeout)
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, image_id = %id, from = %from, to = to, "Image conversion failed");
        })?;

    let mut chunks = ReaderStream::new(output.data);

    // Headers are only committed once the encoder has produced something.
    let first = match chunks.next().await {
        Some(Ok(first)) => first,
        Some(Err(read_err)) => {
            // The encoder's own error says more than the relay's.
            let err = match completion.wait().await {
                Err(e) => HttpAppError::from(e),
                Ok(()) => HttpAppError(AppError::ImageProcessing(read_err.to_string())),
            };
            tracing::error!(image_id = %id, from = %from, to = to, "Image conversion failed before first byte");
            return Err(err);
        }
        None => {
            completion.wait().await?;
            return Ok(stream_image(to.to_string(), Body::empty()));
        }
    };

    report_late_failure(completion, id.to_string(), from, to);

    let body = Body::from_stream(stream::once(async move { Ok(first) }).chain(chunks));
    Ok(stream_image(to.to_string(), body))
}

/// Log an encode failure that happens after the 200 has been sent.
fn report_late_failure(completion: EncodeCompletion, id: String, from: String, to: &'static str) {
    tokio::spawn(async move {
        if let Err(e) = completion.wait().await {
            tracing::error!(
                error = %e,
                "error converting {} to {} (id: {}), 200 sent already",
                from,
                to,
                id
            );
        }
    });
}

async fn fetch(state: &AppState, id: &str) -> Result<Image, HttpAppError> {
    state.images.get(id).await.map_err(|e| match e {
        ImageError::NotFound => HttpAppError(AppError::NotFound(format!("image {} not found", id))),
        other => HttpAppError::from(other),
    })
}

fn stream_image(content_type: String, body: Body) -> Response {
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}
