//! Upload pipeline: cap → sniff → (upload ∥ decode) → reconcile.
//!
//! The inbound stream is read once. Each chunk is forwarded through a relay
//! to a spawned upload task and also kept for the decoder. The relay is only
//! finished after the decoder accepts the data, so an upload never sees a
//! clean end-of-stream for an invalid image. If a backend commits anyway, the
//! object is removed again before the caller hears back.

use crate::image::{decode, sniff};
use crate::relay::{relay, RelayWriter};
use crate::upload::identifier::IdentifierGenerator;
use bytes::Bytes;
use progimage_core::constants::{
    DEFAULT_INGEST_TIMEOUT, MAX_UPLOAD_BYTES, READ_CHUNK_BYTES, RELAY_CAPACITY, SNIFF_LEN,
};
use progimage_core::{ImageData, ImageError};
use progimage_storage::{Storage, StorageError};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, Take};
use tokio::task::JoinHandle;

/// Limits applied to each ingested image.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Bytes past this ceiling are dropped; the image then fails to decode.
    pub max_bytes: u64,
    /// Deadline for the whole store operation; `None` waits indefinitely.
    pub deadline: Option<Duration>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            deadline: Some(DEFAULT_INGEST_TIMEOUT),
        }
    }
}

/// How the decode side finished.
enum Validation {
    Valid,
    Invalid(String),
    /// The upload task stopped reading before the stream ended.
    UploadClosed,
    Failed(ImageError),
}

/// How the upload task finished.
enum UploadOutcome {
    Stored,
    Failed(StorageError),
    Crashed(String),
    Expired,
}

/// Validates and persists inbound images.
pub struct IngestPipeline {
    storage: Arc<dyn Storage>,
    ids: Arc<dyn IdentifierGenerator>,
    options: IngestOptions,
}

impl IngestPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        ids: Arc<dyn IdentifierGenerator>,
        options: IngestOptions,
    ) -> Self {
        Self {
            storage,
            ids,
            options,
        }
    }

    /// Store `data`, returning the new image identifier.
    #[tracing::instrument(
        skip(self, data),
        fields(image_id = tracing::field::Empty, content_type = tracing::field::Empty)
    )]
    pub async fn run(&self, data: ImageData) -> Result<String, ImageError> {
        let mut source = data.take(self.options.max_bytes);

        let prefix = read_prefix(&mut source).await.map_err(|e| {
            tracing::debug!(error = %e, "Failed to read image prefix");
            ImageError::UnrecognisedImageType
        })?;
        let kind = sniff(&prefix).ok_or_else(|| {
            tracing::debug!(prefix_len = prefix.len(), "Upload is not a recognised image");
            ImageError::UnrecognisedImageType
        })?;

        let id = self.ids.generate();
        let span = tracing::Span::current();
        span.record("image_id", id.as_str());
        span.record("content_type", kind.content_type());

        let started = Instant::now();
        let (writer, reader) = relay(RELAY_CAPACITY);
        let mut upload = {
            let storage = Arc::clone(&self.storage);
            let key = id.clone();
            tokio::spawn(async move {
                storage
                    .put_object(
                        &key,
                        Box::pin(reader.into_async_read()),
                        None,
                        kind.content_type(),
                    )
                    .await
            })
        };

        let validation = match self.options.deadline {
            Some(limit) => tokio::time::timeout(limit, validate(prefix, source, writer))
                .await
                .unwrap_or_else(|_| Validation::Failed(deadline_exceeded(limit))),
            None => validate(prefix, source, writer).await,
        };

        let uploaded = self.await_upload(&mut upload, started).await;
        let result = self.reconcile(&id, validation, uploaded).await;

        if result.is_ok() {
            tracing::info!(
                image_id = %id,
                content_type = kind.content_type(),
                duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                "Image stored"
            );
        }
        result
    }

    async fn await_upload(
        &self,
        upload: &mut JoinHandle<Result<(), StorageError>>,
        started: Instant,
    ) -> UploadOutcome {
        let joined = match self.options.deadline {
            Some(limit) => {
                let remaining = limit.saturating_sub(started.elapsed());
                match tokio::time::timeout(remaining, &mut *upload).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        upload.abort();
                        return UploadOutcome::Expired;
                    }
                }
            }
            None => upload.await,
        };

        match joined {
            Ok(Ok(())) => UploadOutcome::Stored,
            Ok(Err(e)) => UploadOutcome::Failed(e),
            Err(e) => UploadOutcome::Crashed(e.to_string()),
        }
    }

    async fn reconcile(
        &self,
        id: &str,
        validation: Validation,
        uploaded: UploadOutcome,
    ) -> Result<String, ImageError> {
        match (validation, uploaded) {
            (Validation::Valid, UploadOutcome::Stored) => Ok(id.to_string()),
            (Validation::Valid | Validation::UploadClosed, UploadOutcome::Failed(e)) => {
                tracing::error!(error = %e, image_id = %id, "Image upload failed");
                Err(ImageError::backend("error uploading image to storage", e))
            }
            (Validation::Invalid(reason), UploadOutcome::Stored) => {
                tracing::debug!(image_id = %id, reason = %reason, "Stored upload failed validation");
                self.discard(id).await;
                Err(ImageError::UnrecognisedImageType)
            }
            (Validation::Invalid(reason), _) => {
                tracing::debug!(image_id = %id, reason = %reason, "Upload failed validation");
                Err(ImageError::UnrecognisedImageType)
            }
            (Validation::UploadClosed, UploadOutcome::Stored) => {
                self.discard(id).await;
                Err(ImageError::Internal(
                    "upload completed before the image stream ended".to_string(),
                ))
            }
            (Validation::Failed(err), UploadOutcome::Stored) => {
                self.discard(id).await;
                Err(err)
            }
            (Validation::Failed(err), UploadOutcome::Expired) => {
                self.discard(id).await;
                Err(err)
            }
            (Validation::Failed(err), _) => Err(err),
            (_, UploadOutcome::Expired) => {
                self.discard(id).await;
                Err(deadline_exceeded(self.options.deadline.unwrap_or_default()))
            }
            (_, UploadOutcome::Crashed(reason)) => {
                tracing::error!(image_id = %id, reason = %reason, "Upload task crashed");
                Err(ImageError::Internal(format!("upload task failed: {}", reason)))
            }
        }
    }

    /// Best-effort removal of an object that must not stay visible.
    async fn discard(&self, id: &str) {
        match self.storage.remove_object(id).await {
            Ok(()) => tracing::info!(image_id = %id, "Removed object that failed validation"),
            Err(e) => tracing::warn!(
                error = %e,
                image_id = %id,
                "Failed to remove orphaned object"
            ),
        }
    }
}

fn deadline_exceeded(after: Duration) -> ImageError {
    ImageError::DeadlineExceeded {
        operation: "store",
        after,
    }
}

/// Read up to `SNIFF_LEN` bytes, stopping early only at end of input.
async fn read_prefix<R>(reader: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = Vec::with_capacity(SNIFF_LEN);
    (&mut *reader)
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut prefix)
        .await?;
    Ok(prefix)
}

/// Forward the whole stream into the relay, then decode what was seen.
async fn validate(prefix: Vec<u8>, mut rest: Take<ImageData>, writer: RelayWriter) -> Validation {
    let mut seen = prefix;
    if writer.send(Bytes::copy_from_slice(&seen)).await.is_err() {
        return Validation::UploadClosed;
    }

    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match rest.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let bytes = Bytes::copy_from_slice(&chunk[..n]);
                seen.extend_from_slice(&bytes);
                if writer.send(bytes).await.is_err() {
                    return Validation::UploadClosed;
                }
            }
            Err(e) => {
                writer.abort(format!("inbound stream failed: {}", e));
                return Validation::Invalid(format!("error reading image data: {}", e));
            }
        }
    }

    match tokio::task::spawn_blocking(move || decode(&seen).map(|_| ())).await {
        Ok(Ok(())) => {
            writer.finish().await;
            Validation::Valid
        }
        Ok(Err(e)) => {
            writer.abort(format!("image failed to decode: {}", e));
            Validation::Invalid(e.to_string())
        }
        Err(e) => {
            writer.abort("image decoder crashed");
            Validation::Failed(ImageError::Internal(format!("image decoder failed: {}", e)))
        }
    }
}
