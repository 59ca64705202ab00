//! Shared plumbing for backends built on the `object_store` crate.

use crate::keys::validate_key;
use crate::traits::{ByteStream, ObjectInfo, ObjectReader, StorageError, StorageResult};
use futures::StreamExt;
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{Attribute, Attributes, GetOptions, ObjectStore, ObjectStoreExt};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

fn location(key: &str) -> StorageResult<Path> {
    validate_key(key)?;
    Ok(Path::from(key))
}

fn map_read_error(key: &str, err: ObjectStoreError) -> StorageError {
    match err {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
        other => StorageError::DownloadFailed(other.to_string()),
    }
}

/// Stream `reader` into `key`, returning the number of bytes written.
///
/// Small bodies are sent with a single put; larger ones switch to a multipart
/// upload. Nothing becomes visible until `shutdown` completes.
pub(crate) async fn put_stream(
    store: &Arc<dyn ObjectStore>,
    key: &str,
    mut reader: ObjectReader,
    content_type: &str,
) -> StorageResult<u64> {
    let location = location(key)?;

    let mut attributes = Attributes::new();
    attributes.insert(Attribute::ContentType, content_type.to_string().into());
    let mut writer = BufWriter::new(Arc::clone(store), location).with_attributes(attributes);

    match tokio::io::copy(&mut reader, &mut writer).await {
        Ok(written) => {
            writer
                .shutdown()
                .await
                .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
            Ok(written)
        }
        Err(e) => {
            if let Err(abort_err) = writer.abort().await {
                tracing::warn!(
                    error = %abort_err,
                    key = %key,
                    "Failed to abort partial upload"
                );
            }
            Err(StorageError::UploadFailed(e.to_string()))
        }
    }
}

pub(crate) async fn get_stream(store: &Arc<dyn ObjectStore>, key: &str) -> StorageResult<ByteStream> {
    let location = location(key)?;
    let result = store
        .get_opts(&location, GetOptions::default())
        .await
        .map_err(|e| map_read_error(key, e))?;

    let stream = result
        .into_stream()
        .map(|chunk| chunk.map_err(|e| StorageError::DownloadFailed(e.to_string())));
    Ok(Box::pin(stream))
}

pub(crate) async fn stat(store: &Arc<dyn ObjectStore>, key: &str) -> StorageResult<ObjectInfo> {
    let location = location(key)?;
    let options = GetOptions {
        head: true,
        ..Default::default()
    };
    let result = store
        .get_opts(&location, options)
        .await
        .map_err(|e| map_read_error(key, e))?;

    let content_type = result
        .attributes
        .get(&Attribute::ContentType)
        .map(|value| AsRef::<str>::as_ref(value).to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    Ok(ObjectInfo {
        key: key.to_string(),
        content_type,
        size: result.meta.size as u64,
    })
}

pub(crate) async fn remove(store: &Arc<dyn ObjectStore>, key: &str) -> StorageResult<()> {
    let location = location(key)?;
    match store.delete(&location).await {
        Ok(()) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
        Err(e) => Err(StorageError::DeleteFailed(e.to_string())),
    }
}
