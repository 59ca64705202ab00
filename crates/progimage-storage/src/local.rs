use crate::keys::validate_key;
use crate::traits::{ByteStream, ObjectInfo, ObjectReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

const METADATA_SUFFIX: &str = ".meta.json";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Sidecar written next to each object.
#[derive(Debug, Serialize, Deserialize)]
struct ObjectMetadata {
    content_type: String,
}

/// Local filesystem storage implementation
///
/// The base directory plays the role of the bucket. Uploads land in a hidden
/// temporary file and are renamed into place only once fully synced, so a
/// key never refers to partial data.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// # Arguments
    /// * `base_path` - Root directory for object storage (e.g., "/var/lib/progimage")
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        LocalStorage {
            base_path: base_path.into(),
        }
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    fn metadata_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(METADATA_SUFFIX);
        PathBuf::from(name)
    }

    fn temp_path(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.{}.partial", file_name, Uuid::new_v4()))
    }

    /// Write the sidecar, then move the object into place.
    async fn finalize(
        temp: &Path,
        path: &Path,
        metadata_path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        let metadata = serde_json::to_vec(&ObjectMetadata {
            content_type: content_type.to_string(),
        })
        .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        fs::write(metadata_path, metadata).await?;

        fs::rename(temp, path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to finalize file {}: {}", path.display(), e))
        })
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_stream(temp: &Path, reader: &mut ObjectReader) -> io::Result<u64> {
        let mut file = fs::File::create(temp).await?;
        let written = tokio::io::copy(reader, &mut file).await?;
        file.sync_all().await?;
        Ok(written)
    }

    async fn read_content_type(path: &Path) -> String {
        let raw = match fs::read(Self::metadata_path(path)).await {
            Ok(raw) => raw,
            Err(_) => return DEFAULT_CONTENT_TYPE.to_string(),
        };
        match serde_json::from_slice::<ObjectMetadata>(&raw) {
            Ok(meta) => meta.content_type,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Unreadable object metadata, using default content type"
                );
                DEFAULT_CONTENT_TYPE.to_string()
            }
        }
    }
}

async fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn bucket_exists(&self) -> StorageResult<bool> {
        Ok(fs::try_exists(&self.base_path).await?)
    }

    async fn make_bucket(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                self.base_path.display(),
                e
            ))
        })
    }

    async fn put_object(
        &self,
        key: &str,
        mut reader: ObjectReader,
        _size: Option<u64>,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        let temp = Self::temp_path(&path);
        let written = match Self::write_stream(&temp, &mut reader).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup_err) = remove_if_present(&temp).await {
                    tracing::warn!(
                        error = %cleanup_err,
                        path = %temp.display(),
                        "Failed to remove partial upload"
                    );
                }
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write stream to file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let metadata_path = Self::metadata_path(&path);
        if let Err(e) = Self::finalize(&temp, &path, &metadata_path, content_type).await {
            for leftover in [&temp, &metadata_path] {
                if let Err(cleanup_err) = remove_if_present(leftover).await {
                    tracing::warn!(
                        error = %cleanup_err,
                        path = %leftover.display(),
                        "Failed to remove partial upload"
                    );
                }
            }
            return Err(e);
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn get_object(&self, key: &str) -> StorageResult<ByteStream> {
        let path = self.key_to_path(key)?;
        let file = fs::File::open(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::DownloadFailed(format!(
                "Failed to open file {}: {}",
                path.display(),
                e
            )),
        })?;

        let stream = ReaderStream::new(file).map(|chunk| chunk.map_err(StorageError::from));
        Ok(Box::pin(stream))
    }

    async fn stat_object(&self, key: &str) -> StorageResult<ObjectInfo> {
        let path = self.key_to_path(key)?;
        let meta = fs::metadata(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::BackendError(e.to_string()),
        })?;

        Ok(ObjectInfo {
            key: key.to_string(),
            content_type: Self::read_content_type(&path).await,
            size: meta.len(),
        })
    }

    async fn remove_object(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        remove_if_present(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;
        remove_if_present(&Self::metadata_path(&path))
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
