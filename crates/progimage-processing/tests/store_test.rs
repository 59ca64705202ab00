//! Store/get behaviour of `StorageImageService` against real and misbehaving backends.
//!
//! Run with: `cargo test -p progimage-processing --test store_test`

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use progimage_core::{ImageData, ImageError, ImageService, StorageBackend};
use progimage_processing::{IdentifierGenerator, IngestOptions, StorageImageService};
use progimage_storage::{
    ByteStream, LocalStorage, MemoryStorage, ObjectInfo, ObjectReader, Storage, StorageError,
    StorageResult,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Hands out `img-1`, `img-2`, ...
#[derive(Default)]
struct SequenceGenerator(AtomicUsize);

impl IdentifierGenerator for SequenceGenerator {
    fn generate(&self) -> String {
        format!("img-{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

fn create_test_image(format: ImageFormat) -> Vec<u8> {
    let img = RgbaImage::from_pixel(16, 16, Rgba([0, 128, 255, 255]));
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
        _ => DynamicImage::ImageRgba8(img),
    };
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
    buffer
}

fn data(bytes: Vec<u8>) -> ImageData {
    Box::pin(Cursor::new(bytes))
}

fn service_with(storage: Arc<dyn Storage>, options: IngestOptions) -> StorageImageService {
    StorageImageService::new(storage, Arc::new(SequenceGenerator::default()), options)
}

/// Wraps a backend and counts calls.
struct CountingStorage<S> {
    inner: S,
    puts: AtomicUsize,
    removes: AtomicUsize,
}

impl<S> CountingStorage<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            puts: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<S: Storage> Storage for CountingStorage<S> {
    async fn bucket_exists(&self) -> StorageResult<bool> {
        self.inner.bucket_exists().await
    }

    async fn make_bucket(&self) -> StorageResult<()> {
        self.inner.make_bucket().await
    }

    async fn put_object(
        &self,
        key: &str,
        reader: ObjectReader,
        size: Option<u64>,
        content_type: &str,
    ) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_object(key, reader, size, content_type).await
    }

    async fn get_object(&self, key: &str) -> StorageResult<ByteStream> {
        self.inner.get_object(key).await
    }

    async fn stat_object(&self, key: &str) -> StorageResult<ObjectInfo> {
        self.inner.stat_object(key).await
    }

    async fn remove_object(&self, key: &str) -> StorageResult<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_object(key).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}

/// A backend that commits whatever it read, even when the stream failed.
struct CommitAnywayStorage {
    inner: MemoryStorage,
    fail_remove: bool,
    removes: AtomicUsize,
}

impl CommitAnywayStorage {
    fn new(fail_remove: bool) -> Self {
        Self {
            inner: MemoryStorage::new(),
            fail_remove,
            removes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Storage for CommitAnywayStorage {
    async fn bucket_exists(&self) -> StorageResult<bool> {
        Ok(true)
    }

    async fn make_bucket(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        mut reader: ObjectReader,
        _size: Option<u64>,
        content_type: &str,
    ) -> StorageResult<()> {
        let mut seen = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => seen.extend_from_slice(&chunk[..n]),
            }
        }
        self.inner
            .put_object(key, Box::pin(Cursor::new(seen)), None, content_type)
            .await
    }

    async fn get_object(&self, key: &str) -> StorageResult<ByteStream> {
        self.inner.get_object(key).await
    }

    async fn stat_object(&self, key: &str) -> StorageResult<ObjectInfo> {
        self.inner.stat_object(key).await
    }

    async fn remove_object(&self, key: &str) -> StorageResult<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        if self.fail_remove {
            return Err(StorageError::DeleteFailed("backend unavailable".to_string()));
        }
        self.inner.remove_object(key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// A backend whose uploads fail immediately or never finish.
struct BrokenUploadStorage {
    hang: bool,
}

#[async_trait]
impl Storage for BrokenUploadStorage {
    async fn bucket_exists(&self) -> StorageResult<bool> {
        Ok(true)
    }

    async fn make_bucket(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn put_object(
        &self,
        _key: &str,
        _reader: ObjectReader,
        _size: Option<u64>,
        _content_type: &str,
    ) -> StorageResult<()> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        Err(StorageError::UploadFailed("connection reset".to_string()))
    }

    async fn get_object(&self, key: &str) -> StorageResult<ByteStream> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn stat_object(&self, key: &str) -> StorageResult<ObjectInfo> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn remove_object(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

async fn read_image(service: &StorageImageService, id: &str) -> (String, Vec<u8>) {
    let image = service.get(id).await.unwrap();
    let content_type = image.content_type.clone();
    let mut data = image.data;
    let mut out = Vec::new();
    data.read_to_end(&mut out).await.unwrap();
    (content_type, out)
}

#[tokio::test]
async fn test_store_then_get_round_trips_each_format() {
    let service = service_with(Arc::new(MemoryStorage::new()), IngestOptions::default());

    for (n, (format, content_type)) in [
        (ImageFormat::Png, "image/png"),
        (ImageFormat::Jpeg, "image/jpeg"),
        (ImageFormat::Gif, "image/gif"),
    ]
    .into_iter()
    .enumerate()
    {
        let bytes = create_test_image(format);
        let id = service.store(data(bytes.clone())).await.unwrap();
        assert_eq!(id, format!("img-{}", n + 1));

        let (stored_type, stored) = read_image(&service, &id).await;
        assert_eq!(stored_type, content_type);
        assert_eq!(stored, bytes);
    }
}

#[tokio::test]
async fn test_store_on_local_storage() {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(temp_dir.path());
    storage.ensure_bucket().await.unwrap();
    let service = service_with(Arc::new(storage), IngestOptions::default());

    let bytes = create_test_image(ImageFormat::Png);
    let id = service.store(data(bytes.clone())).await.unwrap();

    let (content_type, stored) = read_image(&service, &id).await;
    assert_eq!(content_type, "image/png");
    assert_eq!(stored, bytes);
}

#[tokio::test]
async fn test_unrecognised_prefix_never_reaches_storage() {
    let storage = Arc::new(CountingStorage::new(MemoryStorage::new()));
    let service = service_with(storage.clone(), IngestOptions::default());

    for input in [Vec::new(), b"hello, world".to_vec(), vec![0u8; 4096]] {
        let err = service.store(data(input)).await.unwrap_err();
        assert!(matches!(err, ImageError::UnrecognisedImageType));
    }
    assert_eq!(storage.puts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_corrupt_image_is_rejected_and_not_stored() {
    let storage = Arc::new(CountingStorage::new(MemoryStorage::new()));
    let service = service_with(storage.clone(), IngestOptions::default());

    let mut corrupt = b"\x89PNG\r\n\x1a\n".to_vec();
    corrupt.extend_from_slice(&[0xAB; 2048]);

    for _ in 0..2 {
        let err = service.store(data(corrupt.clone())).await.unwrap_err();
        assert!(matches!(err, ImageError::UnrecognisedImageType));
    }

    assert_eq!(storage.puts.load(Ordering::SeqCst), 2);
    for id in ["img-1", "img-2"] {
        assert!(matches!(service.get(id).await, Err(ImageError::NotFound)));
    }
}

#[tokio::test]
async fn test_object_committed_despite_abort_is_removed() {
    let storage = Arc::new(CommitAnywayStorage::new(false));
    let service = service_with(storage.clone(), IngestOptions::default());

    let mut png = create_test_image(ImageFormat::Png);
    png.truncate(png.len() / 2);

    let err = service.store(data(png)).await.unwrap_err();
    assert!(matches!(err, ImageError::UnrecognisedImageType));
    assert_eq!(storage.removes.load(Ordering::SeqCst), 1);
    assert!(storage.stat_object("img-1").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_failed_cleanup_still_reports_unrecognised() {
    let storage = Arc::new(CommitAnywayStorage::new(true));
    let service = service_with(storage.clone(), IngestOptions::default());

    let mut gif = create_test_image(ImageFormat::Gif);
    gif.truncate(12);

    let err = service.store(data(gif)).await.unwrap_err();
    assert!(matches!(err, ImageError::UnrecognisedImageType));
    assert_eq!(storage.removes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_oversized_upload_is_truncated_and_rejected() {
    let bytes = create_test_image(ImageFormat::Png);
    let options = IngestOptions {
        max_bytes: (bytes.len() / 2) as u64,
        ..IngestOptions::default()
    };
    let service = service_with(Arc::new(MemoryStorage::new()), options);

    let err = service.store(data(bytes)).await.unwrap_err();
    assert!(matches!(err, ImageError::UnrecognisedImageType));
    assert!(matches!(service.get("img-1").await, Err(ImageError::NotFound)));
}

/// A gradient so the entropy-coded scan is long enough to cut in half.
fn create_large_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_fn(256, 256, |x, y| {
        image::Rgb([x as u8, y as u8, ((x + y) / 2) as u8])
    });
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .unwrap();
    buffer
}

#[tokio::test]
async fn test_truncated_jpeg_is_rejected_and_not_kept() {
    let storage = Arc::new(CountingStorage::new(MemoryStorage::new()));
    let service = service_with(storage.clone(), IngestOptions::default());

    let mut jpeg = create_large_jpeg();
    jpeg.truncate(jpeg.len() / 2);

    let err = service.store(data(jpeg)).await.unwrap_err();
    assert!(matches!(err, ImageError::UnrecognisedImageType));
    assert!(matches!(service.get("img-1").await, Err(ImageError::NotFound)));
}

#[tokio::test]
async fn test_jpeg_cut_at_ceiling_is_rejected() {
    let bytes = create_large_jpeg();
    let options = IngestOptions {
        max_bytes: (bytes.len() / 2) as u64,
        ..IngestOptions::default()
    };
    let service = service_with(Arc::new(MemoryStorage::new()), options);

    let err = service.store(data(bytes)).await.unwrap_err();
    assert!(matches!(err, ImageError::UnrecognisedImageType));
    assert!(matches!(service.get("img-1").await, Err(ImageError::NotFound)));
}

#[tokio::test]
async fn test_backend_upload_failure_is_a_backend_error() {
    let service = service_with(
        Arc::new(BrokenUploadStorage { hang: false }),
        IngestOptions::default(),
    );

    let err = service
        .store(data(create_test_image(ImageFormat::Jpeg)))
        .await
        .unwrap_err();
    match err {
        ImageError::Backend { context, .. } => {
            assert_eq!(context, "error uploading image to storage")
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stalled_upload_hits_deadline() {
    let options = IngestOptions {
        deadline: Some(Duration::from_millis(100)),
        ..IngestOptions::default()
    };
    let service = service_with(Arc::new(BrokenUploadStorage { hang: true }), options);

    let err = service
        .store(data(create_test_image(ImageFormat::Png)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ImageError::DeadlineExceeded {
            operation: "store",
            ..
        }
    ));
}

#[tokio::test]
async fn test_get_unknown_or_invalid_id_is_not_found() {
    let service = service_with(Arc::new(MemoryStorage::new()), IngestOptions::default());

    assert!(matches!(service.get("missing").await, Err(ImageError::NotFound)));
    assert!(matches!(service.get("../etc/passwd").await, Err(ImageError::NotFound)));
}
