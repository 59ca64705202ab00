//! Format conversion of stored images.
//!
//! A conversion has two phases. Decoding happens before `transform` returns,
//! so its failures come back directly. Encoding runs on a blocking thread and
//! streams into the returned image while the caller reads it. An encode
//! failure then surfaces twice: the output stream errors, and the
//! [`EncodeCompletion`] resolves to the error. Once any output has been
//! delivered downstream the completion is the only place the cause is
//! reported, and it can only be logged.

use crate::image::decode::decode;
use crate::relay::{relay, BlockingRelayWriter};
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Frame, ImageResult};
use progimage_core::constants::RELAY_CAPACITY;
use progimage_core::{Image, ImageKind};
use std::io::{self, BufWriter, Write};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;

const JPEG_QUALITY: u8 = 75;
const GIF_ENCODE_SPEED: i32 = 10;
const ENCODE_BUFFER_BYTES: usize = 64 * 1024;

/// Writes a decoded image into a byte sink in one format.
pub type EncodeFn = fn(&mut dyn Write, &DynamicImage) -> ImageResult<()>;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("unable to read {content_type} image: {source}")]
    Read {
        content_type: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to decode {content_type} image: {source}")]
    Decode {
        content_type: String,
        #[source]
        source: image::ImageError,
    },

    #[error("unable to encode {format} image: {source}")]
    Encode {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("image conversion did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("image encoder stopped without reporting a result")]
    Interrupted,
}

/// Deferred outcome of the encode phase.
///
/// Only meaningful once the output stream has been fully drained.
#[must_use = "encode failures are only reported through the completion"]
#[derive(Debug)]
pub struct EncodeCompletion {
    rx: Option<oneshot::Receiver<Result<(), TransformError>>>,
}

impl EncodeCompletion {
    /// A completion that has already succeeded (pass-through).
    pub fn ready() -> Self {
        Self { rx: None }
    }

    fn pending(rx: oneshot::Receiver<Result<(), TransformError>>) -> Self {
        Self { rx: Some(rx) }
    }

    pub async fn wait(self) -> Result<(), TransformError> {
        match self.rx {
            None => Ok(()),
            Some(rx) => rx.await.unwrap_or(Err(TransformError::Interrupted)),
        }
    }
}

/// Converts images into a single target format. Stateless and `Copy`.
#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    name: &'static str,
    kind: ImageKind,
    encode: EncodeFn,
}

impl Transformer {
    pub const fn new(name: &'static str, kind: ImageKind, encode: EncodeFn) -> Self {
        Self { name, kind, encode }
    }

    pub const fn png() -> Self {
        Self::new("png", ImageKind::Png, encode_png)
    }

    pub const fn jpeg() -> Self {
        Self::new("jpeg", ImageKind::Jpeg, encode_jpeg)
    }

    pub const fn gif() -> Self {
        Self::new("gif", ImageKind::Gif, encode_gif)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn content_type(&self) -> &'static str {
        self.kind.content_type()
    }

    /// Convert `source` without a deadline.
    pub async fn transform(
        &self,
        source: Image,
    ) -> Result<(Image, EncodeCompletion), TransformError> {
        self.transform_with_deadline(source, None).await
    }

    /// Convert `source`, giving up on reading or encoding once `deadline` elapses.
    pub async fn transform_with_deadline(
        &self,
        source: Image,
        deadline: Option<Duration>,
    ) -> Result<(Image, EncodeCompletion), TransformError> {
        if source.kind() == Some(self.kind) {
            return Ok((source, EncodeCompletion::ready()));
        }

        let started = Instant::now();
        let Image {
            id,
            content_type,
            mut data,
        } = source;

        let mut raw = Vec::new();
        let read = data.read_to_end(&mut raw);
        let read_result = match deadline {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| TransformError::DeadlineExceeded(limit))?,
            None => read.await,
        };
        if let Err(source) = read_result {
            return Err(TransformError::Read {
                content_type,
                source,
            });
        }

        let decoded = match tokio::task::spawn_blocking(move || decode(&raw)).await {
            Ok(Ok(decoded)) => decoded,
            Ok(Err(source)) => {
                return Err(TransformError::Decode {
                    content_type,
                    source,
                })
            }
            Err(_) => return Err(TransformError::Interrupted),
        };

        let (writer, reader) = relay(RELAY_CAPACITY);
        let (done_tx, done_rx) = oneshot::channel();
        let write_deadline = deadline.map(|limit| started + limit);
        let encode = self.encode;
        let format = self.name;

        tokio::task::spawn_blocking(move || {
            let outcome = encode_into(writer.into_blocking(write_deadline), encode, &decoded)
                .map_err(|source| TransformError::Encode { format, source });
            if let Err(ref e) = outcome {
                tracing::debug!(error = %e, "Image encode failed");
            }
            let _ = done_tx.send(outcome);
        });

        tracing::debug!(
            image_id = %id,
            from = %content_type,
            to = self.content_type(),
            "Image conversion started"
        );

        let output = Image::new(id, self.content_type(), Box::pin(reader.into_async_read()));
        Ok((output, EncodeCompletion::pending(done_rx)))
    }
}

/// Run `encode` into the relay, then close it according to the outcome.
fn encode_into(
    writer: BlockingRelayWriter,
    encode: EncodeFn,
    decoded: &DynamicImage,
) -> ImageResult<()> {
    let mut sink = BufWriter::with_capacity(ENCODE_BUFFER_BYTES, writer);
    let result = encode(&mut sink, decoded)
        .and_then(|()| sink.flush().map_err(image::ImageError::IoError));
    let (writer, _) = sink.into_parts();
    match &result {
        Ok(()) => writer.finish(),
        Err(e) => writer.abort(e.to_string()),
    }
    result
}

fn encode_png(sink: &mut dyn Write, image: &DynamicImage) -> ImageResult<()> {
    image.write_with_encoder(PngEncoder::new(sink))
}

fn encode_jpeg(sink: &mut dyn Write, image: &DynamicImage) -> ImageResult<()> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(sink, JPEG_QUALITY))
}

fn encode_gif(sink: &mut dyn Write, image: &DynamicImage) -> ImageResult<()> {
    let mut encoder = GifEncoder::new_with_speed(sink, GIF_ENCODE_SPEED);
    encoder.encode_frame(Frame::new(image.to_rgba8()))
}
