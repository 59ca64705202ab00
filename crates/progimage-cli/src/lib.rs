//! Shared pieces of the `progimage` command-line tool.

pub use progimage_api_client as api_client;

use anyhow::{Context, Result};
use progimage_core::ImageData;
use std::path::{Component, Path};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Initialize tracing for CLI binaries. Logs go to stderr so stdout stays clean for image bytes.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Open a local file as an upload stream.
pub async fn open_upload(file_path: &Path) -> Result<ImageData> {
    if file_path
        .components()
        .any(|c| c == Component::ParentDir)
    {
        return Err(anyhow::anyhow!("Invalid input: {}", file_path.display()));
    }
    let file = tokio::fs::File::open(file_path)
        .await
        .with_context(|| format!("Failed to open file: {}", file_path.display()))?;
    Ok(Box::pin(file))
}

/// Copy image bytes into `sink`, returning the number of bytes written.
pub async fn write_image<W>(mut data: ImageData, sink: &mut W) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let written = tokio::io::copy(&mut data, sink)
        .await
        .context("Failed to write image data")?;
    sink.flush().await.context("Failed to flush output")?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_open_upload_rejects_parent_dirs() {
        let err = open_upload(Path::new("../secret.png")).await.err().unwrap();
        assert!(err.to_string().contains("Invalid input"));
    }

    #[tokio::test]
    async fn test_write_image_copies_everything() {
        let mut out = Vec::new();
        let written = write_image(Box::pin(Cursor::new(b"GIF89a....".to_vec())), &mut out)
            .await
            .unwrap();
        assert_eq!(written, 10);
        assert_eq!(out, b"GIF89a....");
    }
}
