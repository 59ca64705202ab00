//! HTTP client for the ProgImage API.
//!
//! `ApiClient` implements `ImageService`, so callers can swap it for the
//! in-process service without code changes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use progimage_core::{Image, ImageData, ImageError, ImageService, StoredImageResponse};
use reqwest::{header, Client, Response, StatusCode};
use std::io;
use std::time::Duration;
use tokio_util::io::{ReaderStream, StreamReader};

const DEFAULT_API_URL: &str = "http://localhost:9090";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// HTTP client for the ProgImage API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create client from environment: PROGIMAGE_API_URL, defaulting to a local server.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("PROGIMAGE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch an image converted to `format` (`png`, `jpg` or `gif`).
    pub async fn get_as(&self, id: &str, format: &str) -> Result<Image, ImageError> {
        self.fetch(&format!("/image/{}.{}", id, format), id).await
    }

    async fn fetch(&self, path: &str, id: &str) -> Result<Image, ImageError> {
        let response = self
            .client
            .get(self.build_url(path))
            .send()
            .await
            .map_err(|e| ImageError::backend("Failed to send request", e))?;

        match response.status() {
            StatusCode::OK => Ok(into_image(id, response)),
            StatusCode::NOT_FOUND => Err(ImageError::NotFound),
            _ => Err(failed_request(response).await),
        }
    }
}

fn into_image(id: &str, response: Response) -> Image {
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let body = StreamReader::new(response.bytes_stream().map_err(io::Error::other));
    Image::new(id, content_type, Box::pin(body))
}

/// Turn a non-success response into a backend error carrying the server's message.
async fn failed_request(response: Response) -> ImageError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    ImageError::backend(
        format!("API request failed with status {}", status),
        server_message(&error_text),
    )
}

/// The `error` field of an API error body, or the raw text for anything else.
fn server_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl ImageService for ApiClient {
    async fn get(&self, id: &str) -> Result<Image, ImageError> {
        self.fetch(&format!("/image/{}", id), id).await
    }

    async fn store(&self, data: ImageData) -> Result<String, ImageError> {
        let body = reqwest::Body::wrap_stream(ReaderStream::new(data));
        let response = self
            .client
            .post(self.build_url("/image/create"))
            .body(body)
            .send()
            .await
            .map_err(|e| ImageError::backend("Failed to send request", e))?;

        match response.status() {
            StatusCode::CREATED => {
                let stored: StoredImageResponse = response
                    .json()
                    .await
                    .map_err(|e| ImageError::backend("Failed to parse response as JSON", e))?;
                tracing::debug!(image_id = %stored.id, "Image uploaded");
                Ok(stored.id)
            }
            StatusCode::BAD_REQUEST => Err(ImageError::UnrecognisedImageType),
            _ => Err(failed_request(response).await),
        }
    }
}
