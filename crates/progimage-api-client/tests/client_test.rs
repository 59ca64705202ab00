//! ApiClient against a mock server.

use progimage_api_client::ApiClient;
use progimage_core::{ImageError, ImageService};
use std::io::Cursor;
use tokio::io::AsyncReadExt;
use wiremock::matchers::{body_bytes, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

async fn read_all(image: progimage_core::Image) -> Vec<u8> {
    let mut data = image.data;
    let mut out = Vec::new();
    data.read_to_end(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn test_store_streams_body_and_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/image/create"))
        .and(body_bytes(PNG_SIGNATURE))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let id = client
        .store(Box::pin(Cursor::new(PNG_SIGNATURE.to_vec())))
        .await
        .unwrap();

    assert_eq!(id, "abc");
}

#[tokio::test]
async fn test_store_maps_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/image/create"))
        .respond_with(ResponseTemplate::new(400))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/image/create"))
        .respond_with(ResponseTemplate::new(500).set_body_string("disk on fire"))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();

    let err = client.store(Box::pin(Cursor::new(vec![1, 2, 3]))).await.unwrap_err();
    assert!(matches!(err, ImageError::UnrecognisedImageType));

    let err = client.store(Box::pin(Cursor::new(vec![1, 2, 3]))).await.unwrap_err();
    assert!(matches!(err, ImageError::Backend { .. }));
    let message = err.to_string();
    assert!(message.contains("API request failed with status 500"));
    assert!(message.contains("disk on fire"));
}

#[tokio::test]
async fn test_get_returns_content_type_and_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/image/abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(PNG_SIGNATURE),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let image = client.get("abc").await.unwrap();

    assert_eq!(image.id, "abc");
    assert_eq!(image.content_type, "image/png");
    assert_eq!(read_all(image).await, PNG_SIGNATURE);
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/image/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    assert!(matches!(client.get("nope").await, Err(ImageError::NotFound)));
}

#[tokio::test]
async fn test_get_as_requests_extension_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/image/abc.gif"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/gif")
                .set_body_bytes(b"GIF89a".to_vec()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/image/abc.bmp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "unsupported image type",
            "code": "UNSUPPORTED_IMAGE_TYPE",
            "recoverable": false
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();

    let image = client.get_as("abc", "gif").await.unwrap();
    assert_eq!(image.content_type, "image/gif");
    assert_eq!(read_all(image).await, b"GIF89a");

    let err = client.get_as("abc", "bmp").await.unwrap_err();
    assert!(matches!(err, ImageError::Backend { .. }));
    assert!(err.to_string().contains("unsupported image type"));
}
