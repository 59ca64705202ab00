//! Test helpers: build the real router over in-memory storage.
//!
//! Run from workspace root: `cargo test -p progimage-api --test images_test`.

pub mod fixtures;

use axum_test::TestServer;
use progimage_api::setup::routes;
use progimage_api::AppState;
use progimage_processing::{IngestOptions, StorageImageService, TransformerRegistry, UuidGenerator};
use progimage_storage::{MemoryStorage, Storage};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

/// Test application: server plus direct access to its storage.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<MemoryStorage>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Write an object behind the service's back, e.g. to plant corrupt data.
    pub async fn put_raw(&self, id: &str, bytes: Vec<u8>, content_type: &str) {
        self.storage
            .put_object(id, Box::pin(Cursor::new(bytes)), None, content_type)
            .await
            .expect("Failed to seed storage");
    }
}

pub async fn setup_test_app() -> TestApp {
    let storage = Arc::new(MemoryStorage::new());
    let images = StorageImageService::new(
        storage.clone(),
        Arc::new(UuidGenerator),
        IngestOptions::default(),
    );
    let state = Arc::new(AppState::new(
        Arc::new(images),
        TransformerRegistry::standard(),
        Some(Duration::from_secs(30)),
    ));

    let server = TestServer::new(routes::setup_routes(state)).expect("Failed to create test server");

    TestApp { server, storage }
}
