//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::liveness_check))
        .route(
            "/image/create",
            // Uploads are capped while streaming, not by the body limit
            post(handlers::image_create::create_image).layer(DefaultBodyLimit::disable()),
        )
        .route("/image/{id}", get(handlers::image_get::get_image))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
