//! ProgImage API Library
//!
//! HTTP handlers, error rendering and application setup for the image
//! service.

pub mod error;
mod handlers;
pub mod setup;
pub mod state;
mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
