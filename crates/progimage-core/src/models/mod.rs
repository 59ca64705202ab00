//! Domain models shared across crates.

pub mod image;

pub use image::{Image, ImageData, ImageKind, StoredImageResponse};
