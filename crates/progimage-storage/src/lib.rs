//! ProgImage Storage Library
//!
//! The object store contract (`Storage`) and its backends: S3-compatible
//! services, the local filesystem and an in-memory store.
//!
//! # Storage keys
//!
//! Keys are the image identifiers themselves. They must not be empty, contain
//! `..` or start with `/`; every backend validates them the same way.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub(crate) mod object;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use progimage_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::{S3Settings, S3Storage};
pub use traits::{ByteStream, ObjectInfo, ObjectReader, Storage, StorageError, StorageResult};
