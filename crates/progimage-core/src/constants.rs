//! Limits and defaults shared by the ingestion and retrieval paths.

use std::time::Duration;

/// Hard ceiling on inbound image bytes; anything past it is truncated.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Number of leading bytes inspected when sniffing an upload.
pub const SNIFF_LEN: usize = 512;

/// Number of chunks a relay buffers before the producer waits.
pub const RELAY_CAPACITY: usize = 8;

/// Chunk size used when reading inbound streams.
pub const READ_CHUNK_BYTES: usize = 64 * 1024;

pub const DEFAULT_INGEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_TRANSFORM_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_BUCKET: &str = "progimage";
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:9090";
