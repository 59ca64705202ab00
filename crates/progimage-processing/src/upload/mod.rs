//! Image ingestion.

mod identifier;
mod pipeline;

pub use identifier::{IdentifierGenerator, UuidGenerator};
pub use pipeline::{IngestOptions, IngestPipeline};
