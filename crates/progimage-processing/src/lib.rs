//! ProgImage processing
//!
//! Upload validation, the storage-backed `ImageService` and format
//! conversion between PNG, JPEG and GIF.

pub mod image;
pub mod relay;
pub mod service;
pub mod upload;

pub use crate::image::{
    decode, sniff, EncodeCompletion, EncodeFn, TransformError, Transformer, TransformerRegistry,
};
pub use relay::{relay, BlockingRelayWriter, RelayReader, RelayWriter};
pub use service::StorageImageService;
pub use upload::{IdentifierGenerator, IngestOptions, IngestPipeline, UuidGenerator};
