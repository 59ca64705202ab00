//! Image handling: sniffing, decoding and format conversion.

pub mod decode;
pub mod registry;
pub mod sniff;
pub mod transformer;

pub use decode::decode;
pub use registry::TransformerRegistry;
pub use sniff::sniff;
pub use transformer::{EncodeCompletion, EncodeFn, TransformError, Transformer};
