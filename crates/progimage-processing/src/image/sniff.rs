//! Magic-byte detection of supported image containers.

use progimage_core::ImageKind;

const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF87A_SIGNATURE: &[u8] = b"GIF87a";
const GIF89A_SIGNATURE: &[u8] = b"GIF89a";

/// Infer the image kind from the leading bytes of a stream.
///
/// Only claims what the prefix shows; the data may still fail to decode.
pub fn sniff(prefix: &[u8]) -> Option<ImageKind> {
    if prefix.starts_with(PNG_SIGNATURE) {
        Some(ImageKind::Png)
    } else if prefix.starts_with(JPEG_SIGNATURE) {
        Some(ImageKind::Jpeg)
    } else if prefix.starts_with(GIF87A_SIGNATURE) || prefix.starts_with(GIF89A_SIGNATURE) {
        Some(ImageKind::Gif)
    } else {
        None
    }
}
