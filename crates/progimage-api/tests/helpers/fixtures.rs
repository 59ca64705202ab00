//! Test fixtures: small images encoded in memory.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// A 24x16 opaque image encoded as `format`.
pub fn create_test_image(format: ImageFormat) -> Vec<u8> {
    let img = RgbaImage::from_fn(24, 16, |x, y| Rgba([(x * 10) as u8, (y * 15) as u8, 90, 255]));
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
        _ => DynamicImage::ImageRgba8(img),
    };
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format)
        .expect("Failed to encode fixture");
    buffer
}

pub fn create_test_png() -> Vec<u8> {
    create_test_image(ImageFormat::Png)
}

/// Bytes that sniff as PNG but do not decode.
pub fn create_corrupt_png() -> Vec<u8> {
    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    png.extend_from_slice(&[0x5A; 256]);
    png
}
