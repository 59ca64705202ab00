use image::error::{DecodingError, ImageFormatHint};
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, ImageResult};
use std::io::Cursor;

const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Fully decode an in-memory image with the compiled-in decoders.
///
/// The JPEG decoder pads missing scan data instead of failing, so JPEG input
/// must also carry its end-of-image marker.
pub fn decode(data: &[u8]) -> ImageResult<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    if reader.format() == Some(ImageFormat::Jpeg) && !has_jpeg_trailer(data) {
        return Err(ImageError::Decoding(DecodingError::new(
            ImageFormatHint::Exact(ImageFormat::Jpeg),
            "missing end of image marker",
        )));
    }
    reader.decode()
}

/// Trailing zero padding after the marker is tolerated.
fn has_jpeg_trailer(data: &[u8]) -> bool {
    let end = data
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    data[..end].ends_with(&JPEG_EOI)
}
