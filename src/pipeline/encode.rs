//! Image transcoding: embedded picture bytes → RGB JPEG.
//!
//! Survey photos arrive as whatever the spreadsheet author pasted (PNG with
//! alpha, palette GIF, BMP, JPEG). JPEG has no alpha channel, so every image
//! is flattened to 8-bit RGB before encoding.

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Decode `bytes`, convert to RGB and re-encode as JPEG.
pub fn to_jpeg(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)?;
    debug!(
        "Transcoded {}x{} image → {} bytes JPEG",
        rgb.width(),
        rgb.height(),
        buf.len()
    );
    Ok(buf)
}
