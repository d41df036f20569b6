//! Image encoding: `DynamicImage` → PNG bytes for the OCR engine.
//!
//! Tesseract reads the page from stdin, so every image, whether decoded from
//! an upload or rendered from a PDF page, is re-encoded to one format first.
//! PNG is lossless: JPEG artefacts around glyph edges measurably hurt
//! recognition on small Hangul text.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}
