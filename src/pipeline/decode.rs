//! Image decoding for direct (non-PDF) uploads.
//!
//! Decoding is CPU-bound and a large TIFF can take a noticeable moment, so it
//! runs on the blocking pool like PDF rasterisation does. The format is
//! sniffed from the file's bytes rather than trusted from its extension: a
//! PNG renamed to `.jpg` still decodes.

use crate::error::Img2TextError;
use image::{DynamicImage, ImageReader};
use std::path::Path;
use tracing::debug;

/// Decode the staged upload at `path`.
///
/// `filename` is the client's name for the file, used in error messages.
pub async fn decode_image(path: &Path, filename: &str) -> Result<DynamicImage, Img2TextError> {
    let path = path.to_path_buf();
    let name = filename.to_string();

    tokio::task::spawn_blocking(move || decode_blocking(&path, &name))
        .await
        .map_err(|e| Img2TextError::Internal(format!("Decode task panicked: {}", e)))?
}

fn decode_blocking(path: &Path, filename: &str) -> Result<DynamicImage, Img2TextError> {
    let decode_err = |detail: String| Img2TextError::ImageDecode {
        filename: filename.to_string(),
        detail,
    };

    let image = ImageReader::open(path)
        .map_err(|e| decode_err(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;

    debug!("Decoded {} → {}x{} px", filename, image.width(), image.height());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[tokio::test]
    async fn decodes_png_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actually-a-png.jpg");
        RgbaImage::from_pixel(7, 3, Rgba([0, 0, 0, 255]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let img = decode_image(&path, "actually-a-png.jpg").await.unwrap();
        assert_eq!((img.width(), img.height()), (7, 3));
    }

    #[tokio::test]
    async fn garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = decode_image(&path, "broken.png").await.unwrap_err();
        assert!(matches!(err, Img2TextError::ImageDecode { .. }), "got: {err}");
        assert!(err.to_string().contains("broken.png"));
    }
}
