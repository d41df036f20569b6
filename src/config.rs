//! Configuration types for the extraction service.
//!
//! Everything that depends on the host environment (where Tesseract lives,
//! where PDFium lives, where uploads are staged) is a field of
//! [`ServiceConfig`], filled in once at startup and shared read-only by every
//! request. Nothing here is a compile-time constant except the extension
//! allow-list.

use crate::error::Img2TextError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// File extensions accepted for upload (lower-case, without the dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "tiff", "tif", "gif", "pdf",
];

/// Configuration for the extraction service.
///
/// Built via [`ServiceConfig::builder()`] or using [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use img2text::{LangMode, ServiceConfig};
///
/// let config = ServiceConfig::builder()
///     .tesseract_cmd("/usr/local/bin/tesseract")
///     .default_lang(LangMode::Kor)
///     .dpi(300)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server listens on. Default: `0.0.0.0:5000`.
    pub bind: SocketAddr,

    /// Scratch directory for uploaded files. Default: `$TMPDIR/img2text-uploads`.
    ///
    /// Each upload lives here only for the duration of its request.
    pub upload_dir: PathBuf,

    /// Tesseract executable. A bare name is looked up on `PATH`. Default: `tesseract`.
    pub tesseract_cmd: PathBuf,

    /// Directory holding `*.traineddata` files, passed as `--tessdata-dir`.
    pub tessdata_dir: Option<PathBuf>,

    /// Explicit PDFium shared library. `None` searches the system library path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Language mode used when the form omits or garbles `lang_mode`. Default: `kor+eng`.
    pub default_lang: LangMode,

    /// Rendering DPI for PDF pages. Range: 72–400. Default: 200.
    ///
    /// Tesseract is tuned for roughly 300 DPI text; 200 keeps memory modest
    /// while staying well above the ~150 DPI where accuracy starts to drop.
    pub dpi: u32,

    /// Cap on either dimension of a rendered page, in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// Largest PDF accepted, in pages. Checked before the first page is
    /// rendered. Default: 50.
    pub max_pages: usize,

    /// Upper bound on one OCR call, and on the total time spent rendering
    /// the pages of one PDF. Default: 120.
    pub ocr_timeout_secs: u64,

    /// Largest accepted request body in bytes. Default: 32 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            upload_dir: std::env::temp_dir().join("img2text-uploads"),
            tesseract_cmd: PathBuf::from("tesseract"),
            tessdata_dir: None,
            pdfium_lib_path: None,
            default_lang: LangMode::default(),
            dpi: 200,
            max_rendered_pixels: 4000,
            max_pages: 50,
            ocr_timeout_secs: 120,
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.bind = addr;
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn default_lang(mut self, lang: LangMode) -> Self {
        self.config.default_lang = lang;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_pages(mut self, pages: usize) -> Self {
        self.config.max_pages = pages.max(1);
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, Img2TextError> {
        let c = &self.config;
        if c.ocr_timeout_secs == 0 {
            return Err(Img2TextError::InvalidConfig(
                "OCR timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(Img2TextError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        if c.tesseract_cmd.as_os_str().is_empty() {
            return Err(Img2TextError::InvalidConfig(
                "Tesseract command must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Tesseract language selection offered by the upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LangMode {
    /// Korean only (`kor`).
    #[serde(rename = "kor")]
    Kor,
    /// Korean and English (`kor+eng`). (default)
    #[default]
    #[serde(rename = "kor+eng")]
    KorEng,
}

impl LangMode {
    /// Parse the form value. Returns `None` for anything outside the two modes.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "kor" => Some(LangMode::Kor),
            "kor+eng" => Some(LangMode::KorEng),
            _ => None,
        }
    }

    /// The Tesseract `-l` argument, which is also the form value.
    pub fn as_str(&self) -> &'static str {
        match self {
            LangMode::Kor => "kor",
            LangMode::KorEng => "kor+eng",
        }
    }
}

impl fmt::Display for LangMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tesseract page segmentation mode (`--psm`).
///
/// Uploads are always read as one uniform block of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSegMode {
    /// A single uniform block of text (`6`).
    #[default]
    SingleBlock,
}

impl PageSegMode {
    pub fn as_arg(&self) -> &'static str {
        match self {
            PageSegMode::SingleBlock => "6",
        }
    }
}

/// Extraction path chosen from the upload's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Raster image: decoded and recognised once.
    Image,
    /// PDF: rasterised page by page, each page recognised.
    Pdf,
}

impl UploadKind {
    /// Classify a filename by the text after its last `.`, case-insensitively.
    ///
    /// Returns `None` when there is no `.` or the extension is not allowed.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return None;
        }
        if ext == "pdf" {
            Some(UploadKind::Pdf)
        } else {
            Some(UploadKind::Image)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_allowed_extensions() {
        assert_eq!(UploadKind::from_filename("photo.png"), Some(UploadKind::Image));
        assert_eq!(UploadKind::from_filename("scan.JPEG"), Some(UploadKind::Image));
        assert_eq!(UploadKind::from_filename("a.b.tif"), Some(UploadKind::Image));
        assert_eq!(UploadKind::from_filename("doc.PDF"), Some(UploadKind::Pdf));
    }

    #[test]
    fn reject_missing_or_unknown_extension() {
        assert_eq!(UploadKind::from_filename("archive.zip"), None);
        assert_eq!(UploadKind::from_filename("README"), None);
        assert_eq!(UploadKind::from_filename("photo.png.exe"), None);
        assert_eq!(UploadKind::from_filename("trailingdot."), None);
        assert_eq!(UploadKind::from_filename(""), None);
    }

    #[test]
    fn lang_mode_round_trips_form_values() {
        assert_eq!(LangMode::parse("kor"), Some(LangMode::Kor));
        assert_eq!(LangMode::parse("kor+eng"), Some(LangMode::KorEng));
        assert_eq!(LangMode::parse("eng"), None);
        assert_eq!(LangMode::default().as_str(), "kor+eng");
        assert_eq!(LangMode::Kor.to_string(), "kor");
    }

    #[test]
    fn single_block_is_psm_6() {
        assert_eq!(PageSegMode::default(), PageSegMode::SingleBlock);
        assert_eq!(PageSegMode::SingleBlock.as_arg(), "6");
    }

    #[test]
    fn builder_clamps_and_validates() {
        let c = ServiceConfig::builder().dpi(10).max_pages(0).build().unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.max_pages, 1);
        assert_eq!(ServiceConfig::default().max_pages, 50);

        let err = ServiceConfig::builder().ocr_timeout_secs(0).build();
        assert!(matches!(err, Err(Img2TextError::InvalidConfig(_))));

        let err = ServiceConfig::builder().tesseract_cmd("").build();
        assert!(matches!(err, Err(Img2TextError::InvalidConfig(_))));
    }
}
