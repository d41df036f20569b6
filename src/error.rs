//! Error types for the img2text library.
//!
//! Every failure in the upload pipeline is an [`Img2TextError`]. Variants are
//! grouped by [`ErrorKind`] so the request handler can decide how to present
//! them without matching on every variant:
//!
//! * [`ErrorKind::InvalidInput`] — the upload itself is unacceptable (no file,
//!   empty filename, extension not allowed). Nothing is saved or extracted.
//! * [`ErrorKind::EngineUnavailable`] — an external engine (Tesseract, PDFium)
//!   is not installed or cannot be loaded. Only an environment fix helps.
//! * [`ErrorKind::ExtractionFailure`] — the file was accepted but decoding,
//!   rasterisation or recognition failed. A different file may succeed.
//!
//! An empty OCR result is not an error and has no variant here.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`Img2TextError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    EngineUnavailable,
    ExtractionFailure,
}

/// All errors returned by the img2text library.
#[derive(Debug, Error)]
pub enum Img2TextError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The multipart form carried no `file` part.
    #[error("No file part in the upload")]
    MissingFile,

    /// The `file` part was present but its filename was empty.
    #[error("No file selected")]
    EmptyFilename,

    /// The filename has no extension or one outside the allow-list.
    #[error("Unsupported file type: '{filename}'")]
    UnsupportedExtension { filename: String },

    /// The multipart body could not be parsed (truncated, over the size limit…).
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    /// The `file` part is larger than the configured upload limit.
    #[error("File is larger than the {limit} byte upload limit")]
    UploadTooLarge { limit: usize },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// An external engine is not installed or could not be loaded.
    #[error("{engine} is not available: {hint}")]
    EngineUnavailable { engine: &'static str, hint: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The uploaded image could not be decoded.
    #[error("Cannot decode image '{filename}': {detail}")]
    ImageDecode { filename: String, detail: String },

    /// The file has a `.pdf` extension but does not start with `%PDF`.
    #[error("File is not a valid PDF: '{filename}' (first bytes: {magic:?})")]
    NotAPdf { filename: String, magic: Vec<u8> },

    /// PDFium could not open the document.
    #[error("PDF '{filename}' is corrupt: {detail}")]
    CorruptPdf { filename: String, detail: String },

    /// The PDF has more pages than one request may render.
    #[error("PDF '{filename}' has {pages} pages; at most {max} are accepted")]
    TooManyPages {
        filename: String,
        pages: usize,
        max: usize,
    },

    /// PDFium failed on a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The OCR engine ran but reported a failure.
    #[error("OCR failed: {detail}")]
    OcrFailed { detail: String },

    /// An external call exceeded the configured timeout.
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    /// The scratch copy of the upload could not be written.
    #[error("Failed to store upload in '{dir}': {source}")]
    ScratchWrite {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (panicked blocking task, template failure).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Img2TextError {
    /// Classify this error for presentation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Img2TextError::MissingFile
            | Img2TextError::EmptyFilename
            | Img2TextError::UnsupportedExtension { .. }
            | Img2TextError::MalformedUpload(_)
            | Img2TextError::UploadTooLarge { .. }
            | Img2TextError::TooManyPages { .. }
            | Img2TextError::InvalidConfig(_) => ErrorKind::InvalidInput,
            Img2TextError::EngineUnavailable { .. } => ErrorKind::EngineUnavailable,
            Img2TextError::ImageDecode { .. }
            | Img2TextError::NotAPdf { .. }
            | Img2TextError::CorruptPdf { .. }
            | Img2TextError::RasterisationFailed { .. }
            | Img2TextError::OcrFailed { .. }
            | Img2TextError::Timeout { .. }
            | Img2TextError::ScratchWrite { .. }
            | Img2TextError::Internal(_) => ErrorKind::ExtractionFailure,
        }
    }
}
