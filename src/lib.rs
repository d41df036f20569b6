//! # img2text
//!
//! A small web front-end that extracts text from an uploaded image or PDF
//! with the Tesseract OCR engine.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /  (multipart: file, lang_mode)
//!  │
//!  ├─ 1. Validate  filename present, extension in the allow-list
//!  ├─ 2. Save      stage bytes in a uniquely named scratch file
//!  ├─ 3. Extract   image → decode → OCR
//!  │               pdf   → rasterise via pdfium (spawn_blocking) → OCR per page → join
//!  ├─ 4. Cleanup   scratch file removed on every path
//!  └─ 5. Render    same page, with text, char count and at most one message
//! ```
//!
//! Recognition is always delegated: [`OcrEngine`] wraps the `tesseract`
//! program and [`PdfPageExtractor`] wraps libpdfium. Both are traits, so the
//! pipeline can be driven with in-process fakes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img2text::{router, AppState, Extractor, ServiceConfig, TesseractCli};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .tesseract_cmd("/usr/bin/tesseract")
//!         .build()?;
//!     let extractor = Extractor::new(Arc::new(TesseractCli::new(&config)), None);
//!     let listener = tokio::net::TcpListener::bind(config.bind).await?;
//!     axum::serve(listener, router(AppState::new(config, extractor)?)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2text` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod handler;
pub mod pipeline;
pub mod server;
pub mod template;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    LangMode, PageSegMode, ServiceConfig, ServiceConfigBuilder, UploadKind, ALLOWED_EXTENSIONS,
};
pub use error::{ErrorKind, Img2TextError};
pub use extract::{ExtractionResult, Extractor, PAGE_SEPARATOR};
pub use handler::{handle_upload, Flash, FlashLevel, PageView, UploadRequest, UploadedFile};
pub use pipeline::ocr::{OcrEngine, TesseractCli};
pub use pipeline::render::{PageSender, PdfPageExtractor, PdfiumExtractor};
pub use server::{router, AppState};
