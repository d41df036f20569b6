//! Pipeline stages for image/PDF text extraction.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the external engines can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ decode ─────────────┐
//!   │                            ├──▶ encode ──▶ ocr ──▶ postprocess
//!   └──────▶ render (pdf pages) ─┘
//! ```
//!
//! 1. [`upload`]  — validate and sanitise the filename, stage bytes in a
//!    self-deleting scratch file
//! 2. [`decode`]  — decode an uploaded image; runs in `spawn_blocking`
//! 3. [`render`]  — rasterise PDF pages via pdfium; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 4. [`encode`]  — PNG-encode each `DynamicImage` for the OCR engine's stdin
//! 5. [`ocr`]     — run Tesseract with a timeout; the only stage that spawns
//!    a process
//! 6. [`postprocess`] — strip Tesseract's page terminators

pub mod decode;
pub mod encode;
pub mod ocr;
pub mod postprocess;
pub mod render;
pub mod upload;
