//! PDF rasterisation: every page of an uploaded PDF becomes one image.
//!
//! ## Threading
//!
//! pdfium handles are neither `Send` nor async-aware, so each call binds the
//! library, opens the document and renders its pages on one blocking-pool
//! thread. Pages are handed to the caller through a bounded channel as soon
//! as each one is rendered, so at most a couple of page bitmaps are alive at
//! once. Rendering stops when the receiver goes away.
//!
//! Pages are scaled from PDF points (72 per inch) to the configured DPI, and
//! the longest edge is capped at `max_rendered_pixels`. Documents with more
//! than `max_pages` pages are refused before anything is rendered, and the
//! time spent rendering one document is bounded by the OCR timeout.
//!
//! ## Capability check
//!
//! PDF support is optional at runtime: the service still handles images when
//! libpdfium is missing. [`PdfiumExtractor::load`] binds the library once at
//! startup; if that fails the server runs without a PDF extractor and PDF
//! uploads report [`Img2TextError::EngineUnavailable`].

use crate::config::ServiceConfig;
use crate::error::Img2TextError;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Sending half of a page stream, one image per page in page order.
pub type PageSender = mpsc::Sender<DynamicImage>;

/// Turns a PDF on disk into a stream of page images.
#[async_trait]
pub trait PdfPageExtractor: Send + Sync {
    /// Render `pdf_path` page by page into `pages`.
    ///
    /// `filename` is the name the client uploaded the file under and is what
    /// error messages report. Returns once every page has been sent, or early
    /// and successfully if the receiving side has been dropped.
    async fn rasterize(
        &self,
        pdf_path: &Path,
        filename: &str,
        pages: PageSender,
    ) -> Result<(), Img2TextError>;
}

/// [`PdfPageExtractor`] backed by a pdfium shared library.
#[derive(Debug, Clone)]
pub struct PdfiumExtractor {
    library: Option<PathBuf>,
    dpi: u32,
    max_pixels: u32,
    max_pages: usize,
    budget: Duration,
}

impl PdfiumExtractor {
    /// Bind pdfium once to confirm it is usable with this configuration.
    ///
    /// Uses `config.pdfium_lib_path` when set (a library file or the
    /// directory containing it), otherwise the system library search path.
    pub fn load(config: &ServiceConfig) -> Result<Self, Img2TextError> {
        let extractor = Self {
            library: config.pdfium_lib_path.clone(),
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            max_pages: config.max_pages,
            budget: Duration::from_secs(config.ocr_timeout_secs),
        };
        bind(extractor.library.as_deref())?;
        info!(
            "PDF support enabled (pdfium from {}, at most {} pages)",
            extractor
                .library
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "system library path".to_string()),
            extractor.max_pages
        );
        Ok(extractor)
    }
}

#[async_trait]
impl PdfPageExtractor for PdfiumExtractor {
    async fn rasterize(
        &self,
        pdf_path: &Path,
        filename: &str,
        pages: PageSender,
    ) -> Result<(), Img2TextError> {
        let path = pdf_path.to_path_buf();
        let filename = filename.to_string();
        let this = self.clone();

        // The blocking task is not cancelled when this future is dropped; it
        // notices the closed channel before its next page instead.
        tokio::task::spawn_blocking(move || this.render_blocking(&path, &filename, &pages))
            .await
            .map_err(|e| Img2TextError::Internal(format!("Render task panicked: {}", e)))?
    }
}

impl PdfiumExtractor {
    fn render_blocking(
        &self,
        pdf_path: &Path,
        filename: &str,
        tx: &PageSender,
    ) -> Result<(), Img2TextError> {
        let pdfium = bind(self.library.as_deref())?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| Img2TextError::CorruptPdf {
                filename: filename.to_string(),
                detail: format!("{:?}", e),
            })?;

        let pages = document.pages();
        let page_count = pages.len() as usize;
        info!("PDF loaded: {} pages", page_count);

        // PDF user space is 72 units per inch.
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let limits = PageLimits {
            max_pages: self.max_pages,
            budget: self.budget,
        };
        stream_pages(filename, page_count, limits, tx, |idx| {
            let failed = |detail: String| Img2TextError::RasterisationFailed {
                page: idx + 1,
                detail,
            };
            let page = pages.get(idx as u16).map_err(|e| failed(format!("{:?}", e)))?;
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| failed(format!("{:?}", e)))?;
            Ok(bitmap.as_image())
        })
    }
}

/// Bounds applied to one document.
#[derive(Debug, Clone, Copy)]
struct PageLimits {
    max_pages: usize,
    /// Total rendering time allowed across all pages.
    budget: Duration,
}

/// Render pages `0..page_count` with `render_page` and send them down `tx`.
///
/// Only time spent inside `render_page` counts against the budget; waiting
/// for the receiver to take a page does not. Must run outside the async
/// runtime (`blocking_send`).
fn stream_pages<F>(
    filename: &str,
    page_count: usize,
    limits: PageLimits,
    tx: &PageSender,
    mut render_page: F,
) -> Result<(), Img2TextError>
where
    F: FnMut(usize) -> Result<DynamicImage, Img2TextError>,
{
    if page_count > limits.max_pages {
        return Err(Img2TextError::TooManyPages {
            filename: filename.to_string(),
            pages: page_count,
            max: limits.max_pages,
        });
    }

    let mut busy = Duration::ZERO;
    for idx in 0..page_count {
        if tx.is_closed() {
            debug!("Page receiver gone, stopping after {} pages", idx);
            return Ok(());
        }

        let start = Instant::now();
        let image = render_page(idx)?;
        busy += start.elapsed();
        if busy > limits.budget {
            return Err(Img2TextError::Timeout {
                stage: "PDF rasterisation",
                secs: limits.budget.as_secs(),
            });
        }

        debug!(
            "Rendered page {}/{} → {}x{} px",
            idx + 1,
            page_count,
            image.width(),
            image.height()
        );
        if tx.blocking_send(image).is_err() {
            debug!("Page receiver gone, stopping after {} pages", idx + 1);
            return Ok(());
        }
    }
    Ok(())
}

/// Fail fast on files that merely claim to be PDFs.
pub async fn check_pdf_magic(path: &Path, filename: &str) -> Result<(), Img2TextError> {
    let read_err = |e: std::io::Error| Img2TextError::CorruptPdf {
        filename: filename.to_string(),
        detail: e.to_string(),
    };
    let file = tokio::fs::File::open(path).await.map_err(read_err)?;
    let mut magic = Vec::with_capacity(4);
    file.take(4).read_to_end(&mut magic).await.map_err(read_err)?;

    if magic != b"%PDF" {
        return Err(Img2TextError::NotAPdf {
            filename: filename.to_string(),
            magic,
        });
    }
    Ok(())
}

fn bind(library: Option<&Path>) -> Result<Pdfium, Img2TextError> {
    let bindings = match library {
        Some(p) if p.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))
        }
        Some(p) => Pdfium::bind_to_library(p),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| Img2TextError::EngineUnavailable {
        engine: "pdfium",
        hint: format!("{}. Set PDFIUM_LIB_PATH to an installed libpdfium.", e),
    })?;
    Ok(Pdfium::new(bindings))
}
