//! Text extraction for one staged upload.
//!
//! [`Extractor`] owns the two external collaborators and picks the path for
//! each file:
//!
//! ```text
//! image ──▶ decode ──▶ OCR ─────────────────────────────▶ text
//! pdf   ──▶ magic check ──▶ rasterise ──▶ OCR per page ──▶ join("\n\n")
//! ```
//!
//! PDF pages flow from the rasteriser to OCR through a one-slot channel, so
//! page N+1 renders while page N is being recognised.
//!
//! Every OCR call uses the request's language and the single-uniform-block
//! segmentation mode. Any failure aborts the whole extraction: a PDF whose
//! third page fails yields an error, never the first two pages' text.

use crate::config::{LangMode, PageSegMode, UploadKind};
use crate::error::Img2TextError;
use crate::pipeline::decode::decode_image;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::postprocess::clean_page_text;
use crate::pipeline::render::{check_pdf_magic, PdfPageExtractor};
use crate::pipeline::upload::ScratchFile;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Separator placed between the texts of consecutive PDF pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Rendered pages waiting for OCR.
const PAGE_BUFFER: usize = 1;

/// Text recognised from one upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub text: String,
    /// Number of characters (Unicode scalar values) in `text`.
    pub char_count: usize,
}

impl ExtractionResult {
    pub fn new(text: String) -> Self {
        let char_count = text.chars().count();
        Self { text, char_count }
    }

    /// True when OCR produced nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Routes staged uploads to the OCR engine, directly or via the PDF rasteriser.
#[derive(Clone)]
pub struct Extractor {
    ocr: Arc<dyn OcrEngine>,
    pdf: Option<Arc<dyn PdfPageExtractor>>,
    mode: PageSegMode,
}

impl Extractor {
    /// `pdf` is `None` when no PDF rasteriser could be loaded at startup.
    pub fn new(ocr: Arc<dyn OcrEngine>, pdf: Option<Arc<dyn PdfPageExtractor>>) -> Self {
        Self {
            ocr,
            pdf,
            mode: PageSegMode::SingleBlock,
        }
    }

    /// Whether PDF uploads can be served.
    pub fn supports_pdf(&self) -> bool {
        self.pdf.is_some()
    }

    /// Extract the text of a staged upload.
    pub async fn extract(
        &self,
        file: &ScratchFile,
        lang: LangMode,
    ) -> Result<ExtractionResult, Img2TextError> {
        let start = Instant::now();
        let text = match file.kind() {
            UploadKind::Image => self.extract_image(file, lang).await?,
            UploadKind::Pdf => self.extract_pdf(file, lang).await?,
        };
        let result = ExtractionResult::new(text);
        info!(
            "Extracted {} chars from '{}' with {} in {}ms",
            result.char_count,
            file.original_filename(),
            self.ocr.name(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    async fn extract_image(
        &self,
        file: &ScratchFile,
        lang: LangMode,
    ) -> Result<String, Img2TextError> {
        let image = decode_image(file.path(), file.original_filename()).await?;
        let raw = self.ocr.recognize(&image, lang, self.mode).await?;
        Ok(clean_page_text(&raw))
    }

    async fn extract_pdf(
        &self,
        file: &ScratchFile,
        lang: LangMode,
    ) -> Result<String, Img2TextError> {
        let pdf = self
            .pdf
            .as_ref()
            .ok_or_else(|| Img2TextError::EngineUnavailable {
                engine: "pdfium",
                hint: "PDF support was not loaded at startup. Set PDFIUM_LIB_PATH and restart."
                    .into(),
            })?;

        check_pdf_magic(file.path(), file.original_filename()).await?;

        let (tx, mut rx) = mpsc::channel(PAGE_BUFFER);
        let render = pdf.rasterize(file.path(), file.original_filename(), tx);

        // Owns the receiver: when OCR fails it is dropped on return and the
        // renderer stops at its next page.
        let recognise = async move {
            let mut texts = Vec::new();
            while let Some(page) = rx.recv().await {
                let raw = self.ocr.recognize(&page, lang, self.mode).await?;
                let text = clean_page_text(&raw);
                debug!("Page {}: {} chars", texts.len() + 1, text.chars().count());
                texts.push(text);
            }
            Ok::<_, Img2TextError>(texts)
        };

        let (rendered, recognised) = tokio::join!(render, recognise);
        let texts = recognised?;
        rendered?;
        debug!("Recognised {} pages", texts.len());

        Ok(texts.join(PAGE_SEPARATOR))
    }
}
