//! The per-request extraction pipeline.
//!
//! ```text
//! Idle ─▶ Validating ─▶ Saving ─▶ Extracting ─▶ Cleaning ─▶ Done
//!             │            │           │
//!             └────────────┴───────────┴──▶ (render error, no artifact left)
//! ```
//!
//! [`handle_upload`] always returns a [`PageView`]; failures become a single
//! flash message instead of an HTTP error. Validation runs before anything
//! touches the disk. Once the upload is staged, the [`ScratchFile`] guard owns
//! it and the file is gone before the view is returned.

use crate::config::{LangMode, UploadKind};
use crate::error::{ErrorKind, Img2TextError};
use crate::extract::{ExtractionResult, Extractor};
use crate::pipeline::upload::{validate_filename, ScratchFile};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const MSG_MISSING_FILE: &str = "파일이 전송되지 않았습니다.";
pub const MSG_EMPTY_FILENAME: &str = "선택된 파일이 없습니다.";
pub const MSG_UNSUPPORTED: &str = "지원하지 않는 파일 형식입니다.";
pub const MSG_NO_TEXT: &str = "텍스트를 인식하지 못했습니다. 이미지/문서를 확인해 주세요.";

/// One file part from the upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// The filename exactly as the client sent it (may be empty).
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A submitted upload form.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// `None` when the form had no `file` part at all.
    pub file: Option<UploadedFile>,
    pub lang_mode: LangMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Error,
    Info,
}

/// A one-shot status message shown above the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    /// The user-facing message for a failed request.
    pub fn for_error(err: &Img2TextError) -> Self {
        match err {
            Img2TextError::MissingFile => Self::error(MSG_MISSING_FILE),
            Img2TextError::EmptyFilename => Self::error(MSG_EMPTY_FILENAME),
            Img2TextError::UnsupportedExtension { .. } => Self::error(MSG_UNSUPPORTED),
            Img2TextError::MalformedUpload(cause) => {
                Self::error(format!("업로드를 읽을 수 없습니다: {cause}"))
            }
            Img2TextError::UploadTooLarge { .. } => {
                Self::error(format!("업로드를 읽을 수 없습니다: {err}"))
            }
            other => Self::error(format!("텍스트 추출 중 오류가 발생했습니다: {other}")),
        }
    }
}

/// Everything the page template needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub result: String,
    pub char_count: usize,
    pub lang_mode: LangMode,
    pub flash: Option<Flash>,
}

impl PageView {
    /// The blank form.
    pub fn empty(lang_mode: LangMode) -> Self {
        Self {
            result: String::new(),
            char_count: 0,
            lang_mode,
            flash: None,
        }
    }

    /// The form after a failed request: no text, one error message.
    pub fn failed(lang_mode: LangMode, err: &Img2TextError) -> Self {
        Self {
            flash: Some(Flash::for_error(err)),
            ..Self::empty(lang_mode)
        }
    }

    /// The form after a successful extraction.
    pub fn extracted(lang_mode: LangMode, result: ExtractionResult) -> Self {
        let flash = result.is_blank().then(|| Flash::info(MSG_NO_TEXT));
        Self {
            result: result.text,
            char_count: result.char_count,
            lang_mode,
            flash,
        }
    }
}

/// Pipeline position, recorded on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validating,
    Saving,
    Extracting,
    Cleaning,
    Done,
}

/// Run one upload through validate → save → extract → cleanup.
pub async fn handle_upload(
    extractor: &Extractor,
    upload_dir: &Path,
    request: UploadRequest,
) -> PageView {
    let span = info_span!("upload", request_id = %Uuid::new_v4(), lang = %request.lang_mode);
    run(extractor, upload_dir, request).instrument(span).await
}

async fn run(extractor: &Extractor, upload_dir: &Path, request: UploadRequest) -> PageView {
    let lang = request.lang_mode;

    debug!(stage = ?Stage::Validating);
    let (file, kind) = match validate(request.file) {
        Ok(v) => v,
        Err(e) => {
            info!("Rejected upload: {}", e);
            return PageView::failed(lang, &e);
        }
    };

    debug!(stage = ?Stage::Saving, filename = %file.filename, bytes = file.bytes.len());
    let scratch = match ScratchFile::create(upload_dir, &file.filename, kind, file.bytes).await {
        Ok(s) => s,
        Err(e) => {
            warn!("Could not stage upload: {}", e);
            return PageView::failed(lang, &e);
        }
    };

    debug!(stage = ?Stage::Extracting, kind = ?kind);
    let outcome = extractor.extract(&scratch, lang).await;

    debug!(stage = ?Stage::Cleaning);
    scratch.release();

    debug!(stage = ?Stage::Done);
    match outcome {
        Ok(result) => {
            if result.is_blank() {
                info!("No text recognised in '{}'", file.filename);
            }
            PageView::extracted(lang, result)
        }
        Err(e) => {
            match e.kind() {
                ErrorKind::EngineUnavailable => warn!("Extraction failed: {}", e),
                _ => info!("Extraction failed: {}", e),
            }
            PageView::failed(lang, &e)
        }
    }
}

fn validate(file: Option<UploadedFile>) -> Result<(UploadedFile, UploadKind), Img2TextError> {
    let file = file.ok_or(Img2TextError::MissingFile)?;
    let kind = validate_filename(&file.filename)?;
    Ok((file, kind))
}
