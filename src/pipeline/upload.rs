//! Upload staging: validate the client filename and park the bytes on disk.
//!
//! ## Why a guard instead of a `finally`?
//!
//! The uploaded file must disappear whatever happens next: success, a
//! recognised failure, a panic in a blocking task, or the client hanging up
//! and the request future being dropped. [`ScratchFile`] wraps a
//! [`tempfile::NamedTempFile`], so the file is removed when the guard is
//! dropped on any of those paths. The happy path calls
//! [`ScratchFile::release`] to delete explicitly and log a failed removal.
//!
//! The client filename never decides where the file lands. It is sanitised
//! and used only as a readable suffix after a random component, so two
//! concurrent uploads of `scan.png` get two different scratch files.

use crate::config::UploadKind;
use crate::error::Img2TextError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

/// Check the client-supplied filename and pick the extraction path.
///
/// Nothing is written to disk when this fails.
pub fn validate_filename(filename: &str) -> Result<UploadKind, Img2TextError> {
    if filename.is_empty() {
        return Err(Img2TextError::EmptyFilename);
    }
    UploadKind::from_filename(filename).ok_or_else(|| Img2TextError::UnsupportedExtension {
        filename: filename.to_string(),
    })
}

/// Reduce a client filename to a safe ASCII name.
///
/// Drops any directory components (both `/` and `\`), joins whitespace runs
/// with `_`, removes every character outside `[A-Za-z0-9_.-]`, and trims
/// leading/trailing dots and underscores. The result may be empty.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = RE_UNSAFE.replace_all(&joined, "");
    cleaned.trim_matches(|c: char| c == '.' || c == '_').to_string()
}

/// An uploaded file staged in the scratch directory for one request.
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
    kind: UploadKind,
    original_filename: String,
}

impl ScratchFile {
    /// Write `bytes` to a uniquely named file inside `dir`.
    ///
    /// The directory is created if missing. The write runs on the blocking
    /// pool.
    pub async fn create(
        dir: &Path,
        original_filename: &str,
        kind: UploadKind,
        bytes: Vec<u8>,
    ) -> Result<Self, Img2TextError> {
        let dir = dir.to_path_buf();
        let suffix = storage_suffix(original_filename);

        let file = tokio::task::spawn_blocking(move || write_scratch(&dir, &suffix, &bytes))
            .await
            .map_err(|e| Img2TextError::Internal(format!("Scratch write task panicked: {e}")))??;

        debug!("Staged upload at {}", file.path().display());

        Ok(Self {
            file,
            kind,
            original_filename: original_filename.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn kind(&self) -> UploadKind {
        self.kind
    }

    /// The filename as the client sent it, for messages and logs only.
    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    /// Delete the file now. A failed removal is logged, never returned.
    pub fn release(self) {
        let path: PathBuf = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!("Removed scratch file {}", path.display()),
            Err(e) => warn!("Failed to remove scratch file {}: {}", path.display(), e),
        }
    }
}

/// Suffix for the scratch file name: `-<sanitised name>`, or `.<ext>` when
/// nothing printable survives sanitisation.
fn storage_suffix(original_filename: &str) -> String {
    let safe = sanitize_filename(original_filename);
    if safe.is_empty() {
        let ext = original_filename
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_default();
        format!(".{}", RE_UNSAFE.replace_all(&ext, ""))
    } else {
        format!("-{safe}")
    }
}

fn write_scratch(dir: &Path, suffix: &str, bytes: &[u8]) -> Result<NamedTempFile, Img2TextError> {
    let io_err = |source: std::io::Error| Img2TextError::ScratchWrite {
        dir: dir.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(file)
}
