//! OCR: hand one image to the recognition engine and collect its text.
//!
//! The engine sits behind the [`OcrEngine`] trait so the request pipeline can
//! be exercised without Tesseract installed. [`TesseractCli`] is the real
//! implementation: it runs the configured `tesseract` binary as a child
//! process, streams a PNG into its stdin and reads the text from stdout.
//!
//! ## Why a child process?
//!
//! Tesseract's C API needs the leptonica/tesseract development libraries at
//! build time; the CLI only needs the program at runtime, and its location is
//! a plain configuration value. The child is spawned with `kill_on_drop`, so
//! when the timeout fires (or the request is abandoned) the process dies with
//! the future instead of lingering.

use crate::config::{LangMode, PageSegMode, ServiceConfig};
use crate::error::Img2TextError;
use crate::pipeline::encode;
use async_trait::async_trait;
use image::DynamicImage;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// A text recognition engine.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine identifier used in logs.
    fn name(&self) -> &'static str;

    /// Recognise the text in `image`.
    async fn recognize(
        &self,
        image: &DynamicImage,
        lang: LangMode,
        mode: PageSegMode,
    ) -> Result<String, Img2TextError>;
}

/// [`OcrEngine`] that shells out to the `tesseract` command-line program.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    cmd: PathBuf,
    tessdata_dir: Option<PathBuf>,
    timeout: Duration,
}

impl TesseractCli {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            cmd: config.tesseract_cmd.clone(),
            tessdata_dir: config.tessdata_dir.clone(),
            timeout: Duration::from_secs(config.ocr_timeout_secs),
        }
    }

    /// Run `tesseract --version` and return its first line.
    ///
    /// Used at startup to report whether OCR will work at all. Bounded by the
    /// OCR timeout so a hung binary cannot stall startup.
    pub async fn version(&self) -> Result<String, Img2TextError> {
        let run = Command::new(&self.cmd)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| Img2TextError::Timeout {
                stage: "tesseract --version",
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| self.spawn_error(e))?;

        // Tesseract 3.x printed the version on stderr.
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).to_string()
        } else {
            String::from_utf8_lossy(&output.stdout).to_string()
        };
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    fn spawn_error(&self, e: std::io::Error) -> Img2TextError {
        if e.kind() == std::io::ErrorKind::NotFound {
            Img2TextError::EngineUnavailable {
                engine: "tesseract",
                hint: format!(
                    "'{}' was not found. Install Tesseract or set TESSERACT_CMD.",
                    self.cmd.display()
                ),
            }
        } else {
            Img2TextError::OcrFailed {
                detail: format!("cannot start '{}': {}", self.cmd.display(), e),
            }
        }
    }

    async fn run(
        &self,
        png: Vec<u8>,
        lang: LangMode,
        mode: PageSegMode,
    ) -> Result<String, Img2TextError> {
        let mut cmd = Command::new(&self.cmd);
        cmd.arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(lang.as_str())
            .arg("--psm")
            .arg(mode.as_arg());
        if let Some(ref dir) = self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Img2TextError::Internal("tesseract stdin was not captured".into()))?;

        let feed = async move {
            stdin.write_all(&png).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| Img2TextError::OcrFailed {
            detail: format!("waiting for tesseract: {}", e),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(Img2TextError::OcrFailed {
                detail: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            });
        }
        if let Err(e) = fed {
            return Err(Img2TextError::OcrFailed {
                detail: format!("writing image to tesseract: {}", e),
            });
        }
        if !stderr.trim().is_empty() {
            debug!("tesseract stderr: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn recognize(
        &self,
        image: &DynamicImage,
        lang: LangMode,
        mode: PageSegMode,
    ) -> Result<String, Img2TextError> {
        let owned = image.clone();
        let png = tokio::task::spawn_blocking(move || encode::encode_png(&owned))
            .await
            .map_err(|e| Img2TextError::Internal(format!("Encode task panicked: {}", e)))?
            .map_err(|e| Img2TextError::OcrFailed {
                detail: format!("image encoding failed: {}", e),
            })?;

        debug!(
            "Running tesseract on {}x{} image (lang={}, psm={})",
            image.width(),
            image.height(),
            lang,
            mode.as_arg()
        );

        match tokio::time::timeout(self.timeout, self.run(png, lang, mode)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("tesseract timed out after {}s", self.timeout.as_secs());
                Err(Img2TextError::Timeout {
                    stage: "OCR",
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn white(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])))
    }

    #[tokio::test]
    async fn missing_binary_is_engine_unavailable() {
        let config = ServiceConfig::builder()
            .tesseract_cmd("/nonexistent/bin/tesseract")
            .build()
            .unwrap();
        let engine = TesseractCli::new(&config);

        let err = engine
            .recognize(&white(4, 4), LangMode::Kor, PageSegMode::SingleBlock)
            .await
            .unwrap_err();
        assert!(
            matches!(err, Img2TextError::EngineUnavailable { engine: "tesseract", .. }),
            "got: {err}"
        );
        assert!(matches!(
            engine.version().await,
            Err(Img2TextError::EngineUnavailable { .. })
        ));
    }

    // Stand-in tesseract scripts. Kept in one test so no other test in this
    // process forks while a script is still open for writing (ETXTBSY).
    #[cfg(unix)]
    #[tokio::test]
    async fn drives_the_command_line_program() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        };
        let echo_args = script("echo-args", r#"cat > /dev/null; echo "$@""#);
        let failing = script(
            "failing",
            "cat > /dev/null; echo \"Failed loading language 'kor'\" >&2; exit 1",
        );
        let slow = script("slow", "sleep 5");
        let tessdata = dir.path().join("tessdata");

        // Arguments: stdin → stdout, language, page segmentation mode.
        let config = ServiceConfig::builder()
            .tesseract_cmd(&echo_args)
            .tessdata_dir(&tessdata)
            .build()
            .unwrap();
        let text = TesseractCli::new(&config)
            .recognize(&white(8, 8), LangMode::KorEng, PageSegMode::SingleBlock)
            .await
            .unwrap();
        assert_eq!(
            text.trim(),
            format!("stdin stdout -l kor+eng --psm 6 --tessdata-dir {}", tessdata.display())
        );

        // Non-zero exit carries stderr.
        let config = ServiceConfig::builder().tesseract_cmd(&failing).build().unwrap();
        let err = TesseractCli::new(&config)
            .recognize(&white(8, 8), LangMode::Kor, PageSegMode::SingleBlock)
            .await
            .unwrap_err();
        assert!(matches!(err, Img2TextError::OcrFailed { .. }), "got: {err}");
        assert!(err.to_string().contains("Failed loading language 'kor'"));

        // Timeout.
        let config = ServiceConfig::builder()
            .tesseract_cmd(&slow)
            .ocr_timeout_secs(1)
            .build()
            .unwrap();
        let err = TesseractCli::new(&config)
            .recognize(&white(8, 8), LangMode::Kor, PageSegMode::SingleBlock)
            .await
            .unwrap_err();
        assert!(matches!(err, Img2TextError::Timeout { stage: "OCR", secs: 1 }), "got: {err}");

        // A hung `--version` is bounded too.
        let err = TesseractCli::new(&config).version().await.unwrap_err();
        assert!(
            matches!(err, Img2TextError::Timeout { stage: "tesseract --version", secs: 1 }),
            "got: {err}"
        );
    }
}
