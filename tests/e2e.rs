//! End-to-end tests against the real engines.
//!
//! These run Tesseract (and libpdfium for the PDF case) and read sample
//! documents from `./test_cases/`. They are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! Optional:
//!   TESSERACT_CMD=/path/to/tesseract   PDFIUM_LIB_PATH=/path/to/lib

use image::{DynamicImage, Rgba, RgbaImage};
use img2text::{
    handle_upload, Extractor, FlashLevel, LangMode, PdfPageExtractor, PdfiumExtractor,
    ServiceConfig, TesseractCli, UploadRequest, UploadedFile,
};
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn config(upload_dir: &std::path::Path) -> ServiceConfig {
    let mut builder = ServiceConfig::builder().upload_dir(upload_dir);
    if let Ok(cmd) = std::env::var("TESSERACT_CMD") {
        builder = builder.tesseract_cmd(cmd);
    }
    if let Ok(lib) = std::env::var("PDFIUM_LIB_PATH") {
        builder = builder.pdfium_lib_path(lib);
    }
    builder.build().expect("valid config")
}

/// Skip unless E2E_ENABLED is set and Tesseract answers `--version`.
macro_rules! e2e_skip_unless_ready {
    ($tesseract:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        match $tesseract.version().await {
            Ok(v) => println!("Using {v}"),
            Err(e) => {
                println!("SKIP — {e}");
                return;
            }
        }
    }};
}

fn sample(name: &str) -> Option<(String, Vec<u8>)> {
    let path = test_cases_dir().join(name);
    match std::fs::read(&path) {
        Ok(bytes) => Some((name.to_string(), bytes)),
        Err(_) => {
            println!("SKIP — test file not found: {}", path.display());
            None
        }
    }
}

fn request(filename: String, bytes: Vec<u8>, lang: LangMode) -> UploadRequest {
    UploadRequest {
        file: Some(UploadedFile { filename, bytes }),
        lang_mode: lang,
    }
}

fn assert_dir_empty(dir: &std::path::Path) {
    let left: Vec<_> = std::fs::read_dir(dir)
        .map(|d| d.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    assert!(left.is_empty(), "scratch files left behind: {left:?}");
}

// ── Image path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_blank_image_yields_no_text_message() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let tesseract = TesseractCli::new(&config);
    e2e_skip_unless_ready!(tesseract);

    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(200, 80, Rgba([255, 255, 255, 255])));
    let mut png = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png).unwrap();

    let extractor = Extractor::new(Arc::new(tesseract), None);
    let view = handle_upload(
        &extractor,
        dir.path(),
        request("blank.png".into(), png.into_inner(), LangMode::Kor),
    )
    .await;

    let flash = view.flash.expect("blank page must carry a message");
    assert_eq!(flash.level, FlashLevel::Info, "got {flash:?}");
    assert_eq!(view.result, "");
    assert_dir_empty(dir.path());
}

#[tokio::test]
async fn test_sample_image_korean_english() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let tesseract = TesseractCli::new(&config);
    e2e_skip_unless_ready!(tesseract);
    let Some((name, bytes)) = sample("sample_kor_eng.png") else {
        return;
    };

    let extractor = Extractor::new(Arc::new(tesseract), None);
    let view = handle_upload(&extractor, dir.path(), request(name, bytes, LangMode::KorEng)).await;

    assert_eq!(view.flash, None, "unexpected message");
    assert!(!view.result.trim().is_empty());
    assert_eq!(view.char_count, view.result.chars().count());
    assert_dir_empty(dir.path());
    println!("--- BEGIN OUTPUT ---\n{}\n--- END OUTPUT ---", view.result);
}

// ── PDF path ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sample_pdf_all_pages() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let tesseract = TesseractCli::new(&config);
    e2e_skip_unless_ready!(tesseract);

    let pdf = match PdfiumExtractor::load(&config) {
        Ok(p) => p,
        Err(e) => {
            println!("SKIP — {e}");
            return;
        }
    };
    let Some((name, bytes)) = sample("sample.pdf") else {
        return;
    };

    let extractor = Extractor::new(
        Arc::new(tesseract),
        Some(Arc::new(pdf) as Arc<dyn PdfPageExtractor>),
    );
    let view = handle_upload(&extractor, dir.path(), request(name, bytes, LangMode::KorEng)).await;

    assert_eq!(view.flash, None, "unexpected message");
    assert!(!view.result.trim().is_empty());
    assert!(!view.result.contains('\x0c'), "form feeds must be stripped");
    assert_dir_empty(dir.path());
    println!("[sample.pdf] {} chars", view.char_count);
}

#[tokio::test]
async fn test_missing_language_pack_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig::builder()
        .upload_dir(dir.path())
        .tessdata_dir(dir.path().join("no-such-tessdata"))
        .build()
        .unwrap();
    let tesseract = TesseractCli::new(&config);
    e2e_skip_unless_ready!(tesseract);

    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255])));
    let mut png = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png).unwrap();

    let extractor = Extractor::new(Arc::new(tesseract), None);
    let view = handle_upload(
        &extractor,
        dir.path(),
        request("a.png".into(), png.into_inner(), LangMode::Kor),
    )
    .await;

    let flash = view.flash.expect("error message");
    assert_eq!(flash.level, FlashLevel::Error);
    assert_eq!(view.result, "");
}
