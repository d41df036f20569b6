//! HTTP server binary for img2text.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig`, checks the external engines once, and serves the router.

use anyhow::{Context, Result};
use clap::Parser;
use img2text::{
    router, AppState, Extractor, LangMode, PdfPageExtractor, PdfiumExtractor, ServiceConfig,
    TesseractCli,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address (0.0.0.0:5000)
  img2text

  # Tesseract outside PATH, PDF support from a local libpdfium
  img2text --tesseract-cmd /opt/tesseract/bin/tesseract --pdfium-lib ./lib

  # Korean-only by default, higher-resolution PDF rendering
  img2text --default-lang kor --dpi 300

ENVIRONMENT VARIABLES:
  TESSERACT_CMD           Tesseract executable (default: tesseract on PATH)
  TESSDATA_PREFIX         Directory with kor.traineddata / eng.traineddata
  PDFIUM_LIB_PATH         libpdfium file or directory; without it PDFs need a system install
  IMG2TEXT_BIND           Listen address
  IMG2TEXT_UPLOAD_DIR     Scratch directory for uploads
  IMG2TEXT_MAX_PAGES      Page limit for PDF uploads
  RUST_LOG                Log filter (overrides --verbose)

SETUP:
  Tesseract with the Korean language pack is required, e.g.
    apt install tesseract-ocr tesseract-ocr-kor
  PDF uploads additionally need libpdfium. Without it the server still
  handles images and reports PDF uploads as unsupported.
"#;

/// Extract text from uploaded images and PDFs with Tesseract OCR.
#[derive(Parser, Debug)]
#[command(
    name = "img2text",
    version,
    about = "Web front-end that extracts text from uploaded images and PDFs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "IMG2TEXT_BIND", default_value = "0.0.0.0:5000")]
    bind: SocketAddr,

    /// Scratch directory for uploads (default: $TMPDIR/img2text-uploads).
    #[arg(long, env = "IMG2TEXT_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Tesseract executable.
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    tesseract_cmd: PathBuf,

    /// Tesseract language data directory.
    #[arg(long, env = "TESSDATA_PREFIX")]
    tessdata_dir: Option<PathBuf>,

    /// libpdfium shared library, or the directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Language used when the form does not pick one.
    #[arg(long, env = "IMG2TEXT_DEFAULT_LANG", value_enum, default_value = "kor+eng")]
    default_lang: LangArg,

    /// PDF rendering DPI (72–400).
    #[arg(long, default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Timeout for one OCR call, and rendering budget for one PDF, in seconds.
    #[arg(long, default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    ocr_timeout: u64,

    /// Largest PDF accepted, in pages.
    #[arg(long, env = "IMG2TEXT_MAX_PAGES", default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..=10_000))]
    max_pages: u64,

    /// Largest accepted upload, in MiB.
    #[arg(long, default_value_t = 32,
          value_parser = clap::value_parser!(u64).range(1..=1024))]
    max_upload_mb: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2TEXT_VERBOSE")]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LangArg {
    Kor,
    #[value(name = "kor+eng", alias = "kor-eng")]
    KorEng,
}

impl From<LangArg> for LangMode {
    fn from(v: LangArg) -> Self {
        match v {
            LangArg::Kor => LangMode::Kor,
            LangArg::KorEng => LangMode::KorEng,
        }
    }
}

fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .bind(cli.bind)
        .tesseract_cmd(&cli.tesseract_cmd)
        .default_lang(cli.default_lang.clone().into())
        .dpi(cli.dpi)
        .ocr_timeout_secs(cli.ocr_timeout)
        .max_pages(cli.max_pages as usize)
        .max_upload_bytes((cli.max_upload_mb * 1024 * 1024) as usize);

    if let Some(ref dir) = cli.upload_dir {
        builder = builder.upload_dir(dir);
    }
    if let Some(ref dir) = cli.tessdata_dir {
        builder = builder.tessdata_dir(dir);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }

    builder.build().context("Invalid configuration")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| {
            format!("Cannot create upload directory {}", config.upload_dir.display())
        })?;

    // ── Check external engines ───────────────────────────────────────────
    // A missing Tesseract is reported per request; a missing pdfium only
    // disables PDF uploads.
    let tesseract = TesseractCli::new(&config);
    match tesseract.version().await {
        Ok(version) => info!("OCR engine: {}", version),
        Err(e) => warn!("{}", e),
    }

    let pdf: Option<Arc<dyn PdfPageExtractor>> = match PdfiumExtractor::load(&config) {
        Ok(extractor) => Some(Arc::new(extractor)),
        Err(e) => {
            warn!("PDF uploads disabled: {}", e);
            None
        }
    };

    let extractor = Extractor::new(Arc::new(tesseract), pdf);
    let bind = config.bind;
    let upload_dir = config.upload_dir.clone();
    let state = AppState::new(config, extractor).context("Failed to load page template")?;

    // ── Serve ────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Cannot listen on {}", bind))?;
    info!(
        "Listening on http://{} (uploads staged in {})",
        bind,
        upload_dir.display()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
