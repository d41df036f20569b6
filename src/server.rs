//! HTTP surface: one page, served on `GET /` and re-rendered on `POST /`.
//!
//! Handlers are thin. `POST /` turns the multipart body into an
//! [`UploadRequest`], runs [`handle_upload`], and renders the resulting
//! [`PageView`]. Every outcome of the pipeline, including a broken multipart
//! body, is shown inline on the page with status 200. Only a template failure
//! produces a 500.

use crate::config::{LangMode, ServiceConfig};
use crate::error::Img2TextError;
use crate::extract::Extractor;
use crate::handler::{handle_upload, PageView, UploadRequest, UploadedFile};
use crate::template::Templates;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Room left on top of `max_upload_bytes` for the other form fields and the
/// multipart framing.
const FORM_OVERHEAD: usize = 64 * 1024;

/// State shared by all routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub extractor: Extractor,
    templates: Arc<Templates>,
}

impl AppState {
    pub fn new(config: ServiceConfig, extractor: Extractor) -> Result<Self, Img2TextError> {
        Ok(Self {
            config: Arc::new(config),
            extractor,
            templates: Arc::new(Templates::new()?),
        })
    }
}

/// Build the application router.
///
///   GET  /  — blank upload form
///   POST /  — extract text from the submitted file
///
/// The file part itself is limited to `max_upload_bytes` while reading the
/// form. The whole body gets [`FORM_OVERHEAD`] more; a body past that is cut
/// off by axum and the language choice is lost.
pub fn router(state: AppState) -> Router {
    let limit = state.config.max_upload_bytes.saturating_add(FORM_OVERHEAD);
    Router::new()
        .route("/", get(index).post(upload))
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Response {
    render(&state, &PageView::empty(state.config.default_lang))
}

async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let default_lang = state.config.default_lang;
    let request = match multipart {
        Ok(multipart) => {
            read_form(multipart, default_lang, state.config.max_upload_bytes).await
        }
        Err(rejection) => Err((
            default_lang,
            Img2TextError::MalformedUpload(rejection.body_text()),
        )),
    };

    let view = match request {
        Ok(request) => handle_upload(&state.extractor, &state.config.upload_dir, request).await,
        Err((lang, e)) => {
            warn!("Unreadable upload: {}", e);
            PageView::failed(lang, &e)
        }
    };
    render(&state, &view)
}

/// Collect the `file` and `lang_mode` fields.
///
/// A file larger than `max_bytes` is drained and dropped, and the rest of the
/// form is still read, so the error comes back with the user's language. On
/// a parse error, returns the language seen so far with the error.
async fn read_form(
    mut multipart: Multipart,
    default_lang: LangMode,
    max_bytes: usize,
) -> Result<UploadRequest, (LangMode, Img2TextError)> {
    let mut request = UploadRequest {
        file: None,
        lang_mode: default_lang,
    };
    let mut too_large = false;

    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err((request.lang_mode, Img2TextError::MalformedUpload(e.body_text())))
            }
        };
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" if request.file.is_some() || too_large => {
                debug!("Ignoring additional file part");
            }
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let mut bytes = Vec::new();
                loop {
                    let chunk = match field.chunk().await {
                        Ok(Some(chunk)) => chunk,
                        Ok(None) => break,
                        Err(e) => {
                            let err = Img2TextError::MalformedUpload(e.body_text());
                            return Err((request.lang_mode, err));
                        }
                    };
                    if too_large {
                        continue;
                    }
                    if bytes.len() + chunk.len() > max_bytes {
                        too_large = true;
                        bytes = Vec::new();
                        continue;
                    }
                    bytes.extend_from_slice(&chunk);
                }
                if !too_large {
                    request.file = Some(UploadedFile { filename, bytes });
                }
            }
            "lang_mode" => {
                let value = field.text().await.map_err(|e| {
                    (request.lang_mode, Img2TextError::MalformedUpload(e.body_text()))
                })?;
                request.lang_mode = LangMode::parse(&value).unwrap_or_else(|| {
                    warn!("Unknown lang_mode '{}', using {}", value, default_lang);
                    default_lang
                });
            }
            other => debug!("Ignoring form field '{}'", other),
        }
    }

    if too_large {
        return Err((
            request.lang_mode,
            Img2TextError::UploadTooLarge { limit: max_bytes },
        ));
    }
    Ok(request)
}

fn render(state: &AppState, view: &PageView) -> Response {
    match state
        .templates
        .render_page(view, state.extractor.supports_pdf())
    {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}
