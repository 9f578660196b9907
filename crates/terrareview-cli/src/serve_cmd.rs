use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use bytes::Bytes;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use terrareview_core::session::cookie::{find_session_cookie, set_cookie_header};
use terrareview_core::session::{SessionId, SessionKey, SessionStore};
use terrareview_core::summarize::Summarizer;
use terrareview_core::upload::{UploadError, is_allowed, sanitize_filename};
use terrareview_core::{ChatCompletionsClient, Reviewer, UploadStore};

use crate::config::TerrareviewConfig;
use crate::render;

/// Shown when an upload has a disallowed extension.
const NOT_ALLOWED_NOTICE: &str = "File type not allowed. Please upload .json or .txt files only. \
Generate files using: \"terraform plan > plan.txt\" or \
\"terraform plan -out=plan.tfplan && terraform show -json plan.tfplan > plan.json\"";

const KEY_CLEARED_NOTICE: &str = "API key cleared from session";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        let status = match err {
            UploadError::NoFile | UploadError::NotAllowed { .. } => StatusCode::BAD_REQUEST,
            UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared by every request. Clones share the underlying stores.
#[derive(Clone)]
pub struct AppState {
    pub reviewer: Arc<Reviewer>,
    pub uploads: UploadStore,
    pub sessions: SessionStore,
    pub session_key: SessionKey,
}

impl AppState {
    pub fn new(
        reviewer: Reviewer,
        uploads: UploadStore,
        sessions: SessionStore,
        session_key: SessionKey,
    ) -> Self {
        Self {
            reviewer: Arc::new(reviewer),
            uploads,
            sessions,
            session_key,
        }
    }

    /// Build state from resolved configuration and a summarizer.
    pub fn from_config(config: &TerrareviewConfig, summarizer: Arc<dyn Summarizer>) -> Self {
        let session_key = match &config.session_key {
            Some(key) => key.clone(),
            None => {
                tracing::warn!(
                    "no session secret configured; using an ephemeral key (sessions end on restart)"
                );
                SessionKey::generate()
            }
        };
        Self::new(
            Reviewer::new(config.markers.clone(), summarizer),
            UploadStore::new(config.upload_dir.clone()),
            SessionStore::new(config.idle_ttl),
            session_key,
        )
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub filename: String,
    pub is_valid: bool,
    pub message: String,
    pub has_plan_data: bool,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.uploads.max_bytes();
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/api/validate", post(validate))
        .route("/clear-api-key", post(clear_api_key))
        .layer(middleware::from_fn_with_state(state.clone(), session_layer))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: TerrareviewConfig) -> Result<()> {
    let client = ChatCompletionsClient::new(config.summarizer.clone())
        .context("failed to build summarizer client")?;
    let state = AppState::from_config(&config, Arc::new(client));
    state
        .uploads
        .ensure_dir()
        .context("failed to prepare upload directory")?;

    let app = build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.bind, config.port))?;
    tracing::info!(
        model = %config.summarizer.model,
        upload_dir = %config.upload_dir.display(),
        "terrareview serve listening on http://{addr}"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("terrareview serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Session middleware
// ---------------------------------------------------------------------------

/// Attach a [`SessionId`] to every request. A cookie is issued only once the
/// request has stored something for a session the client did not present.
async fn session_layer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let presented = req
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(find_session_cookie)
        .and_then(|value| state.session_key.verify(value).ok());

    let session = match presented {
        Some(id) => {
            state.sessions.touch(id);
            id
        }
        None => SessionId::new(),
    };
    req.extensions_mut().insert(session);

    let mut response = next.run(req).await;
    if presented.is_none() && state.sessions.contains(session) {
        let cookie = set_cookie_header(&state.session_key.sign(session));
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

// ---------------------------------------------------------------------------
// Multipart form
// ---------------------------------------------------------------------------

struct UploadForm {
    filename: String,
    bytes: Bytes,
    api_key: Option<String>,
}

enum FormError {
    /// The form was readable but the file is not acceptable.
    Rejected(UploadError),
    Malformed(MultipartError),
}

impl From<MultipartError> for FormError {
    fn from(err: MultipartError) -> Self {
        Self::Malformed(err)
    }
}

/// Read the `file` and `api_key` fields.
///
/// The filename is sanitized and checked against the allow-list before
/// the file content is read.
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, FormError> {
    let mut file = None;
    let mut api_key = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let filename = sanitize_filename(field.file_name().unwrap_or_default());
                if filename.is_empty() {
                    continue;
                }
                if !is_allowed(&filename) {
                    return Err(FormError::Rejected(UploadError::NotAllowed { filename }));
                }
                let bytes = field.bytes().await?;
                file = Some((filename, bytes));
            }
            Some("api_key") => {
                api_key = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or(FormError::Rejected(UploadError::NoFile))?;
    Ok(UploadForm {
        filename,
        bytes,
        api_key,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Html<String> {
    let flashes = state.sessions.take_flashes(session);
    let has_key = state.sessions.credential(session).is_some();
    Html(render::index_page(&flashes, has_key))
}

fn flash_redirect(state: &AppState, session: SessionId, message: impl Into<String>) -> Response {
    state.sessions.push_flash(session, message);
    Redirect::to("/").into_response()
}

fn rejection_notice(err: &UploadError) -> String {
    match err {
        UploadError::NotAllowed { .. } => NOT_ALLOWED_NOTICE.to_string(),
        UploadError::NoFile => err.to_string(),
        other => format!("An error occurred: {other}"),
    }
}

async fn upload(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    multipart: Multipart,
) -> Response {
    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(FormError::Rejected(err)) => {
            tracing::info!(%session, error = %err, "upload rejected");
            return flash_redirect(&state, session, rejection_notice(&err));
        }
        Err(FormError::Malformed(err)) => return AppError::from(err).into_response(),
    };

    let staged = match state.uploads.stage(&form.filename, &form.bytes) {
        Ok(staged) => staged,
        Err(err @ UploadError::TooLarge { .. }) => return AppError::from(err).into_response(),
        Err(err) => {
            tracing::error!(%session, error = %err, "failed to stage upload");
            return flash_redirect(&state, session, rejection_notice(&err));
        }
    };

    let credential = state
        .sessions
        .resolve_credential(session, form.api_key.as_deref());
    let result = state.reviewer.review(&staged, credential.as_ref()).await;
    if let Err(err) = staged.release() {
        tracing::warn!(error = %err, "failed to remove staged upload");
    }

    match result {
        Ok(outcome) => {
            let has_key = state.sessions.credential(session).is_some();
            Html(render::result_page(&outcome, has_key)).into_response()
        }
        Err(err) => {
            tracing::error!(%session, error = %err, "upload review failed");
            flash_redirect(&state, session, rejection_notice(&err))
        }
    }
}

async fn validate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ValidateResponse>, AppError> {
    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(FormError::Rejected(err)) => return Err(err.into()),
        Err(FormError::Malformed(err)) => return Err(err.into()),
    };

    let staged = state.uploads.stage(&form.filename, &form.bytes)?;
    let result = state.reviewer.validate(&staged).await;
    staged
        .release()
        .map_err(|e| AppError::internal(format!("failed to remove staged upload: {e}")))?;
    let validation = result?;

    Ok(Json(ValidateResponse {
        filename: form.filename,
        is_valid: validation.is_valid,
        has_plan_data: validation.has_plan_data(),
        message: validation.message,
    }))
}

async fn clear_api_key(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Response {
    if state.sessions.clear_credential(session) {
        tracing::info!(%session, "credential cleared");
    }
    flash_redirect(&state, session, KEY_CLEARED_NOTICE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
