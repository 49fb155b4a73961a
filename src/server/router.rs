use crate::config::Config;
use crate::db::DbActorHandle;
use crate::error::ErrorPage;
use crate::server::guards::rate_limit::{ClientRateLimiter, rate_limit};
use crate::server::{pages, routes};
use crate::storage::BlobStore;

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, FromRef, Request, State},
    http::{
        HeaderName, HeaderValue, StatusCode, Version,
        header::{CONTENT_LENGTH, USER_AGENT, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
    },
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::Key;
use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha512};
use std::sync::Arc;
use std::time::Instant;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

/// Cookie key derived from the configured secret; a blank secret yields a per-process key.
fn cookie_key(secret: &str) -> Key {
    if secret.trim().is_empty() {
        warn!("basic.secret_key is empty; using a random cookie key (forms reset on restart)");
        return Key::generate();
    }
    // Key::from needs 64 bytes of material.
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbActorHandle,
    pub blobs: BlobStore,
    pub config: Arc<Config>,
    pub limiter: Option<Arc<ClientRateLimiter>>,
    cookie_key: Key,
}

impl AppState {
    pub fn new(db: DbActorHandle, config: Arc<Config>) -> Self {
        let blobs = BlobStore::new(config.storage.data_dir.clone());
        let limiter = ClientRateLimiter::from_config(&config.limits).map(Arc::new);
        let cookie_key = cookie_key(&config.basic.secret_key);
        Self {
            db,
            blobs,
            config,
            limiter,
            cookie_key,
        }
    }

    /// Whether cookies carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        !self.config.basic.insecure_cookie
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

async fn not_found_handler(State(state): State<AppState>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(pages::not_found(&state.config.site)),
    )
        .into_response()
}

/// Re-renders handler error pages with the configured site branding.
async fn site_error_pages(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let resp = next.run(req).await;
    let Some(page) = resp.extensions().get::<ErrorPage>().copied() else {
        return resp;
    };
    let (mut parts, _) = resp.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    let html = pages::error_page(&state.config.site, parts.status, page.message);
    Response::from_parts(parts, Body::from(html))
}

async fn access_log(req: Request, next: Next) -> Response {
    // Capture request metadata before moving `req` into the handler stack.
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    // Always reflect `x-request-id` for easier correlation, even if the client didn't send one.
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    let path = uri.path();
    let protocol = format_http_version(version);

    // Downloads stream their body; `latency_ms` is time-to-first-byte.
    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    }

    resp
}

pub fn satchel_router(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes;

    let pages = Router::new()
        .route("/", get(routes::pages::index))
        .route("/file_not_found", get(routes::pages::file_not_found))
        .route("/file_expired", get(routes::pages::file_expired))
        .route("/static/style.css", get(routes::assets::stylesheet));

    let files = Router::new()
        .route(
            "/upload",
            get(routes::upload::upload_page).post(routes::upload::upload_submit),
        )
        .route(
            "/download/{file_id}",
            get(routes::download::download_file).post(routes::download::download_with_password),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .merge(pages)
        .merge(files)
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            site_error_pages,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state)
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(middleware::from_fn(access_log))
}
