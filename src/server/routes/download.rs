use crate::db::{DbFile, DownloadClaim};
use crate::error::SatchelError;
use crate::server::guards::csrf;
use crate::server::{flash, pages, router::AppState};
use crate::storage::password;
use axum::{
    Form,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use serde::Deserialize;
use std::io;
use tokio::{fs::File, io::AsyncReadExt};
use tracing::{info, warn};

const CHUNK_SIZE: usize = 64 * 1024;

const MSG_NOT_FOUND: &str = "Le fichier n'a pas été trouvé.";
const MSG_EXPIRED: &str = "Le fichier a expiré.";
const MSG_BAD_PASSWORD: &str = "Mot de passe incorrect.";

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub csrf_token: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// GET /download/{file_id}
///
/// Unprotected files are sent right away; protected ones get the password form.
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    jar: PrivateCookieJar,
) -> Result<Response, SatchelError> {
    let now = Utc::now();
    match state.db.get(&file_id).await? {
        None => Ok(redirect_not_found(&state, jar)),
        Some(file) if !file.is_available(now) => Ok(expire(&state, jar, &file).await?),
        Some(file) if file.requires_password() => {
            let (jar, token) = csrf::issue(jar, state.secure_cookies());
            let (jar, flashes) = flash::take(jar);
            let html = pages::password_form(
                &state.config.site,
                &flashes,
                &token,
                &file.id,
                &file.original_filename,
            );
            Ok((jar, Html(html)).into_response())
        }
        Some(_) => claim_and_send(&state, jar, &file_id).await,
    }
}

/// POST /download/{file_id}
pub async fn download_with_password(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    jar: PrivateCookieJar,
    Form(form): Form<PasswordForm>,
) -> Result<Response, SatchelError> {
    csrf::verify(&jar, form.csrf_token.as_deref())?;

    let now = Utc::now();
    let file = match state.db.get(&file_id).await? {
        None => return Ok(redirect_not_found(&state, jar)),
        Some(file) if !file.is_available(now) => return expire(&state, jar, &file).await,
        Some(file) => file,
    };

    if let Some(stored) = file.password_hash.as_deref() {
        if !password::verify(&form.password, stored) {
            warn!(id = %file_id, "Rejected download with wrong password");
            let jar = flash::push(jar, MSG_BAD_PASSWORD, state.secure_cookies());
            return Ok((jar, Redirect::to(&format!("/download/{file_id}"))).into_response());
        }
    }

    claim_and_send(&state, jar, &file_id).await
}

async fn claim_and_send(
    state: &AppState,
    jar: PrivateCookieJar,
    file_id: &str,
) -> Result<Response, SatchelError> {
    match state.db.claim_download(file_id, Utc::now()).await? {
        DownloadClaim::NotFound => Ok(redirect_not_found(state, jar)),
        DownloadClaim::Expired(file) => {
            state.blobs.discard(&file.id).await;
            Ok(redirect_expired(state, jar))
        }
        DownloadClaim::Granted(file) => match state.blobs.open(&file.id).await {
            Ok(blob) => {
                info!(id = %file.id, views = file.views, "Serving download");
                attachment(&file, blob).await
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(id = %file.id, "Blob missing for existing row; dropping row");
                state.db.delete(&file.id).await?;
                Ok(redirect_not_found(state, jar))
            }
            Err(e) => Err(e.into()),
        },
    }
}

/// Removes an unavailable file (row and blob) and redirects to the expired page.
async fn expire(
    state: &AppState,
    jar: PrivateCookieJar,
    file: &DbFile,
) -> Result<Response, SatchelError> {
    state.db.delete(&file.id).await?;
    state.blobs.discard(&file.id).await;
    Ok(redirect_expired(state, jar))
}

fn redirect_not_found(state: &AppState, jar: PrivateCookieJar) -> Response {
    let jar = flash::push(jar, MSG_NOT_FOUND, state.secure_cookies());
    (jar, Redirect::to("/file_not_found")).into_response()
}

fn redirect_expired(state: &AppState, jar: PrivateCookieJar) -> Response {
    let jar = flash::push(jar, MSG_EXPIRED, state.secure_cookies());
    (jar, Redirect::to("/file_expired")).into_response()
}

async fn attachment(file: &DbFile, blob: File) -> Result<Response, SatchelError> {
    let len = blob.metadata().await?.len();
    let disposition =
        HeaderValue::from_str(&content_disposition(&file.filename, &file.original_filename))
            .map_err(|e| SatchelError::UnexpectedError(format!("bad content-disposition: {e}")))?;

    let mut resp = Response::new(file_body(blob));
    *resp.status_mut() = StatusCode::OK;
    let headers = resp.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(CONTENT_DISPOSITION, disposition);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(resp)
}

fn file_body(file: File) -> Body {
    let stream = futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok::<_, io::Error>(None);
        }
        buf.truncate(n);
        Ok::<_, io::Error>(Some((Bytes::from(buf), file)))
    });
    Body::from_stream(stream)
}

/// `attachment` disposition with an ASCII fallback and the RFC 5987 UTF-8 name.
fn content_disposition(fallback: &str, original: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(original.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A");
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
