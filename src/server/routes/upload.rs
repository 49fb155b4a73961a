use crate::db::NewFile;
use crate::error::SatchelError;
use crate::server::guards::csrf;
use crate::server::{flash, pages, router::AppState};
use crate::storage::{BlobStore, ExpiryOption, is_allowed, password, secure_filename};
use axum::{
    extract::{Multipart, State, multipart::Field},
    http::{HeaderMap, header::HOST},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Blob already written to disk while the multipart body was read.
#[derive(Debug)]
struct StagedBlob {
    id: String,
    original_filename: String,
    size: u64,
}

#[derive(Debug, Default)]
struct UploadForm {
    csrf_token: Option<String>,
    saw_file_field: bool,
    /// Filename of a file part that was not stored.
    rejected: Option<String>,
    staged: Option<StagedBlob>,
    expiry: Option<String>,
    password: Option<String>,
    max_downloads: Option<String>,
}

/// GET /upload
pub async fn upload_page(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let (jar, token) = csrf::issue(jar, state.secure_cookies());
    let (jar, flashes) = flash::take(jar);
    let html = pages::upload_form(
        &state.config.site,
        &flashes,
        &token,
        &state.config.storage.allowed_extensions,
    );
    (jar, Html(html)).into_response()
}

/// POST /upload
///
/// Streams the file part straight into the data directory, then validates the
/// rest of the form. Any rejection removes the staged blob again. The CSRF
/// field must precede the file part; nothing is written to disk before it checks out.
pub async fn upload_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, SatchelError> {
    let mut form = UploadForm::default();
    if let Err(e) = read_form(&state, &jar, &mut multipart, &mut form).await {
        discard_staged(&state.blobs, &mut form).await;
        return Err(e);
    }

    if let Err(e) = csrf::verify(&jar, form.csrf_token.as_deref()) {
        discard_staged(&state.blobs, &mut form).await;
        return Err(e);
    }

    let secure = state.secure_cookies();
    let reject = |jar: PrivateCookieJar, message: &str| {
        (flash::push(jar, message, secure), Redirect::to("/upload")).into_response()
    };

    if !form.saw_file_field {
        return Ok(reject(jar, "No file part"));
    }
    let Some(staged) = form.staged.take() else {
        return Ok(match form.rejected.as_deref() {
            Some(name) if !name.is_empty() => {
                debug!(filename = %name, "Rejected upload with disallowed extension");
                reject(jar, "File type not allowed")
            }
            _ => reject(jar, "No selected file"),
        });
    };

    let new_file = match build_record(&form, &staged) {
        Ok(new_file) => new_file,
        Err(message) => {
            state.blobs.discard(&staged.id).await;
            return Ok(reject(jar, message));
        }
    };

    if let Err(e) = state.db.insert(new_file).await {
        state.blobs.discard(&staged.id).await;
        return Err(e);
    }

    info!(
        id = %staged.id,
        filename = %staged.original_filename,
        size = staged.size,
        "Stored upload"
    );

    let link = download_link(state.config.basic.public_url.as_ref(), &headers, &staged.id);
    let jar = flash::push(
        jar,
        format!("File uploaded successfully. Download link: {link}"),
        secure,
    );
    Ok((jar, Redirect::to("/")).into_response())
}

async fn read_form(
    state: &AppState,
    jar: &PrivateCookieJar,
    multipart: &mut Multipart,
    form: &mut UploadForm,
) -> Result<(), SatchelError> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                csrf::verify(jar, form.csrf_token.as_deref())?;
                form.saw_file_field = true;
                let original = field.file_name().unwrap_or_default().to_string();
                if form.staged.is_some() || original.is_empty() {
                    continue;
                }
                if !is_allowed(&original, &state.config.storage.allowed_extensions) {
                    form.rejected = Some(original);
                    continue;
                }
                let id = Uuid::new_v4().to_string();
                let size = match write_blob(&state.blobs, &id, field).await {
                    Ok(size) => size,
                    Err(e) => {
                        state.blobs.discard(&id).await;
                        return Err(e);
                    }
                };
                form.staged = Some(StagedBlob {
                    id,
                    original_filename: original,
                    size,
                });
            }
            Some(csrf::CSRF_FIELD) => form.csrf_token = Some(field.text().await?),
            Some("expiry") => form.expiry = Some(field.text().await?),
            Some("password") => form.password = Some(field.text().await?),
            Some("max_downloads") => form.max_downloads = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(())
}

async fn write_blob(
    blobs: &BlobStore,
    id: &str,
    mut field: Field<'_>,
) -> Result<u64, SatchelError> {
    let mut file = blobs.create(id).await?;
    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(size)
}

async fn discard_staged(blobs: &BlobStore, form: &mut UploadForm) {
    if let Some(staged) = form.staged.take() {
        blobs.discard(&staged.id).await;
    }
}

/// Validates the non-file fields; the error is the message shown to the user.
fn build_record(form: &UploadForm, staged: &StagedBlob) -> Result<NewFile, &'static str> {
    let expiry: ExpiryOption = form
        .expiry
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| "Invalid expiry option")?;

    let max_downloads = match form.max_downloads.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n >= 1 => Some(n),
            _ => return Err("Maximum downloads must be a positive number"),
        },
    };

    let password_hash = form
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(password::hash);

    Ok(NewFile {
        id: staged.id.clone(),
        filename: secure_filename(&staged.original_filename),
        original_filename: staged.original_filename.clone(),
        expiry: expiry.deadline(Utc::now()),
        max_downloads,
        password_hash,
    })
}

/// Absolute link when a public URL or a well-formed `Host` header is known,
/// otherwise a path. Set `basic.public_url` in production; the header is client-supplied.
fn download_link(public_url: Option<&Url>, headers: &HeaderMap, id: &str) -> String {
    let path = format!("/download/{id}");
    if let Some(base) = public_url {
        return format!("{}{path}", base.as_str().trim_end_matches('/'));
    }

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| is_plausible_host(h));
    let Some(host) = host else {
        return path;
    };
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|p| *p == "https")
        .unwrap_or("http");
    format!("{scheme}://{host}{path}")
}

/// Hostname, IPv4 or bracketed IPv6 literal with an optional port.
fn is_plausible_host(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 255
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn staged() -> StagedBlob {
        StagedBlob {
            id: "abc".to_string(),
            original_filename: "My Report.pdf".to_string(),
            size: 3,
        }
    }

    #[test]
    fn record_carries_sanitized_name_and_options() {
        let form = UploadForm {
            expiry: Some("1d".to_string()),
            max_downloads: Some(" 3 ".to_string()),
            password: Some("pw".to_string()),
            ..UploadForm::default()
        };
        let rec = build_record(&form, &staged()).expect("valid form");
        assert_eq!(rec.filename, "My_Report.pdf");
        assert_eq!(rec.original_filename, "My Report.pdf");
        assert_eq!(rec.max_downloads, Some(3));
        assert!(rec.password_hash.is_some_and(|h| password::verify("pw", &h)));
        assert!(rec.expiry > Utc::now() + chrono::Duration::hours(23));
    }

    #[test]
    fn bad_optional_fields_are_reported() {
        let mut form = UploadForm {
            expiry: Some("forever".to_string()),
            ..UploadForm::default()
        };
        assert_eq!(
            build_record(&form, &staged()).unwrap_err(),
            "Invalid expiry option"
        );

        form.expiry = Some("3h".to_string());
        form.max_downloads = Some("0".to_string());
        assert_eq!(
            build_record(&form, &staged()).unwrap_err(),
            "Maximum downloads must be a positive number"
        );

        form.max_downloads = Some(String::new());
        form.password = Some(String::new());
        let rec = build_record(&form, &staged()).expect("blank optionals are fine");
        assert_eq!(rec.max_downloads, None);
        assert_eq!(rec.password_hash, None);
    }

    #[test]
    fn download_link_prefers_public_url_and_ignores_odd_hosts() {
        let base = Url::parse("https://files.example.com/").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("attacker.example"));
        assert_eq!(
            download_link(Some(&base), &headers, "abc"),
            "https://files.example.com/download/abc"
        );

        assert_eq!(
            download_link(None, &headers, "abc"),
            "http://attacker.example/download/abc"
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert(HOST, HeaderValue::from_static("[::1]:5000"));
        assert_eq!(
            download_link(None, &headers, "abc"),
            "https://[::1]:5000/download/abc"
        );

        headers.insert(HOST, HeaderValue::from_static("evil.example/phish?x="));
        assert_eq!(download_link(None, &headers, "abc"), "/download/abc");

        headers.insert(HOST, HeaderValue::from_static("a b"));
        assert_eq!(download_link(None, &headers, "abc"), "/download/abc");
    }
}
