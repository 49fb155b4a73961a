use crate::server::{flash, pages, router::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use axum_extra::extract::cookie::PrivateCookieJar;

/// GET /
pub async fn index(State(state): State<AppState>, jar: PrivateCookieJar) -> impl IntoResponse {
    let (jar, flashes) = flash::take(jar);
    (jar, Html(pages::index(&state.config.site, &flashes)))
}

/// GET /file_not_found
pub async fn file_not_found(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> impl IntoResponse {
    let (jar, flashes) = flash::take(jar);
    (
        StatusCode::NOT_FOUND,
        jar,
        Html(pages::file_not_found(&state.config.site, &flashes)),
    )
}

/// GET /file_expired
pub async fn file_expired(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> impl IntoResponse {
    let (jar, flashes) = flash::take(jar);
    (
        StatusCode::GONE,
        jar,
        Html(pages::file_expired(&state.config.site, &flashes)),
    )
}
