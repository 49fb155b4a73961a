//! Double-submit CSRF protection.
//!
//! The token lives in a private (encrypted) cookie and is echoed back by every
//! form as a hidden `csrf_token` field; a POST is accepted only when both match.

use crate::error::SatchelError;
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use base64::Engine as _;
use rand::RngCore;
use subtle::ConstantTimeEq;
use time::Duration;

pub const CSRF_COOKIE: &str = "satchel_csrf";
pub const CSRF_FIELD: &str = "csrf_token";

fn generate_token() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Returns the token to embed in a form, minting (and storing) one if the client has none.
pub fn issue(jar: PrivateCookieJar, secure: bool) -> (PrivateCookieJar, String) {
    if let Some(existing) = jar
        .get(CSRF_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
    {
        return (jar, existing);
    }
    let token = generate_token();
    let jar = jar.add(build_cookie(token.clone(), secure));
    (jar, token)
}

/// Checks a submitted token against the cookie in constant time.
pub fn verify(jar: &PrivateCookieJar, submitted: Option<&str>) -> Result<(), SatchelError> {
    let expected = jar
        .get(CSRF_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(SatchelError::CsrfMismatch)?;
    let submitted = submitted
        .filter(|v| !v.is_empty())
        .ok_or(SatchelError::CsrfMismatch)?;

    if submitted.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(SatchelError::CsrfMismatch)
    }
}

fn build_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(1))
        .build()
}
