//! One-shot messages carried to the next rendered page in a private cookie.

use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use time::Duration;
use tracing::debug;

pub const FLASH_COOKIE: &str = "satchel_flash";

/// Appends `message` to the pending flash messages.
pub fn push(jar: PrivateCookieJar, message: impl Into<String>, secure: bool) -> PrivateCookieJar {
    let mut messages = peek(&jar);
    messages.push(message.into());
    match serde_json::to_string(&messages) {
        Ok(value) => jar.add(build_cookie(value, secure)),
        Err(e) => {
            debug!(error = %e, "Dropping flash message that failed to serialize");
            jar
        }
    }
}

/// Removes and returns the pending flash messages.
pub fn take(jar: PrivateCookieJar) -> (PrivateCookieJar, Vec<String>) {
    let messages = peek(&jar);
    if messages.is_empty() {
        return (jar, messages);
    }
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), messages)
}

fn peek(jar: &PrivateCookieJar) -> Vec<String> {
    jar.get(FLASH_COOKIE)
        .and_then(|c| serde_json::from_str(c.value()).ok())
        .unwrap_or_default()
}

fn build_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(5))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Key;

    #[test]
    fn messages_accumulate_and_are_consumed_once() {
        let jar = PrivateCookieJar::new(Key::generate());
        let jar = push(jar, "first", false);
        let jar = push(jar, "second", false);

        let (jar, messages) = take(jar);
        assert_eq!(messages, vec!["first".to_string(), "second".to_string()]);

        let (_, messages) = take(jar);
        assert!(messages.is_empty());
    }
}
