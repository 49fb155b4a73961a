use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use thiserror::Error as ThisError;
use tracing::error;

use crate::config::SiteConfig;
use crate::server::pages;

/// Attached to error responses so the router can re-render them with the configured site.
#[derive(Debug, Clone, Copy)]
pub struct ErrorPage {
    pub message: &'static str,
}

#[derive(Debug, ThisError)]
pub enum SatchelError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Multipart error: {0}")]
    MultipartError(#[from] MultipartError),

    #[error("Invalid or missing CSRF token")]
    CsrfMismatch,

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl From<figment::Error> for SatchelError {
    fn from(err: figment::Error) -> Self {
        SatchelError::Config(Box::new(err))
    }
}

impl IntoResponse for SatchelError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            SatchelError::CsrfMismatch => (
                StatusCode::BAD_REQUEST,
                "The form has expired or was not submitted from this site. Please try again.",
            ),
            SatchelError::MultipartError(e) => (
                e.status(),
                "The upload could not be read. Please try again.",
            ),
            SatchelError::Config(_)
            | SatchelError::InvalidConfig(_)
            | SatchelError::IoError(_)
            | SatchelError::DatabaseError(_)
            | SatchelError::RactorError(_)
            | SatchelError::UnexpectedError(_) => {
                error!(error = %self, "Request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.",
                )
            }
        };
        let html = pages::error_page(&SiteConfig::default(), status, message);
        let mut resp = (status, Html(html)).into_response();
        resp.extensions_mut().insert(ErrorPage { message });
        resp
    }
}
