//! Error types for the HTTP API.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::service::TransferError;

/// Errors surfaced to API callers as plain-text bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body missing, unparseable, or missing required fields.
    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("license not found")]
    LicenseNotFound,

    #[error("rate limit exceeded")]
    RateLimited,

    /// A transfer failed admission.
    #[error(transparent)]
    TransferDenied(#[from] TransferError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error. Transfer denials map to 500.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::LicenseNotFound => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::TransferDenied(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::BadRequest(_) => "Invalid request body".to_string(),
            Self::MethodNotAllowed => "Method not allowed".to_string(),
            Self::LicenseNotFound => "License not found".to_string(),
            Self::RateLimited => "Rate limit exceeded".to_string(),
            // Denial reasons are meant for the caller
            Self::TransferDenied(e) => e.to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        };

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(
            status = %rejection.status(),
            "Rejected request body: {}",
            rejection.body_text()
        );
        Self::BadRequest(rejection.body_text())
    }
}
