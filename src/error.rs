/*
 * Responsibility
 * - AppError: every failure a handler, extractor, middleware or fallback can surface
 * - IntoResponse: the only place the error envelope is built
 *   { "success": false, "error": <status>, "message": <string> }
 * - conversions from AuthError / RepoError / axum rejections
 */
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::auth::AuthError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Resource not found")]
    NotFound,

    #[error("Bad Request")]
    BadRequest,

    /// Well-formed body that fails domain validation. `reason` is logged only.
    #[error("unprocessable")]
    Unprocessable { reason: &'static str },

    /// Transport-level failures that carry their own status (405, 408, 413).
    #[error("{message}")]
    Http {
        status: StatusCode,
        message: &'static str,
    },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn unprocessable(reason: &'static str) -> Self {
        Self::Unprocessable { reason }
    }

    pub fn method_not_allowed() -> Self {
        Self::Http {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method Not Allowed",
        }
    }

    pub fn request_timeout() -> Self {
        Self::Http {
            status: StatusCode::REQUEST_TIMEOUT,
            message: "Request Timeout",
        }
    }

    pub fn payload_too_large() -> Self {
        Self::Http {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "Payload Too Large",
        }
    }

    pub fn internal(description: impl Into<String>) -> Self {
        Self::Internal(description.into())
    }

    /// A failed insert/update/delete is a 400 whatever the cause; the cause is logged.
    pub fn from_write(e: RepoError) -> Self {
        match e {
            RepoError::Constraint(detail) => tracing::warn!(%detail, "store rejected write"),
            RepoError::Unavailable { reason } => tracing::error!(%reason, "write failed"),
        }
        AppError::BadRequest
    }

    /// Classification table, first match wins.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(e) => e.status(),
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest => StatusCode::BAD_REQUEST,
            AppError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Http { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Internal(description) => {
                tracing::error!(%status, %description, "request failed")
            }
            AppError::Unprocessable { reason } => {
                tracing::debug!(%status, reason, "request rejected")
            }
            other => tracing::debug!(%status, error = %other, "request rejected"),
        }

        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        let description = e.to_string();
        match e {
            RepoError::Constraint(detail) => {
                tracing::warn!(%detail, "store rejected write");
                AppError::BadRequest
            }
            RepoError::Unavailable { reason } => {
                tracing::error!(%reason, "data store failure");
                AppError::Internal(description)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::payload_too_large();
        }
        tracing::debug!(error = %rejection.body_text(), "malformed JSON body");
        AppError::BadRequest
    }
}

// `/drinks/{id}` with a non-integer id does not name any resource.
impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::NotFound
    }
}
