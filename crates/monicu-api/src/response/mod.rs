//! Error responses
//!
//! Every failure renders as `{"error": {"code", "message"}}`. Messages of
//! 5xx responses are replaced with a generic one; the detail goes to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use monicu_common::AppError;
use monicu_core::DomainError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid query parameter: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Store(#[from] DomainError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        let code = match self {
            Self::InvalidQuery(_) => return StatusCode::BAD_REQUEST,
            Self::Store(e) if e.is_not_found() => 404,
            Self::Store(e) if e.is_validation() => 400,
            Self::Store(e) if e.is_conflict() => 409,
            Self::Store(_) => 500,
            Self::App(e) => e.status_code(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "INVALID_QUERY_PARAMETER",
            Self::Store(e) => e.code(),
            Self::App(e) => e.error_code(),
        }
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.error_code(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
