use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::append::AppendError;
use crate::store::StoreError;

// Errors surfaced to HTTP callers. Internal detail stays in the logs.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("rate limited on {route}")]
    RateLimited { route: String, message: String },
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("already exists")]
    AlreadyExists,
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<&'a str>,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: ErrorBody<'a>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict | Self::AlreadyExists => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Validation(_) => "invalid_request",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::AlreadyExists => "already_exists",
            Self::Internal(_) => "internal_error",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Conflict)
    }
}

impl From<AppendError> for AppError {
    fn from(e: AppendError) -> Self {
        match e {
            AppendError::NotFound => Self::NotFound,
            AppendError::ConflictExhausted { .. } => Self::Conflict,
            AppendError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::RateLimited { route, message } => {
                tracing::debug!(route = %route, "request rate limited");
                message.as_str()
            }
            Self::Validation(msg) => msg.as_str(),
            Self::NotFound => "Thumbnail not found",
            Self::Conflict => "Too many simultaneous edits. Please retry.",
            Self::AlreadyExists => "Thumbnail already exists",
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "Internal server error"
            }
        };
        let route = match &self {
            Self::RateLimited { route, .. } => Some(route.as_str()),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message,
                retryable: self.retryable(),
                route,
            },
        };
        (self.status_code(), Json(body)).into_response()
    }
}
