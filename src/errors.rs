use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::data::validator::FieldErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("record not found")]
    NotFound,

    #[error("edit conflict on record {id}: expected version {expected_version} is no longer current")]
    EditConflict { id: i64, expected_version: i32 },

    #[error("storage operation '{operation}' timed out")]
    Timeout { operation: &'static str },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid rate configuration: {0}")]
    InvalidRate(String),

    #[error("File system error: {0}")]
    FileSystemError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::EditConflict { .. } => StatusCode::CONFLICT,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ConfigurationError(_)
            | AppError::InvalidRate(_)
            | AppError::FileSystemError(_)
            | AppError::JsonError(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(fields) => json!({ "error": fields }),
            AppError::RateLimitExceeded => json!({ "error": "rate limit exceeded" }),
            AppError::NotFound => {
                json!({ "error": "the requested resource could not be found" })
            }
            AppError::EditConflict { id, expected_version } => json!({
                "error": format!(
                    "unable to update movie {} because version {} is stale, fetch it again and retry",
                    id, expected_version
                )
            }),
            AppError::Timeout { .. } => json!({
                "error": "the server could not complete the request in time, please retry"
            }),
            AppError::BadRequest(msg) => json!({ "error": msg }),
            other => {
                error!(error = %other, "request failed with an internal error");
                json!({
                    "error": "the server encountered a problem and could not process your request"
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, AppError>;
