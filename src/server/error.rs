//! Translation of pipeline errors into HTTP responses.
//!
//! Status mapping:
//!
//! | Failure | Status | Body |
//! |---------|--------|------|
//! | Unsupported/missing content type | 400 | `{"detail": …}` |
//! | Malformed multipart request | 400 | `{"detail": …}` |
//! | Malformed model output | 500 | `{"message": …, "rawModelOutput": …}` |
//! | Any other pipeline failure | 500 | `{"message": …}` |
//!
//! `rawModelOutput` carries the model's stripped text verbatim so operators
//! can inspect why parsing failed; nothing is silently swallowed.

use crate::error::ExtractError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request itself is unacceptable (bad multipart, missing field).
    #[error("{0}")]
    BadRequest(String),

    /// A pipeline stage failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Extract(err) => extract_error_response(err),
        }
    }
}

fn extract_error_response(err: ExtractError) -> Response {
    match err {
        e @ ExtractError::UnsupportedMediaType { .. } => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": e.to_string() })),
        )
            .into_response(),
        ExtractError::MalformedModelOutput { raw } => {
            tracing::error!("model output failed to parse; raw text returned for diagnosis");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": "Model output is not valid JSON",
                    "rawModelOutput": raw,
                })),
            )
                .into_response()
        }
        e => {
            tracing::error!("extraction failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": e.to_string() })),
            )
                .into_response()
        }
    }
}
