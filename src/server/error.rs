//! JSON error responses for the HTTP layer.

use crate::error::Drop2MdError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable kind, e.g. `unsupported_format`.
    pub error: String,
    /// Human-readable message, including the converter's own words.
    pub detail: String,
}

/// An HTTP status plus an [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    detail: String,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            detail: detail.into(),
        }
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Drop2MdError> for ApiError {
    fn from(err: Drop2MdError) -> Self {
        let (status, kind) = match err.root() {
            Drop2MdError::UnsupportedFormat { .. } => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format")
            }
            Drop2MdError::FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "file_too_large"),
            Drop2MdError::EmptyBatch => (StatusCode::BAD_REQUEST, "empty_batch"),
            Drop2MdError::ConversionFailed { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "conversion_failed")
            }
            Drop2MdError::ConversionTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        Self::new(status, kind, err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), "invalid_upload", err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind.to_string(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}
