//! API error responses.
//!
//! Maps the operation failure taxonomy to HTTP statuses, keeping the
//! taxonomy code in the body so callers can branch on it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::custody::service::OperationError;

/// A JSON error response with a stable taxonomy code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_request",
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: "no record for that transaction hash".to_string(),
        }
    }
}

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        let status = match &err {
            // Bad call-data construction is fatal to the request.
            OperationError::Encoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            // Misconfigured operator key.
            OperationError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Node rejection or unreachability; retryable upstream problem.
            OperationError::Broadcast(_) | OperationError::Chain(_) => StatusCode::BAD_GATEWAY,
            OperationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, message = %self.message, "Request failed");
        } else {
            tracing::debug!(code = self.code, message = %self.message, "Request rejected");
        }
        (
            self.status,
            Json(ErrorBody {
                error: self.code,
                message: &self.message,
            }),
        )
            .into_response()
    }
}
