//! Error responses.
//!
//! Declared faults pass through with their status and detail. Everything
//! else becomes an opaque 500; the cause is logged, never sent.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

const INTERNAL_DETAIL: &str = "Internal Server Error";
const INTERNAL_MESSAGE: &str = "An unexpected error occurred. Please contact support.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A fault the handler raised on purpose, e.g. 404 or 422.
    #[error("{detail} (Status: {status})")]
    Http { status: StatusCode, detail: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn http(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::Http {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Http { status, detail } => {
                tracing::warn!(
                    status = status.as_u16(),
                    "HTTP Exception: {} (Status: {})",
                    detail,
                    status.as_u16()
                );
                (status, Json(json!({ "detail": detail }))).into_response()
            }
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "Global Exception Handler Caught: {}", e);
                internal_error_response()
            }
        }
    }
}

pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "detail": INTERNAL_DETAIL,
            "message": INTERNAL_MESSAGE,
        })),
    )
        .into_response()
}

/// Response for a handler that panicked (see `CatchPanicLayer::custom`).
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = message, "Global Exception Handler Caught: handler panicked");
    internal_error_response()
}

/// Fallback for unmatched routes.
pub async fn not_found() -> AppError {
    AppError::http(StatusCode::NOT_FOUND, "Not Found")
}
