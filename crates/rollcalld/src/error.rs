use crate::engine::EngineError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rollcall_core::MatchError;
use rollcall_export::ExportError;
use rollcall_store::StoreError;
use thiserror::Error;

pub const NO_FACE_FOUND: &str = "No face found. Please try again.";
pub const INVALID_IMAGE: &str = "Invalid image data.";

/// Handler failure, rendered as a plain-text response.
#[derive(Error, Debug)]
pub enum AppError {
    /// The request itself was unusable; the message is shown to the client.
    #[error("{0}")]
    BadRequest(String),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("engine: {0}")]
    Engine(#[from] EngineError),
    #[error("match: {0}")]
    Match(#[from] MatchError),
    #[error("export: {0}")]
    Export(#[from] ExportError),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            AppError::Export(ExportError::UnsupportedFormat(format)) => (
                StatusCode::BAD_REQUEST,
                format!("Unsupported export format: {format}"),
            )
                .into_response(),
            other => {
                tracing::error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
