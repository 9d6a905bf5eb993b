use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use pdf_ocr_core::PipelineError;

use crate::models::ErrorResponse;

#[derive(Error, Debug)]
pub enum AppError {
    /// The request did not carry a usable file upload.
    #[error("failed to read upload: {0}")]
    UploadRead(String),
    #[error("upload too large: {0}")]
    UploadTooLarge(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UploadRead(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Pipeline(_) | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "rejected request");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
