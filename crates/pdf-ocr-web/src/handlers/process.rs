use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};

use crate::error::AppError;
use crate::models::ProcessResponse;
use crate::state::AppState;
use crate::upload;

/// `POST /process-pdf/`: native text and OCR text of the uploaded PDF.
#[tracing::instrument(skip_all)]
pub async fn process_pdf(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessResponse>, AppError> {
    let multipart = multipart.map_err(|e| AppError::UploadRead(e.body_text()))?;
    let upload = upload::read_pdf_upload(multipart).await?;
    tracing::info!(filename = %upload.filename, bytes = upload.data.len(), "received upload");

    // MuPDF and tesseract are blocking; keep them off the async workers.
    let pipeline = state.pipeline.clone();
    let text = tokio::task::spawn_blocking(move || pipeline.process(&upload.data)).await??;

    Ok(Json(ProcessResponse { text }))
}
