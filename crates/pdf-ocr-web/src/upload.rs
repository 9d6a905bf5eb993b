use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;

use crate::error::AppError;

/// Name of the multipart field carrying the PDF.
pub const FILE_FIELD: &str = "file";

/// An uploaded PDF held fully in memory.
pub struct UploadedPdf {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Read the multipart form and return the full contents of the `file` field.
///
/// Other fields are drained and ignored. The bytes are not checked for a
/// PDF header here; the PDF library is the only judge of validity.
pub async fn read_pdf_upload(mut multipart: Multipart) -> Result<UploadedPdf, AppError> {
    let mut file: Option<UploadedPdf> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error("failed to read form field", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == FILE_FIELD {
            let filename = field.file_name().unwrap_or("upload.pdf").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| upload_error("failed to read file data", e))?
                .to_vec();
            file = Some(UploadedPdf { filename, data });
        } else {
            field
                .bytes()
                .await
                .map_err(|e| upload_error(&format!("failed to read field `{name}`"), e))?;
        }
    }

    let file = file.ok_or_else(|| AppError::UploadRead(format!("no `{FILE_FIELD}` field")))?;
    if file.data.is_empty() {
        return Err(AppError::UploadRead("uploaded file is empty".into()));
    }
    Ok(file)
}

fn upload_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::UploadTooLarge(err.body_text())
    } else {
        AppError::UploadRead(format!("{context}: {err}"))
    }
}
