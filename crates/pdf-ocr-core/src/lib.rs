use thiserror::Error;

pub mod backend;
pub mod raster;
pub mod pipeline;

pub use backend::{OcrEngine, PdfDocument, PdfLibrary};
pub use raster::{ColorSpace, DecodedImage, RawImage, decode_image};
pub use pipeline::{Pipeline, extract_images, extract_text, merge_text, ocr_images};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to open PDF: {0}")]
    DocumentOpen(String),
    #[error("failed to read page {page}: {message}")]
    PageExtraction { page: usize, message: String },
    #[error("failed to decode image: {0}")]
    ImageDecode(String),
    #[error("OCR engine failed: {0}")]
    OcrEngine(String),
}
