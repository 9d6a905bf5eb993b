//! The text + OCR pipeline.
//!
//! 1. Extract native text from every page, in page order
//! 2. Collect and decode every embedded image, in (page, discovery) order
//! 3. OCR each image in order
//! 4. Join native text and OCR text with a single newline
//!
//! Every stage is synchronous and any error aborts the whole run; there is
//! no partial result.

use std::sync::Arc;

use crate::PipelineError;
use crate::backend::{OcrEngine, PdfLibrary};
use crate::raster::{DecodedImage, decode_image};

/// Concatenate the native text of every page, with no separator between pages.
pub fn extract_text(library: &dyn PdfLibrary, pdf: &[u8]) -> Result<String, PipelineError> {
    let document = library.open(pdf)?;
    let page_count = document.page_count();
    tracing::info!(pages = page_count, "opened PDF for text extraction");

    let mut text = String::new();
    for page in 0..page_count {
        text.push_str(&document.page_text(page)?);
        tracing::info!(page, "extracted text from page");
        tracing::info!(page, text = %text, "accumulated text");
    }
    Ok(text)
}

/// Collect every embedded image across all pages and decode it.
pub fn extract_images(
    library: &dyn PdfLibrary,
    pdf: &[u8],
) -> Result<Vec<DecodedImage>, PipelineError> {
    let document = library.open(pdf)?;

    let mut images = Vec::new();
    for page in 0..document.page_count() {
        let raw_images = document.page_images(page)?;
        tracing::debug!(page, count = raw_images.len(), "listed page images");
        for raw in &raw_images {
            images.push(decode_image(raw)?);
        }
    }
    Ok(images)
}

/// Run the engine over each image in order and concatenate the results.
pub fn ocr_images(engine: &dyn OcrEngine, images: &[DecodedImage]) -> Result<String, PipelineError> {
    let mut text = String::new();
    for (index, image) in images.iter().enumerate() {
        text.push_str(&engine.recognize(image)?);
        tracing::info!(engine = engine.name(), index, text = %text, "recognized image");
    }
    Ok(text)
}

/// `native + "\n" + ocr`; the separator is always present.
pub fn merge_text(native: &str, ocr: &str) -> String {
    let mut merged = String::with_capacity(native.len() + ocr.len() + 1);
    merged.push_str(native);
    merged.push('\n');
    merged.push_str(ocr);
    merged
}

/// The PDF and OCR capabilities bundled together.
///
/// Holds no per-request state, so a single instance can serve any number of
/// concurrent requests.
#[derive(Clone)]
pub struct Pipeline {
    library: Arc<dyn PdfLibrary>,
    engine: Arc<dyn OcrEngine>,
}

impl Pipeline {
    pub fn new(library: Arc<dyn PdfLibrary>, engine: Arc<dyn OcrEngine>) -> Self {
        Self { library, engine }
    }

    /// Run all four stages over one PDF buffer.
    pub fn process(&self, pdf: &[u8]) -> Result<String, PipelineError> {
        let text = extract_text(self.library.as_ref(), pdf)?;
        tracing::info!(text = %text, "extracted text from PDF");

        let images = extract_images(self.library.as_ref(), pdf)?;
        tracing::info!(count = images.len(), "extracted images");

        let images_text = ocr_images(self.engine.as_ref(), &images)?;
        tracing::info!(text = %images_text, "extracted text from images");

        let merged = merge_text(&text, &images_text);
        tracing::info!(text = %merged, "merged text from PDF and images");
        Ok(merged)
    }
}
