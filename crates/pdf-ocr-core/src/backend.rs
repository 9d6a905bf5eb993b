use crate::PipelineError;
use crate::raster::{DecodedImage, RawImage};

/// A PDF parser that can open documents from an in-memory buffer.
///
/// The pipeline never touches a concrete PDF library; backends such as
/// `pdf_ocr_mupdf::MupdfLibrary` implement this trait and tests use fakes.
pub trait PdfLibrary: Send + Sync {
    /// Parse `bytes` into a document. Fails with [`PipelineError::DocumentOpen`]
    /// if the bytes are not a well-formed PDF.
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PipelineError>;
}

/// An opened document. Pages are addressed by 0-based index in document order.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// Native text of one page, as laid out by the library.
    fn page_text(&self, index: usize) -> Result<String, PipelineError>;

    /// Every embedded raster image reachable from the page, in the library's
    /// discovery order.
    fn page_images(&self, index: usize) -> Result<Vec<RawImage>, PipelineError>;
}

/// Trait for OCR engines.
pub trait OcrEngine: Send + Sync {
    /// Short identifier used in log output.
    fn name(&self) -> &'static str;

    /// Recognize the text in a decoded image.
    fn recognize(&self, image: &DecodedImage) -> Result<String, PipelineError>;
}
