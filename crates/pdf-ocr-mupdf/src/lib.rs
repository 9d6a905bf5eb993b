use std::cell::OnceCell;

use mupdf::{Document, TextPageFlags};

use pdf_ocr_core::{PdfDocument, PdfLibrary, PipelineError, RawImage};

mod filters;
mod repair;
mod resources;

/// MuPDF-based implementation of [`PdfLibrary`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (which is AGPL-3.0) so that the pipeline and the web server do not
/// transitively depend on it.
///
/// Page text comes from MuPDF's structured text. MuPDF's safe bindings do not
/// expose page resource dictionaries, so embedded images are listed by
/// walking the object graph with lopdf over the same buffer. That graph is
/// only loaded once images are requested, and files with a damaged
/// cross-reference table are rebuilt by scanning for object headers.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfLibrary;

impl MupdfLibrary {
    pub fn new() -> Self {
        Self
    }
}

impl PdfLibrary for MupdfLibrary {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PipelineError> {
        let document = Document::from_bytes(bytes, "application/pdf")
            .map_err(|e| PipelineError::DocumentOpen(e.to_string()))?;
        let page_count = document
            .page_count()
            .map_err(|e| PipelineError::DocumentOpen(e.to_string()))?;
        // MuPDF's repair accepts any header followed by garbage as an empty
        // document.
        if page_count == 0 && !repair::has_objects(bytes) {
            return Err(PipelineError::DocumentOpen("no objects found".into()));
        }

        Ok(Box::new(MupdfDocument {
            document,
            bytes: bytes.to_vec(),
            objects: OnceCell::new(),
            page_count: usize::try_from(page_count).unwrap_or(0),
        }))
    }
}

/// A document opened by [`MupdfLibrary`].
pub struct MupdfDocument {
    document: Document,
    bytes: Vec<u8>,
    objects: OnceCell<lopdf::Document>,
    page_count: usize,
}

/// Plain-text extraction flags MuPDF's own text output uses.
const TEXT_FLAGS: TextPageFlags = TextPageFlags::PRESERVE_LIGATURES
    .union(TextPageFlags::PRESERVE_WHITESPACE)
    .union(TextPageFlags::MEDIABOX_CLIP);

impl MupdfDocument {
    fn objects(&self, index: usize) -> Result<&lopdf::Document, PipelineError> {
        if let Some(objects) = self.objects.get() {
            return Ok(objects);
        }
        let objects = repair::load(&self.bytes).map_err(|e| PipelineError::PageExtraction {
            page: index,
            message: format!("object graph unreadable: {e}"),
        })?;
        Ok(self.objects.get_or_init(|| objects))
    }
}

impl PdfDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, index: usize) -> Result<String, PipelineError> {
        let err = |e: mupdf::Error| PipelineError::PageExtraction {
            page: index,
            message: e.to_string(),
        };

        let page = self.document.load_page(index as i32).map_err(err)?;
        let text_page = page.to_text_page(TEXT_FLAGS).map_err(err)?;

        // Block/line iteration reproduces MuPDF's plain-text output: one
        // newline after every line.
        let mut page_text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                page_text.push_str(&line_text);
                page_text.push('\n');
            }
        }
        Ok(page_text)
    }

    fn page_images(&self, index: usize) -> Result<Vec<RawImage>, PipelineError> {
        let page_number = u32::try_from(index + 1).map_err(|_| PipelineError::PageExtraction {
            page: index,
            message: "page index out of range".into(),
        })?;
        let objects = self.objects(index)?;
        let page_id = *objects
            .get_pages()
            .get(&page_number)
            .ok_or_else(|| PipelineError::PageExtraction {
                page: index,
                message: "page missing from the page tree".into(),
            })?;

        resources::page_images(objects, page_id, index)
    }
}
