use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, header};
use image::GenericImageView;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use pdf_ocr_core::{DecodedImage, OcrEngine, Pipeline, PipelineError};
use pdf_ocr_mupdf::MupdfLibrary;
use pdf_ocr_web::AppState;

pub const BOUNDARY: &str = "pdf-ocr-test-boundary";

/// Reports each image as `<wN>` where N is its width.
pub struct WidthOcr;

impl OcrEngine for WidthOcr {
    fn name(&self) -> &'static str {
        "width"
    }

    fn recognize(&self, image: &DecodedImage) -> Result<String, PipelineError> {
        Ok(format!("<w{}>", image.dimensions().0))
    }
}

pub fn router(max_upload_bytes: usize) -> axum::Router {
    let state = Arc::new(AppState {
        pipeline: Pipeline::new(Arc::new(MupdfLibrary::new()), Arc::new(WidthOcr)),
    });
    pdf_ocr_web::router(state, max_upload_bytes)
}

/// A PDF with one page per entry: optional text, then gray images of the
/// given widths (height 1).
pub fn pdf(pages: &[(Option<&str>, Vec<u32>)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::new();
    for (text, widths) in pages {
        let mut operations = Vec::new();
        if let Some(text) = text {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]);
        }

        let mut xobjects = lopdf::Dictionary::new();
        for (i, width) in widths.iter().enumerate() {
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => *width as i64,
                    "Height" => 1,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                vec![255u8; *width as usize],
            ));
            let name = format!("Im{}", i + 1);
            xobjects.set(name.clone(), image_id);
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        100.into(),
                        0.into(),
                        0.into(),
                        10.into(),
                        72.into(),
                        (20 * i as i64).into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                Operation::new("Q", vec![]),
            ]);
        }

        let content = Content { operations }.encode().unwrap();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// A multipart body with one part per `(name, data)` pair, in order.
pub fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, data) in parts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"; filename=\"upload.pdf\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(parts: &[(&str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process-pdf/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// A request whose only part is named `field`.
pub fn upload_request(field: &str, data: &[u8]) -> Request<Body> {
    multipart_request(&[(field, data)])
}
