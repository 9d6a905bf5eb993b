//! In-memory PDF fixtures built with lopdf.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<Object>,
    shared_xobjects: Option<Dictionary>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        Self {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
            shared_xobjects: None,
        }
    }

    /// An unfiltered 8-bit gray image of the given size.
    pub fn gray_image(&mut self, width: u32, height: u32) -> ObjectId {
        let samples = vec![255u8; (width * height) as usize];
        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            samples,
        ))
    }

    /// A Form XObject that paints the given images.
    pub fn form(&mut self, images: &[ObjectId]) -> ObjectId {
        let xobjects = xobject_dict(images);
        let content = paint_ops(images.len());
        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                "Resources" => dictionary! { "XObject" => xobjects },
            },
            encode(content),
        ))
    }

    /// Resources on the page-tree root, inherited by pages that have none.
    pub fn shared_xobjects(&mut self, xobjects: &[ObjectId]) -> &mut Self {
        self.shared_xobjects = Some(xobject_dict(xobjects));
        self
    }

    /// Add a page with optional text and the given XObjects (images or forms).
    pub fn page(&mut self, text: Option<&str>, xobjects: &[ObjectId]) -> &mut Self {
        self.page_with(text.map(|text| (text, 72, 720)), xobjects)
    }

    /// Add a page with text drawn at `(x, y)`, which may lie off the media box.
    pub fn page_text_at(&mut self, text: &str, x: i64, y: i64) -> &mut Self {
        self.page_with(Some((text, x, y)), &[])
    }

    fn page_with(&mut self, text: Option<(&str, i64, i64)>, xobjects: &[ObjectId]) -> &mut Self {
        let mut operations = Vec::new();
        if let Some((text, x, y)) = text {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![x.into(), y.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ]);
        }
        operations.extend(paint_ops(xobjects.len()));
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, encode(operations)));

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
        };
        if !xobjects.is_empty() || text.is_some() {
            page.set(
                "Resources",
                dictionary! {
                    "Font" => dictionary! { "F1" => self.font_id },
                    "XObject" => xobject_dict(xobjects),
                },
            );
        }
        let page_id = self.doc.add_object(page);
        self.kids.push(page_id.into());
        self
    }

    /// Like [`finish`](Self::finish), with `padding` bytes of comment inserted
    /// after the header so every cross-reference offset is stale.
    pub fn finish_with_stale_xref(self, padding: usize) -> Vec<u8> {
        let mut bytes = self.finish();
        let header_end = bytes.iter().position(|&b| b == b'\n').unwrap() + 1;
        let mut comment = vec![b'%'; padding];
        *comment.last_mut().unwrap() = b'\n';
        bytes.splice(header_end..header_end, comment);
        bytes
    }

    pub fn finish(mut self) -> Vec<u8> {
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Count" => self.kids.len() as i64,
            "Kids" => self.kids,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        if let Some(xobjects) = self.shared_xobjects {
            pages.set("Resources", dictionary! { "XObject" => xobjects });
        }
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        self.doc.save_to(&mut buf).unwrap();
        buf
    }
}

fn xobject_dict(ids: &[ObjectId]) -> Dictionary {
    let mut dict = Dictionary::new();
    for (i, id) in ids.iter().enumerate() {
        dict.set(format!("X{}", i + 1), *id);
    }
    dict
}

fn paint_ops(count: usize) -> Vec<Operation> {
    let mut ops = Vec::new();
    for i in 0..count {
        ops.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    100.into(),
                    0.into(),
                    0.into(),
                    100.into(),
                    72.into(),
                    (100 * i as i64).into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(format!("X{}", i + 1).into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
    }
    ops
}

fn encode(operations: Vec<Operation>) -> Vec<u8> {
    Content { operations }.encode().unwrap()
}
