//! Embedded image discovery over the PDF object graph.
//!
//! A page's images are the `/Subtype /Image` entries of its (possibly
//! inherited) `/Resources /XObject` dictionary, in dictionary order, plus
//! the images of any Form XObjects listed there, depth first. Each image
//! object is listed once per page.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use pdf_ocr_core::{ColorSpace, PipelineError, RawImage};

use crate::filters::{self, Filter, Unfiltered};

/// Bound on `/Parent` hops, in case a malformed page tree loops.
const MAX_TREE_DEPTH: usize = 64;

pub(crate) fn page_images(
    doc: &Document,
    page_id: ObjectId,
    page: usize,
) -> Result<Vec<RawImage>, PipelineError> {
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| PipelineError::PageExtraction {
            page,
            message: e.to_string(),
        })?;
    let Some(resources) = inherited_resources(doc, page_dict) else {
        return Ok(Vec::new());
    };

    let mut walk = ImageWalk {
        doc,
        page,
        seen_images: HashSet::new(),
        seen_forms: HashSet::new(),
        images: Vec::new(),
    };
    walk.visit(resources)?;
    Ok(walk.images)
}

struct ImageWalk<'a> {
    doc: &'a Document,
    page: usize,
    seen_images: HashSet<ObjectId>,
    seen_forms: HashSet<ObjectId>,
    images: Vec<RawImage>,
}

impl<'a> ImageWalk<'a> {
    fn visit(&mut self, resources: &'a Dictionary) -> Result<(), PipelineError> {
        let doc = self.doc;
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| resolve_dict(doc, o))
        else {
            return Ok(());
        };

        for (name, entry) in xobjects.iter() {
            let (id, object) = doc
                .dereference(entry)
                .map_err(|e| PipelineError::PageExtraction {
                    page: self.page,
                    message: e.to_string(),
                })?;
            let Ok(stream) = object.as_stream() else {
                continue;
            };

            match name_of(stream.dict.get(b"Subtype")) {
                Some(b"Image") => {
                    if is_image_mask(&stream.dict) {
                        continue;
                    }
                    if let Some(id) = id {
                        if !self.seen_images.insert(id) {
                            continue;
                        }
                    }
                    tracing::trace!(
                        page = self.page,
                        name = %String::from_utf8_lossy(name),
                        "found image XObject"
                    );
                    self.images.push(raw_image(doc, stream)?);
                }
                Some(b"Form") => {
                    if let Some(id) = id {
                        if !self.seen_forms.insert(id) {
                            continue;
                        }
                    }
                    if let Some(form_resources) = stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|o| resolve_dict(doc, o))
                    {
                        self.visit(form_resources)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Walk up `/Parent` links until a `/Resources` entry is found.
fn inherited_resources<'a>(doc: &'a Document, page: &'a Dictionary) -> Option<&'a Dictionary> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Pull the stored bytes out of an image stream, undoing transport filters
/// but leaving JPEG data encoded.
fn raw_image(doc: &Document, stream: &Stream) -> Result<RawImage, PipelineError> {
    let data = match filters::apply(&stream.content, &filter_chain(doc, &stream.dict))? {
        Unfiltered::Jpeg(bytes) => return Ok(RawImage::Encoded(bytes)),
        Unfiltered::Samples(data) => data,
    };

    let width = dimension(doc, &stream.dict, b"Width")?;
    let height = dimension(doc, &stream.dict, b"Height")?;
    let bits_per_component = match int_entry(doc, &stream.dict, b"BitsPerComponent") {
        None => 8,
        Some(bpc) => u8::try_from(bpc).map_err(|_| {
            PipelineError::ImageDecode(format!("invalid BitsPerComponent {bpc}"))
        })?,
    };

    Ok(RawImage::Samples {
        width,
        height,
        color: color_space(doc, &stream.dict),
        bits_per_component,
        decode: decode_array(doc, &stream.dict),
        data,
    })
}

/// `/Filter` names paired with their `/DecodeParms` (a single dictionary, or
/// an array parallel to the filters).
fn filter_chain(doc: &Document, dict: &Dictionary) -> Vec<Filter> {
    let params: Vec<Option<Dictionary>> =
        match dict.get(b"DecodeParms").ok().and_then(|o| resolve(doc, o)) {
            Some(Object::Dictionary(params)) => vec![Some(params.clone())],
            Some(Object::Array(items)) => items
                .iter()
                .map(|o| resolve_dict(doc, o).cloned())
                .collect(),
            _ => Vec::new(),
        };

    filters(doc, dict)
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, params.get(i).cloned().flatten()))
        .collect()
}

fn filters(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| resolve(doc, o)?.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

fn color_space(doc: &Document, dict: &Dictionary) -> ColorSpace {
    match dict.get(b"ColorSpace") {
        Ok(object) => parse_color_space(doc, object),
        Err(_) => ColorSpace::Other("missing colour space".into()),
    }
}

fn parse_color_space(doc: &Document, object: &Object) -> ColorSpace {
    match resolve(doc, object) {
        Some(Object::Name(name)) => named_color_space(name),
        Some(Object::Array(items)) => {
            let family = items
                .first()
                .and_then(|o| resolve(doc, o))
                .and_then(|o| o.as_name().ok());
            match family {
                Some(b"ICCBased") => icc_color_space(doc, items.get(1)),
                Some(b"Indexed" | b"I") => indexed_color_space(doc, &items[1..]),
                Some(family) => named_color_space(family),
                None => ColorSpace::Other("malformed colour space array".into()),
            }
        }
        Some(_) => ColorSpace::Other("malformed colour space".into()),
        None => ColorSpace::Other("unresolvable colour space".into()),
    }
}

fn named_color_space(name: &[u8]) -> ColorSpace {
    match name {
        b"DeviceGray" | b"CalGray" | b"G" => ColorSpace::Gray,
        b"DeviceRGB" | b"CalRGB" | b"RGB" => ColorSpace::Rgb,
        b"DeviceCMYK" | b"CMYK" => ColorSpace::Cmyk,
        other => ColorSpace::Other(String::from_utf8_lossy(other).into_owned()),
    }
}

/// ICC profiles are classified by their component count `/N`, falling back
/// to the profile's `/Alternate` space.
fn icc_color_space(doc: &Document, profile: Option<&Object>) -> ColorSpace {
    let Some(profile) = profile
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_stream().ok())
    else {
        return ColorSpace::Other("ICCBased".into());
    };
    match int_entry(doc, &profile.dict, b"N") {
        Some(1) => ColorSpace::Gray,
        Some(3) => ColorSpace::Rgb,
        Some(4) => ColorSpace::Cmyk,
        _ => match profile.dict.get(b"Alternate") {
            Ok(alternate) => parse_color_space(doc, alternate),
            Err(_) => ColorSpace::Other("ICCBased".into()),
        },
    }
}

/// `[/Indexed base hival lookup]`, where the lookup table is a string or a
/// stream.
fn indexed_color_space(doc: &Document, operands: &[Object]) -> ColorSpace {
    let [base, hival, lookup, ..] = operands else {
        return ColorSpace::Other("malformed Indexed colour space".into());
    };
    let Some(hival) = resolve(doc, hival)
        .and_then(|o| o.as_i64().ok())
        .and_then(|v| u8::try_from(v).ok())
    else {
        return ColorSpace::Other("invalid Indexed hival".into());
    };
    let lookup = match resolve(doc, lookup) {
        Some(Object::String(bytes, _)) => bytes.clone(),
        Some(Object::Stream(stream)) => {
            match filters::apply(&stream.content, &filter_chain(doc, &stream.dict)) {
                Ok(Unfiltered::Samples(bytes)) => bytes,
                _ => return ColorSpace::Other("unreadable Indexed lookup table".into()),
            }
        }
        _ => return ColorSpace::Other("missing Indexed lookup table".into()),
    };

    ColorSpace::Indexed {
        base: Box::new(parse_color_space(doc, base)),
        hival,
        lookup,
    }
}

fn decode_array(doc: &Document, dict: &Dictionary) -> Option<Vec<f32>> {
    match dict.get(b"Decode").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Array(items)) => items
            .iter()
            .map(|o| resolve(doc, o)?.as_float().ok())
            .collect(),
        _ => None,
    }
}

fn dimension(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<u32, PipelineError> {
    let label = String::from_utf8_lossy(key);
    let value = int_entry(doc, dict, key)
        .ok_or_else(|| PipelineError::ImageDecode(format!("image has no {label}")))?;
    u32::try_from(value).map_err(|_| PipelineError::ImageDecode(format!("invalid {label} {value}")))
}

fn int_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    resolve(doc, dict.get(key).ok()?)?.as_i64().ok()
}

fn is_image_mask(dict: &Dictionary) -> bool {
    dict.get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false)
}

fn name_of(object: lopdf::Result<&Object>) -> Option<&[u8]> {
    object.ok()?.as_name().ok()
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    doc.dereference(object).ok().map(|(_, o)| o)
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, object)?.as_dict().ok()
}
