//! Object graph loading that tolerates broken cross-reference data.
//!
//! MuPDF silently repairs files whose xref offsets are stale or missing.
//! lopdf does not, so when its strict reader fails the object table is
//! rebuilt by scanning the buffer for `N G obj` headers, the same way
//! MuPDF's repair pass does.

use std::collections::BTreeMap;

use lopdf::xref::{Xref, XrefEntry, XrefType};
use lopdf::{Document, Error, Object, ObjectId, ObjectStream, Reader, Stream};

pub(crate) fn load(bytes: &[u8]) -> lopdf::Result<Document> {
    match Document::load_mem(bytes) {
        Ok(document) if document.catalog().is_ok() => Ok(document),
        Ok(_) => {
            tracing::warn!("catalog unreachable through cross-reference data, rebuilding object table");
            rebuild(bytes)
        }
        Err(err) => {
            tracing::warn!(error = %err, "cross-reference data unusable, rebuilding object table");
            rebuild(bytes)
        }
    }
}

fn rebuild(bytes: &[u8]) -> lopdf::Result<Document> {
    let mut xref = Xref::new(0, XrefType::CrossReferenceTable);
    for (offset, (number, generation)) in object_headers(bytes) {
        // Later definitions win, as with incremental updates.
        xref.insert(number, XrefEntry::Normal { offset, generation });
    }
    if xref.entries.is_empty() {
        return Err(Error::Trailer);
    }
    xref.size = xref.max_id() + 1;

    let mut document = Document::new();
    document.reference_table = xref;
    let reader = Reader {
        buffer: bytes,
        document,
    };

    let mut objects = BTreeMap::new();
    let mut offsets = BTreeMap::new();
    let mut packed = BTreeMap::new();
    for (&number, entry) in &reader.document.reference_table.entries {
        let XrefEntry::Normal { offset, generation } = *entry else {
            continue;
        };
        let id = (number, generation);
        let Ok(mut object) = reader.get_object(id) else {
            tracing::debug!(object = number, offset, "skipping unreadable object");
            continue;
        };
        if let Object::Stream(stream) = &mut object {
            if stream.content.is_empty() {
                fill_stream(bytes, stream);
            }
            if stream.dict.type_is(b"ObjStm") {
                if let Ok(container) = ObjectStream::new(stream) {
                    packed.extend(container.objects);
                }
            }
        }
        offsets.insert(id, offset);
        objects.insert(id, object);
    }
    for (id, object) in packed {
        objects.entry(id).or_insert(object);
    }

    let root = latest_catalog(&objects, &offsets).ok_or(Error::Trailer)?;

    let mut document = reader.document;
    document.max_id = document.reference_table.size - 1;
    document.objects = objects;
    document.trailer.set("Root", Object::Reference(root));
    tracing::debug!(objects = document.objects.len(), "rebuilt object table");
    Ok(document)
}

/// The catalog defined last in the file. Catalogs packed in object streams
/// rank below any top-level one.
fn latest_catalog(
    objects: &BTreeMap<ObjectId, Object>,
    offsets: &BTreeMap<ObjectId, u32>,
) -> Option<ObjectId> {
    objects
        .iter()
        .filter(|(_, object)| object.as_dict().is_ok_and(|dict| dict.type_is(b"Catalog")))
        .max_by_key(|(id, _)| offsets.get(*id).map_or(0, |offset| u64::from(*offset) + 1))
        .map(|(id, _)| *id)
}

/// Streams whose `/Length` could not be resolved are read up to `endstream`.
fn fill_stream(bytes: &[u8], stream: &mut Stream) {
    let Some(rest) = stream.start_position.and_then(|start| bytes.get(start..)) else {
        return;
    };
    let Some(end) = rest.windows(9).position(|window| window == b"endstream") else {
        return;
    };
    let body = &rest[..end];
    let body = body
        .strip_suffix(b"\r\n")
        .or_else(|| body.strip_suffix(b"\n"))
        .or_else(|| body.strip_suffix(b"\r"))
        .unwrap_or(body);
    stream.set_content(body.to_vec());
}

/// Whether the buffer defines any object at all.
pub(crate) fn has_objects(bytes: &[u8]) -> bool {
    line_starts(bytes).any(|start| object_header(&bytes[start..]).is_some())
}

/// Byte offset and id of every `N G obj` header that starts a line.
fn object_headers(bytes: &[u8]) -> Vec<(u32, (u32, u16))> {
    line_starts(bytes)
        .map_while(|start| Some((u32::try_from(start).ok()?, start)))
        .filter_map(|(offset, start)| Some((offset, object_header(&bytes[start..])?)))
        .collect()
}

fn line_starts(bytes: &[u8]) -> impl Iterator<Item = usize> + '_ {
    (0..bytes.len()).filter(|&start| start == 0 || matches!(bytes[start - 1], b'\n' | b'\r'))
}

fn object_header(input: &[u8]) -> Option<(u32, u16)> {
    let (number, rest) = leading_integer(input)?;
    let (generation, rest) = leading_integer(skip_space(rest)?)?;
    let rest = skip_space(rest)?.strip_prefix(b"obj")?;
    match rest.first() {
        None => Some((number, generation)),
        Some(byte) if byte.is_ascii_whitespace() || b"<[/%(".contains(byte) => {
            Some((number, generation))
        }
        Some(_) => None,
    }
}

fn leading_integer<T: std::str::FromStr>(input: &[u8]) -> Option<(T, &[u8])> {
    let digits = input.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let value = std::str::from_utf8(&input[..digits]).ok()?.parse().ok()?;
    Some((value, &input[digits..]))
}

/// At least one whitespace byte, then the rest.
fn skip_space(input: &[u8]) -> Option<&[u8]> {
    let spaces = input.iter().take_while(|b| b.is_ascii_whitespace()).count();
    (spaces > 0).then(|| &input[spaces..])
}
