//! Stream filters for image data.
//!
//! Flate and LZW (with their predictors) run through lopdf. The ASCII and
//! run-length filters are decoded here. A trailing `DCTDecode` is left in
//! place so the JPEG can be handed over whole.

use lopdf::{Dictionary, Object, Stream};

use pdf_ocr_core::PipelineError;

/// One `/Filter` entry with its `/DecodeParms`.
pub(crate) type Filter = (Vec<u8>, Option<Dictionary>);

/// A stream body with its transport filters undone.
#[derive(Debug, PartialEq)]
pub(crate) enum Unfiltered {
    Samples(Vec<u8>),
    Jpeg(Vec<u8>),
}

pub(crate) fn apply(content: &[u8], chain: &[Filter]) -> Result<Unfiltered, PipelineError> {
    let mut data = content.to_vec();
    for (position, (name, params)) in chain.iter().enumerate() {
        data = match name.as_slice() {
            b"FlateDecode" | b"Fl" => inflate(b"FlateDecode", params.as_ref(), data)?,
            b"LZWDecode" | b"LZW" => inflate(b"LZWDecode", params.as_ref(), data)?,
            b"ASCIIHexDecode" | b"AHx" => ascii_hex(&data)?,
            b"ASCII85Decode" | b"A85" => ascii85(&data)?,
            b"RunLengthDecode" | b"RL" => run_length(&data),
            b"DCTDecode" | b"DCT" if position + 1 == chain.len() => {
                return Ok(Unfiltered::Jpeg(data));
            }
            other => {
                return Err(PipelineError::ImageDecode(format!(
                    "unsupported image filter {}",
                    String::from_utf8_lossy(other)
                )));
            }
        };
    }
    Ok(Unfiltered::Samples(data))
}

/// lopdf refuses to decompress streams typed as images, so the filter runs
/// on an untyped stream holding only the filter and its parameters.
fn inflate(
    filter: &[u8],
    params: Option<&Dictionary>,
    data: Vec<u8>,
) -> Result<Vec<u8>, PipelineError> {
    let mut dict = Dictionary::new();
    dict.set("Filter", Object::Name(filter.to_vec()));
    if let Some(params) = params {
        dict.set("DecodeParms", Object::Dictionary(params.clone()));
    }
    Stream::new(dict, data)
        .decompressed_content()
        .map_err(|e| PipelineError::ImageDecode(format!("{}: {e}", String::from_utf8_lossy(filter))))
}

fn ascii_hex(data: &[u8]) -> Result<Vec<u8>, PipelineError> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high = None;
    for &byte in data {
        if byte == b'>' {
            break;
        }
        if byte.is_ascii_whitespace() {
            continue;
        }
        let nibble = char::from(byte).to_digit(16).ok_or_else(|| {
            PipelineError::ImageDecode(format!("invalid ASCIIHex digit {:?}", char::from(byte)))
        })? as u8;
        match high.take() {
            Some(h) => out.push(h << 4 | nibble),
            None => high = Some(nibble),
        }
    }
    // An odd final digit is followed by an implicit 0.
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

fn ascii85(data: &[u8]) -> Result<Vec<u8>, PipelineError> {
    let mut out = Vec::with_capacity(data.len() / 5 * 4);
    let mut group = [0u8; 5];
    let mut filled = 0;

    let body = data.trim_ascii_start();
    let body = body.strip_prefix(b"<~").unwrap_or(body);
    for &byte in body {
        match byte {
            b'~' => break,
            b'z' if filled == 0 => out.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[filled] = byte - b'!';
                filled += 1;
                if filled == 5 {
                    push_group(&mut out, &group, 4)?;
                    filled = 0;
                }
            }
            b if b.is_ascii_whitespace() => {}
            b => {
                return Err(PipelineError::ImageDecode(format!(
                    "invalid ASCII85 byte {b:#04x}"
                )));
            }
        }
    }

    match filled {
        0 => {}
        1 => {
            return Err(PipelineError::ImageDecode(
                "truncated ASCII85 group".into(),
            ));
        }
        _ => {
            group[filled..].fill(84);
            push_group(&mut out, &group, filled - 1)?;
        }
    }
    Ok(out)
}

fn push_group(out: &mut Vec<u8>, group: &[u8; 5], count: usize) -> Result<(), PipelineError> {
    let value = group.iter().fold(0u64, |acc, &digit| acc * 85 + u64::from(digit));
    let value = u32::try_from(value)
        .map_err(|_| PipelineError::ImageDecode("ASCII85 group out of range".into()))?;
    out.extend_from_slice(&value.to_be_bytes()[..count]);
    Ok(())
}

fn run_length(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut pos = 0;
    while let Some(&length) = data.get(pos) {
        pos += 1;
        match length {
            128 => break,
            0..=127 => {
                let end = (pos + usize::from(length) + 1).min(data.len());
                out.extend_from_slice(&data[pos..end]);
                pos = end;
            }
            _ => {
                if let Some(&byte) = data.get(pos) {
                    out.extend(std::iter::repeat_n(byte, 257 - usize::from(length)));
                }
                pos += 1;
            }
        }
    }
    out
}
