use image::{DynamicImage, GrayImage, RgbImage};

use crate::PipelineError;

/// A decoded pixel buffer, ready for OCR.
pub type DecodedImage = DynamicImage;

/// Colour space of an unfiltered image stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// A palette of `hival + 1` entries, each `base.components()` bytes long.
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
    /// Anything we cannot materialise (Separation, Lab, ...).
    Other(String),
}

impl ColorSpace {
    pub fn components(&self) -> Option<usize> {
        match self {
            ColorSpace::Gray => Some(1),
            ColorSpace::Rgb => Some(3),
            ColorSpace::Cmyk => Some(4),
            ColorSpace::Indexed { .. } => Some(1),
            ColorSpace::Other(_) => None,
        }
    }
}

/// One embedded image resource as the PDF stores it.
#[derive(Debug, Clone)]
pub enum RawImage {
    /// A self-describing container (JPEG, PNG, ...), e.g. a `DCTDecode` stream.
    Encoded(Vec<u8>),
    /// Bare pixel samples plus the geometry from the image dictionary.
    Samples {
        width: u32,
        height: u32,
        color: ColorSpace,
        bits_per_component: u8,
        /// The `/Decode` array, when the image has one.
        decode: Option<Vec<f32>>,
        data: Vec<u8>,
    },
}

/// Decode a raw image resource into a pixel buffer.
pub fn decode_image(raw: &RawImage) -> Result<DecodedImage, PipelineError> {
    match raw {
        RawImage::Encoded(bytes) => {
            image::load_from_memory(bytes).map_err(|e| PipelineError::ImageDecode(e.to_string()))
        }
        RawImage::Samples {
            width,
            height,
            color,
            bits_per_component,
            decode,
            data,
        } => decode_samples(
            *width,
            *height,
            color,
            *bits_per_component,
            decode.as_deref(),
            data,
        ),
    }
}

/// A palette resolved against its base space.
struct Palette<'a> {
    hival: u8,
    entry_len: usize,
    lookup: &'a [u8],
}

fn decode_samples(
    width: u32,
    height: u32,
    color: &ColorSpace,
    bpc: u8,
    decode: Option<&[f32]>,
    data: &[u8],
) -> Result<DecodedImage, PipelineError> {
    if width == 0 || height == 0 {
        return Err(PipelineError::ImageDecode(format!(
            "invalid image dimensions {width}x{height}"
        )));
    }
    let components = color.components().ok_or_else(|| {
        PipelineError::ImageDecode(format!("unsupported colour space {color:?}"))
    })?;
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(PipelineError::ImageDecode(format!(
            "unsupported sample depth: {bpc} bits per component"
        )));
    }

    let too_large = || PipelineError::ImageDecode(format!("image too large: {width}x{height}"));
    let (w, h) = (width as usize, height as usize);
    let row_samples = w.checked_mul(components).ok_or_else(too_large)?;
    let row_bytes = row_samples
        .checked_mul(usize::from(bpc))
        .ok_or_else(too_large)?
        .div_ceil(8);
    let expected = row_bytes.checked_mul(h).ok_or_else(too_large)?;
    if data.len() < expected {
        return Err(PipelineError::ImageDecode(format!(
            "sample buffer too short: expected {expected} bytes, got {}",
            data.len()
        )));
    }

    let (space, palette) = resolve_palette(color)?;
    let max = ((1u32 << bpc) - 1) as f32;
    let ranges = decode_ranges(color, components, max, decode);

    let out_len = palette.as_ref().map_or(components, |p| p.entry_len);
    let mut out = Vec::with_capacity(w * h * out_len);
    for row in data[..expected].chunks_exact(row_bytes) {
        for index in 0..row_samples {
            let (dmin, dmax) = ranges[index % components];
            let value = dmin + read_sample(row, index, bpc) as f32 * (dmax - dmin) / max;
            match &palette {
                Some(p) => {
                    let entry = value.round().clamp(0.0, f32::from(p.hival)) as usize;
                    let offset = entry * p.entry_len;
                    out.extend_from_slice(&p.lookup[offset..offset + p.entry_len]);
                }
                None => out.push((value.clamp(0.0, 1.0) * 255.0).round() as u8),
            }
        }
    }

    let image = match space {
        ColorSpace::Gray => GrayImage::from_raw(width, height, out).map(DynamicImage::ImageLuma8),
        ColorSpace::Rgb => RgbImage::from_raw(width, height, out).map(DynamicImage::ImageRgb8),
        ColorSpace::Cmyk => {
            RgbImage::from_raw(width, height, cmyk_to_rgb(&out)).map(DynamicImage::ImageRgb8)
        }
        _ => None,
    };

    image.ok_or_else(|| PipelineError::ImageDecode("sample buffer does not match dimensions".into()))
}

/// The space the output samples live in, plus the palette for `Indexed`.
fn resolve_palette(color: &ColorSpace) -> Result<(&ColorSpace, Option<Palette<'_>>), PipelineError> {
    let ColorSpace::Indexed {
        base,
        hival,
        lookup,
    } = color
    else {
        return Ok((color, None));
    };

    let entry_len = match base.as_ref() {
        ColorSpace::Gray | ColorSpace::Rgb | ColorSpace::Cmyk => base.components().unwrap_or(1),
        other => {
            return Err(PipelineError::ImageDecode(format!(
                "unsupported palette base {other:?}"
            )));
        }
    };
    let needed = (usize::from(*hival) + 1) * entry_len;
    if lookup.len() < needed {
        return Err(PipelineError::ImageDecode(format!(
            "palette too short: expected {needed} bytes, got {}",
            lookup.len()
        )));
    }

    Ok((
        base.as_ref(),
        Some(Palette {
            hival: *hival,
            entry_len,
            lookup,
        }),
    ))
}

/// Per-component `(min, max)` mapping of raw sample values. Colour samples
/// map to `0.0..=1.0`, palette samples to an index.
fn decode_ranges(
    color: &ColorSpace,
    components: usize,
    max: f32,
    decode: Option<&[f32]>,
) -> Vec<(f32, f32)> {
    match decode {
        Some(pairs) if pairs.len() >= 2 * components => pairs
            .chunks_exact(2)
            .take(components)
            .map(|pair| (pair[0], pair[1]))
            .collect(),
        _ => {
            let default = match color {
                ColorSpace::Indexed { .. } => (0.0, max),
                _ => (0.0, 1.0),
            };
            vec![default; components]
        }
    }
}

/// The `index`th sample of a row packed at `bpc` bits, most significant first.
fn read_sample(row: &[u8], index: usize, bpc: u8) -> u32 {
    match bpc {
        8 => u32::from(row[index]),
        16 => u32::from(u16::from_be_bytes([row[2 * index], row[2 * index + 1]])),
        _ => {
            let bit = index * usize::from(bpc);
            let shift = 8 - usize::from(bpc) - bit % 8;
            u32::from((row[bit / 8] >> shift) & ((1u8 << bpc) - 1))
        }
    }
}

fn cmyk_to_rgb(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 4 * 3);
    for px in data.chunks_exact(4) {
        let k = 255 - u16::from(px[3]);
        for &c in &px[..3] {
            out.push(((255 - u16::from(c)) * k / 255) as u8);
        }
    }
    out
}
