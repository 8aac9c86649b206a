//! # EXIF Module
//!
//! Minimal EXIF writer/reader for tagging captures.
//!
//! Only IFD0 `ImageDescription` (0x010E) is written: the top label of the
//! frame, so a capture directory can be browsed and filtered by any photo
//! tool without the log file. Frames are never decoded; the APP1 segment is
//! spliced into the JPEG byte stream.

use crate::error::{CoreError, Result};

const SOI: [u8; 2] = [0xFF, 0xD8];
const MARKER_APP0: u8 = 0xE0;
const MARKER_APP1: u8 = 0xE1;
const MARKER_SOS: u8 = 0xDA;
const MARKER_EOI: u8 = 0xD9;
const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";
const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TYPE_ASCII: u16 = 2;

/// Segment length field covers itself plus the payload.
const MAX_SEGMENT_LEN: usize = u16::MAX as usize;

/// TIFF header (8) + entry count (2) + one entry (12) + next IFD offset (4).
const IFD0_DATA_OFFSET: usize = 26;

/// A header segment between SOI and SOS, borrowed from the source JPEG.
struct Segment<'a> {
    marker: u8,
    /// Marker plus length plus payload.
    raw: &'a [u8],
}

impl Segment<'_> {
    fn payload(&self) -> &[u8] {
        &self.raw[4..]
    }

    fn is_exif(&self) -> bool {
        self.marker == MARKER_APP1 && self.payload().starts_with(EXIF_HEADER)
    }
}

/// Split a JPEG into its header segments and the remainder (SOS onwards).
fn split_header(jpeg: &[u8]) -> Result<(Vec<Segment<'_>>, &[u8])> {
    if !jpeg.starts_with(&SOI) {
        return Err(CoreError::NotJpeg);
    }

    let mut segments = Vec::new();
    let mut pos = 2;

    loop {
        let Some(&[0xFF, marker]) = jpeg.get(pos..pos + 2) else {
            return Err(CoreError::NotJpeg);
        };

        if marker == MARKER_SOS || marker == MARKER_EOI {
            return Ok((segments, &jpeg[pos..]));
        }

        let Some(&[hi, lo]) = jpeg.get(pos + 2..pos + 4) else {
            return Err(CoreError::NotJpeg);
        };
        let len = usize::from(u16::from_be_bytes([hi, lo]));
        let end = pos + 2 + len;
        if len < 2 || end > jpeg.len() {
            return Err(CoreError::NotJpeg);
        }

        segments.push(Segment {
            marker,
            raw: &jpeg[pos..end],
        });
        pos = end;
    }
}

/// Build a complete APP1 Exif segment carrying `description`.
fn build_app1(description: &str) -> Result<Vec<u8>> {
    // NUL terminated ASCII; non-ASCII is replaced so readers stay happy.
    let mut text: Vec<u8> = description
        .chars()
        .map(|c| if c.is_ascii() && c != '\0' { c as u8 } else { b'?' })
        .collect();
    text.push(0);

    let tiff_len = IFD0_DATA_OFFSET + if text.len() > 4 { text.len() } else { 0 };
    let segment_len = 2 + EXIF_HEADER.len() + tiff_len;
    if segment_len > MAX_SEGMENT_LEN {
        return Err(CoreError::ExifTooLarge(segment_len));
    }

    let count = u32::try_from(text.len()).map_err(|_| CoreError::ExifTooLarge(segment_len))?;

    let mut out = Vec::with_capacity(segment_len + 2);
    out.extend_from_slice(&[0xFF, MARKER_APP1]);
    out.extend_from_slice(&(segment_len as u16).to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);

    // Big-endian TIFF header, IFD0 right after it.
    out.extend_from_slice(b"MM\0\x2A");
    out.extend_from_slice(&8u32.to_be_bytes());

    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&TAG_IMAGE_DESCRIPTION.to_be_bytes());
    out.extend_from_slice(&TYPE_ASCII.to_be_bytes());
    out.extend_from_slice(&count.to_be_bytes());
    if text.len() <= 4 {
        let mut inline = [0u8; 4];
        inline[..text.len()].copy_from_slice(&text);
        out.extend_from_slice(&inline);
    } else {
        out.extend_from_slice(&(IFD0_DATA_OFFSET as u32).to_be_bytes());
    }
    out.extend_from_slice(&0u32.to_be_bytes());

    if text.len() > 4 {
        out.extend_from_slice(&text);
    }

    Ok(out)
}

/// Return a copy of `jpeg` whose EXIF `ImageDescription` is `description`.
///
/// Any existing Exif APP1 segment is replaced. The new segment goes after
/// a leading JFIF APP0, otherwise directly after SOI.
pub fn embed_description(jpeg: &[u8], description: &str) -> Result<Vec<u8>> {
    let (segments, rest) = split_header(jpeg)?;
    let app1 = build_app1(description)?;

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&SOI);

    let mut inserted = false;
    for segment in segments.iter().filter(|s| !s.is_exif()) {
        if !inserted && segment.marker != MARKER_APP0 {
            out.extend_from_slice(&app1);
            inserted = true;
        }
        out.extend_from_slice(segment.raw);
    }
    if !inserted {
        out.extend_from_slice(&app1);
    }

    out.extend_from_slice(rest);
    Ok(out)
}

/// Read IFD0 `ImageDescription`, if the JPEG carries one.
#[must_use]
pub fn read_description(jpeg: &[u8]) -> Option<String> {
    let (segments, _) = split_header(jpeg).ok()?;
    let exif = segments.iter().find(|s| s.is_exif())?;
    let tiff = &exif.payload()[EXIF_HEADER.len()..];

    let big_endian = match tiff.get(..2)? {
        b"MM" => true,
        b"II" => false,
        _ => return None,
    };
    let u16_at = |at: usize| -> Option<u16> {
        let bytes: [u8; 2] = tiff.get(at..at + 2)?.try_into().ok()?;
        Some(if big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    };
    let u32_at = |at: usize| -> Option<usize> {
        let bytes: [u8; 4] = tiff.get(at..at + 4)?.try_into().ok()?;
        let value = if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        };
        usize::try_from(value).ok()
    };

    let ifd = u32_at(4)?;
    let entries = usize::from(u16_at(ifd)?);

    for index in 0..entries {
        let entry = ifd + 2 + index * 12;
        if u16_at(entry)? != TAG_IMAGE_DESCRIPTION || u16_at(entry + 2)? != TYPE_ASCII {
            continue;
        }
        let count = u32_at(entry + 4)?;
        let start = if count <= 4 { entry + 8 } else { u32_at(entry + 8)? };
        let raw = tiff.get(start..start.checked_add(count)?)?;
        let text = raw.split(|b| *b == 0).next().unwrap_or_default();
        return Some(String::from_utf8_lossy(text).into_owned());
    }

    None
}

// =============================================================================
// TESTS
// =============================================================================
