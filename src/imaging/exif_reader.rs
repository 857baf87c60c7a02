//! Minimal EXIF orientation reader for JPEG buffers.
//!
//! Extracts a single field: IFD0 tag `0x0112` (Orientation) from the APP1
//! `Exif\0\0` segment. Everything else in the EXIF block is ignored.
//!
//! Every read is bounds-checked. A missing SOI marker, a segment length that
//! runs past the buffer, a bad TIFF header, or an IFD offset beyond the end
//! all end the walk with [`Orientation::Normal`]. Nothing here returns an
//! error or panics.

use super::orientation::Orientation;
use std::sync::Arc;
use std::time::Duration;

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP1: u8 = 0xE1;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;
const EXIF_HEADER: &[u8] = b"Exif\0\0";
const ORIENTATION_TAG: u16 = 0x0112;
const TIFF_SHORT: u16 = 3;

/// Read the EXIF orientation of a JPEG buffer, defaulting to `Normal`.
pub fn read_orientation(data: &[u8]) -> Orientation {
    find_exif_segment(data)
        .and_then(orientation_from_tiff)
        .and_then(Orientation::from_code)
        .unwrap_or_default()
}

/// [`read_orientation`] on a blocking worker, bounded by `limit`.
///
/// Returns `None` when the deadline passes first; the worker's late result
/// is dropped. Callers substitute `Orientation::Normal`.
pub async fn read_orientation_within(data: Arc<[u8]>, limit: Duration) -> Option<Orientation> {
    let task = tokio::task::spawn_blocking(move || read_orientation(&data));
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(orientation)) => Some(orientation),
        Ok(Err(join_error)) => {
            tracing::warn!(%join_error, "orientation reader worker failed");
            None
        }
        Err(_) => None,
    }
}

// ---------------------------------------------------------------------------
// JPEG marker walk
// ---------------------------------------------------------------------------

/// Return the TIFF payload of the first APP1 segment carrying EXIF data.
fn find_exif_segment(data: &[u8]) -> Option<&[u8]> {
    if !data.starts_with(&SOI) {
        return None;
    }

    let mut pos = 2;
    loop {
        // Fill bytes (0xFF padding) are legal between markers.
        while data.get(pos) == Some(&0xFF) && data.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        if *data.get(pos)? != 0xFF {
            return None;
        }
        let marker = *data.get(pos + 1)?;

        if marker == SOS || marker == EOI {
            return None;
        }
        // Standalone markers carry no length field.
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }

        let len = read_u16_be(data, pos + 2)? as usize;
        if len < 2 {
            return None;
        }
        let seg_start = pos + 4;
        let seg_end = pos + 2 + len;
        let segment = data.get(seg_start..seg_end)?;

        if marker == APP1 && segment.starts_with(EXIF_HEADER) {
            return Some(&segment[EXIF_HEADER.len()..]);
        }
        pos = seg_end;
    }
}

fn read_u16_be(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

// ---------------------------------------------------------------------------
// TIFF header + IFD0
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    fn u16(self, data: &[u8], offset: usize) -> Option<u16> {
        let b = data.get(offset..offset + 2)?;
        Some(match self {
            Self::Big => u16::from_be_bytes([b[0], b[1]]),
            Self::Little => u16::from_le_bytes([b[0], b[1]]),
        })
    }

    fn u32(self, data: &[u8], offset: usize) -> Option<u32> {
        let b = data.get(offset..offset + 4)?;
        Some(match self {
            Self::Big => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            Self::Little => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        })
    }
}

/// Walk IFD0 of a TIFF block and return the raw Orientation value.
///
/// Layout:
///   Bytes 0-1: `II` (little-endian) or `MM` (big-endian)
///   Bytes 2-3: magic 42
///   Bytes 4-7: offset of IFD0 from the start of the TIFF block
///   IFD: u16 entry count, then 12-byte entries (tag, type, count, value)
fn orientation_from_tiff(tiff: &[u8]) -> Option<u16> {
    let order = match tiff.get(0..2)? {
        b"MM" => ByteOrder::Big,
        b"II" => ByteOrder::Little,
        _ => return None,
    };
    if order.u16(tiff, 2)? != 42 {
        return None;
    }

    let ifd_offset = order.u32(tiff, 4)? as usize;
    let entry_count = order.u16(tiff, ifd_offset)? as usize;
    let entries_start = ifd_offset.checked_add(2)?;

    for i in 0..entry_count {
        let entry = entries_start.checked_add(i.checked_mul(12)?)?;
        let tag = order.u16(tiff, entry)?;
        if tag != ORIENTATION_TAG {
            continue;
        }
        // SHORT values are left-justified in the 4-byte value field.
        if order.u16(tiff, entry + 2)? != TIFF_SHORT {
            return None;
        }
        return order.u16(tiff, entry + 8);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{exif_app1_segment, jpeg_bytes, with_exif_orientation};

    #[test]
    fn reads_orientation_from_big_endian_exif() {
        let jpeg = with_exif_orientation(&jpeg_bytes(8, 8), 6, true);
        assert_eq!(read_orientation(&jpeg), Orientation::Rotate90);
    }

    #[test]
    fn reads_orientation_from_little_endian_exif() {
        let jpeg = with_exif_orientation(&jpeg_bytes(8, 8), 3, false);
        assert_eq!(read_orientation(&jpeg), Orientation::Rotate180);
    }

    #[test]
    fn every_code_is_recognized() {
        let base = jpeg_bytes(4, 4);
        for code in 1..=8u16 {
            let jpeg = with_exif_orientation(&base, code, code % 2 == 0);
            assert_eq!(read_orientation(&jpeg).code(), code);
        }
    }

    #[test]
    fn jpeg_without_exif_is_normal() {
        assert_eq!(read_orientation(&jpeg_bytes(8, 8)), Orientation::Normal);
    }

    #[test]
    fn non_jpeg_buffers_are_normal() {
        assert_eq!(read_orientation(b""), Orientation::Normal);
        assert_eq!(read_orientation(b"\x89PNG\r\n\x1a\n"), Orientation::Normal);
        assert_eq!(read_orientation(&[0xFF]), Orientation::Normal);
        assert_eq!(read_orientation(b"not an image at all"), Orientation::Normal);
    }

    #[test]
    fn every_truncation_is_normal_and_never_panics() {
        let jpeg = with_exif_orientation(&jpeg_bytes(8, 8), 6, true);
        // The full EXIF segment sits right after SOI; cutting anywhere inside it must not panic.
        for len in 0..jpeg.len().min(80) {
            let orientation = read_orientation(&jpeg[..len]);
            assert!(
                orientation == Orientation::Normal || orientation == Orientation::Rotate90,
                "unexpected {orientation:?} at len {len}"
            );
        }
        assert_eq!(read_orientation(&jpeg[..20]), Orientation::Normal);
    }

    #[test]
    fn ifd_offset_past_end_is_normal() {
        let mut segment = exif_app1_segment(6, true);
        // IFD0 offset lives at: marker(2) + len(2) + "Exif\0\0"(6) + 4
        let offset_pos = 2 + 2 + 6 + 4;
        segment[offset_pos..offset_pos + 4].copy_from_slice(&0x7FFF_FFF0u32.to_be_bytes());
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&segment);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        assert_eq!(read_orientation(&jpeg), Orientation::Normal);
    }

    #[test]
    fn segment_length_past_end_is_normal() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE1, 0xFF, 0xFF, b'E', b'x', b'i', b'f', 0, 0];
        assert_eq!(read_orientation(&jpeg), Orientation::Normal);
    }

    #[test]
    fn bad_tiff_magic_is_normal() {
        let mut segment = exif_app1_segment(6, true);
        // Corrupt the 42 magic
        segment[2 + 2 + 6 + 3] = 0;
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&segment);
        assert_eq!(read_orientation(&jpeg), Orientation::Normal);
    }

    #[test]
    fn out_of_range_tag_value_is_normal() {
        let jpeg = with_exif_orientation(&jpeg_bytes(4, 4), 42, true);
        assert_eq!(read_orientation(&jpeg), Orientation::Normal);
    }

    #[tokio::test]
    async fn bounded_read_returns_orientation() {
        let jpeg = with_exif_orientation(&jpeg_bytes(8, 8), 8, false);
        let result = read_orientation_within(Arc::from(jpeg), Duration::from_secs(3)).await;
        assert_eq!(result, Some(Orientation::Rotate270));
    }
}
