//! Pure Rust imaging backend — no system libraries.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` with format sniffing |
//! | Probe dimensions | `ImageReader::into_dimensions` (header only) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, Dimensions, PhotoEncoder};
use super::params::{OutputFormat, Quality};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageReader, RgbImage};
use std::io::Cursor;

/// Decode a capture buffer, sniffing the format from its magic bytes.
pub fn decode_capture(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| BackendError::DecodeFailed(e.to_string()))
}

/// Read dimensions from the image header without decoding pixels.
///
/// Returns `None` for anything that is not a recognizable image.
pub fn probe_dimensions(bytes: &[u8]) -> Option<Dimensions> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
        .map(Dimensions::from)
}

/// Pure Rust encoder using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustEncoder {
    /// rav1e speed preset, 1 (slowest) to 10 (fastest).
    avif_speed: u8,
}

impl RustEncoder {
    pub fn new(avif_speed: u8) -> Self {
        Self {
            avif_speed: avif_speed.clamp(1, 10),
        }
    }
}

impl Default for RustEncoder {
    fn default() -> Self {
        Self::new(8)
    }
}

impl PhotoEncoder for RustEncoder {
    fn encode(
        &self,
        raster: &RgbImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let mut out = Vec::new();
        let q = quality.value() as u8;
        let (w, h) = raster.dimensions();

        let result = match format {
            OutputFormat::Avif => AvifEncoder::new_with_speed_quality(&mut out, self.avif_speed, q)
                .write_image(raster.as_raw(), w, h, ExtendedColorType::Rgb8),
            OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut out, q)
                .write_image(raster.as_raw(), w, h, ExtendedColorType::Rgb8),
        };

        result.map_err(|e| BackendError::EncodeFailed(format!("{format:?} encode failed: {e}")))?;
        Ok(out)
    }
}
