//! Output format and quality selection.
//!
//! Quality comes from a ladder keyed on the *original* capture size:
//!
//! | Source size | Quality |
//! |---|---|
//! | > 4 MiB | 70 |
//! | > 2 MiB | 75 |
//! | > 1 MiB | 80 |
//! | otherwise | 85 |
//!
//! The primary format is tried first. If it fails, or its output is not
//! smaller than the source, the raster is re-encoded in the fallback format
//! at the same quality.

use super::backend::{BackendError, PhotoEncoder};
use super::params::{OutputFormat, Quality};
use image::RgbImage;

const MIB: u64 = 1024 * 1024;

/// Quality ladder, largest threshold first.
const QUALITY_LADDER: &[(u64, u32)] = &[(4 * MIB, 70), (2 * MIB, 75), (MIB, 80)];
const BASE_QUALITY: u32 = 85;

/// Pick encoding quality from the original capture size in bytes.
pub fn select_quality(source_size: u64) -> Quality {
    QUALITY_LADDER
        .iter()
        .find(|(threshold, _)| source_size > *threshold)
        .map(|&(_, q)| Quality::new(q))
        .unwrap_or(Quality::new(BASE_QUALITY))
}

/// An encoded photo and how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPhoto {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub quality: Quality,
    /// True when the fallback format was used.
    pub fell_back: bool,
}

impl EncodedPhoto {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Chooses format and quality for composited rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecSelector {
    pub primary: OutputFormat,
    pub fallback: OutputFormat,
}

impl Default for CodecSelector {
    fn default() -> Self {
        Self {
            primary: OutputFormat::Avif,
            fallback: OutputFormat::Jpeg,
        }
    }
}

impl CodecSelector {
    /// Encode `raster`, falling back when the primary format is not a net win.
    pub fn encode(
        &self,
        encoder: &dyn PhotoEncoder,
        raster: &RgbImage,
        source_size: u64,
    ) -> Result<EncodedPhoto, BackendError> {
        let quality = select_quality(source_size);

        match encoder.encode(raster, self.primary, quality) {
            Ok(bytes) if (bytes.len() as u64) < source_size || self.primary == self.fallback => {
                return Ok(EncodedPhoto {
                    bytes,
                    format: self.primary,
                    quality,
                    fell_back: false,
                });
            }
            Ok(bytes) => tracing::debug!(
                format = ?self.primary,
                encoded = bytes.len(),
                source = source_size,
                "primary format not smaller than source, re-encoding"
            ),
            Err(e) => tracing::debug!(format = ?self.primary, error = %e, "primary encode failed"),
        }

        let bytes = encoder.encode(raster, self.fallback, quality)?;
        Ok(EncodedPhoto {
            bytes,
            format: self.fallback,
            quality,
            fell_back: true,
        })
    }
}
