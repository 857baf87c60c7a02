//! Parameter types for compositing and encoding.
//!
//! These structs describe *what* to produce, not *how*. They are the
//! interface between the pipeline (which decides what a capture becomes) and
//! the imaging code that does the pixel work.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100). Clamped on construction.
//! - [`OutputFormat`] — Encoded container for a processed photo.
//! - [`CompositeSettings`] — Output bound and watermark appearance.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Quality as a 0.0–1.0 fraction.
    pub fn as_fraction(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Output container for a processed photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Avif,
    Jpeg,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Avif => "image/avif",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Everything the compositor needs besides the pixels and the text.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSettings {
    /// Longest allowed side of the output raster.
    pub max_dimension: u32,
    /// Opacity of the watermark and branding boxes (0.0–1.0).
    pub box_opacity: f32,
    /// Smallest watermark font size in pixels.
    pub min_font_px: u32,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            max_dimension: 1280,
            box_opacity: 0.55,
            min_font_px: 16,
        }
    }
}
