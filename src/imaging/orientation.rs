//! EXIF orientation codes as a closed enum.
//!
//! The eight EXIF values describe how the stored pixels must be transformed
//! to display upright:
//!
//! | Code | Variant | Transform applied to the stored pixels |
//! |---|---|---|
//! | 1 | `Normal` | none |
//! | 2 | `FlipHorizontal` | mirror left↔right |
//! | 3 | `Rotate180` | rotate 180° |
//! | 4 | `FlipVertical` | mirror top↔bottom |
//! | 5 | `Transpose` | rotate 90° clockwise, then mirror left↔right |
//! | 6 | `Rotate90` | rotate 90° clockwise |
//! | 7 | `Transverse` | rotate 270° clockwise, then mirror left↔right |
//! | 8 | `Rotate270` | rotate 270° clockwise |
//!
//! Codes 5–8 swap width and height.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Orientation {
    #[default]
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90,
    Transverse,
    Rotate270,
}

impl Orientation {
    pub const ALL: [Orientation; 8] = [
        Orientation::Normal,
        Orientation::FlipHorizontal,
        Orientation::Rotate180,
        Orientation::FlipVertical,
        Orientation::Transpose,
        Orientation::Rotate90,
        Orientation::Transverse,
        Orientation::Rotate270,
    ];

    /// Map an EXIF tag value to an orientation. Out-of-range values yield `None`.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Normal),
            2 => Some(Self::FlipHorizontal),
            3 => Some(Self::Rotate180),
            4 => Some(Self::FlipVertical),
            5 => Some(Self::Transpose),
            6 => Some(Self::Rotate90),
            7 => Some(Self::Transverse),
            8 => Some(Self::Rotate270),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Normal => 1,
            Self::FlipHorizontal => 2,
            Self::Rotate180 => 3,
            Self::FlipVertical => 4,
            Self::Transpose => 5,
            Self::Rotate90 => 6,
            Self::Transverse => 7,
            Self::Rotate270 => 8,
        }
    }

    /// Whether the upright image has width and height swapped relative to storage.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90 | Self::Transverse | Self::Rotate270
        )
    }

    /// The orientation that undoes this one.
    ///
    /// Flips and the two diagonal mirrors are their own inverse; the quarter
    /// turns invert each other.
    pub fn inverse(self) -> Self {
        match self {
            Self::Rotate90 => Self::Rotate270,
            Self::Rotate270 => Self::Rotate90,
            other => other,
        }
    }

    /// Transform stored pixels into the upright image.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::Normal => image,
            Self::FlipHorizontal => image.fliph(),
            Self::Rotate180 => image.rotate180(),
            Self::FlipVertical => image.flipv(),
            Self::Transpose => image.rotate90().fliph(),
            Self::Rotate90 => image.rotate90(),
            Self::Transverse => image.rotate270().fliph(),
            Self::Rotate270 => image.rotate270(),
        }
    }
}

impl From<Orientation> for u16 {
    fn from(orientation: Orientation) -> Self {
        orientation.code()
    }
}

impl TryFrom<u16> for Orientation {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("EXIF orientation must be 1-8, got {code}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    /// 3x2 pattern where every pixel is distinct.
    fn test_pattern() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(3, 2, |x, y| {
            Rgb([(x * 80) as u8, (y * 120) as u8, (x + y * 3) as u8])
        }))
    }

    #[test]
    fn codes_round_trip_through_enum() {
        for code in 1..=8u16 {
            assert_eq!(Orientation::from_code(code).unwrap().code(), code);
        }
    }

    #[test]
    fn out_of_range_codes_rejected() {
        assert_eq!(Orientation::from_code(0), None);
        assert_eq!(Orientation::from_code(9), None);
        assert_eq!(Orientation::from_code(0xFFFF), None);
    }

    #[test]
    fn default_is_normal() {
        assert_eq!(Orientation::default().code(), 1);
    }

    #[test]
    fn codes_five_to_eight_swap_dimensions() {
        for orientation in Orientation::ALL {
            let rotated = orientation.apply(test_pattern());
            let expected = if orientation.swaps_dimensions() {
                (2, 3)
            } else {
                (3, 2)
            };
            assert_eq!(rotated.dimensions(), expected, "{orientation:?}");
            assert_eq!(orientation.swaps_dimensions(), orientation.code() >= 5);
        }
    }

    #[test]
    fn transform_then_inverse_is_identity() {
        let original = test_pattern().to_rgb8();
        for orientation in Orientation::ALL {
            let there = orientation.apply(test_pattern());
            let back = orientation.inverse().apply(there).to_rgb8();
            assert_eq!(back, original, "round trip failed for {orientation:?}");
        }
    }

    #[test]
    fn rotate90_moves_bottom_left_to_top_left() {
        let src = test_pattern().to_rgb8();
        let rotated = Orientation::Rotate90.apply(test_pattern()).to_rgb8();
        assert_eq!(rotated.get_pixel(0, 0), src.get_pixel(0, 1));
    }

    #[test]
    fn transpose_mirrors_across_main_diagonal() {
        let src = test_pattern().to_rgb8();
        let transposed = Orientation::Transpose.apply(test_pattern()).to_rgb8();
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(transposed.get_pixel(y, x), src.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn serde_uses_numeric_code() {
        let json = serde_json::to_string(&Orientation::Rotate90).unwrap();
        assert_eq!(json, "6");
        let parsed: Orientation = serde_json::from_str("8").unwrap();
        assert_eq!(parsed, Orientation::Rotate270);
        assert!(serde_json::from_str::<Orientation>("0").is_err());
    }
}
