//! Burn the watermark into a capture.
//!
//! Steps, in order:
//!
//! 1. Decode the capture bytes.
//! 2. Downscale so neither side exceeds [`CompositeSettings::max_dimension`].
//! 3. Apply the EXIF orientation, producing an upright raster (codes 5–8
//!    swap width and height).
//! 4. Blend the watermark box bottom-left and draw each line top to bottom.
//! 5. Blend the branding box top-right and draw the branding mark.
//!
//! Text is drawn after orientation, so it is always upright. The same inputs
//! always produce the same raster.

use super::backend::BackendError;
use super::calculations::{Rect, fit_within, oriented_dimensions, watermark_layout};
use super::glyphs::{draw_text, fill_rect_blend};
use super::orientation::Orientation;
use super::params::CompositeSettings;
use super::rust_backend::decode_capture;
use crate::watermark::WatermarkSpec;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use thiserror::Error;

const BOX_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error(transparent)]
    Decode(#[from] BackendError),
    #[error("Invalid raster dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Decode, orient, downscale, and watermark a capture.
pub fn compose(
    bytes: &[u8],
    orientation: Orientation,
    watermark: &WatermarkSpec,
    settings: &CompositeSettings,
) -> Result<RgbImage, CompositeError> {
    let decoded = decode_capture(bytes)?;
    let source = (decoded.width(), decoded.height());
    let (target_w, target_h) = fit_within(source, settings.max_dimension).ok_or(
        CompositeError::InvalidDimensions {
            width: source.0,
            height: source.1,
        },
    )?;

    let resized = if (target_w, target_h) == source {
        decoded
    } else {
        decoded.resize_exact(target_w, target_h, FilterType::Triangle)
    };

    let mut canvas = orientation.apply(resized).into_rgb8();
    debug_assert_eq!(
        canvas.dimensions(),
        oriented_dimensions((target_w, target_h), orientation.swaps_dimensions())
    );

    stamp(&mut canvas, watermark, settings);
    Ok(canvas)
}

/// Draw the watermark and branding boxes onto an upright raster.
pub fn stamp(canvas: &mut RgbImage, watermark: &WatermarkSpec, settings: &CompositeSettings) {
    let line_chars: Vec<usize> = watermark.lines.iter().map(|l| l.chars().count()).collect();
    let layout = watermark_layout(
        canvas.dimensions(),
        &line_chars,
        watermark.branding.chars().count(),
        settings.min_font_px,
    );

    if !watermark.lines.is_empty() {
        fill_rect_blend(canvas, layout.text_box, BOX_COLOR, settings.box_opacity);
        let clip = layout.text_box;
        for (line, origin) in watermark.lines.iter().zip(&layout.line_origins) {
            draw_clipped(canvas, clip, *origin, line, layout.scale);
        }
    }

    if !watermark.branding.is_empty() {
        fill_rect_blend(canvas, layout.brand_box, BOX_COLOR, settings.box_opacity);
        draw_text(
            canvas,
            layout.brand_origin,
            &watermark.branding,
            layout.brand_scale,
            TEXT_COLOR,
        );
    }
}

/// Draw a line, truncated to the characters that fit inside the box.
fn draw_clipped(canvas: &mut RgbImage, clip: Rect, origin: (u32, u32), text: &str, scale: u32) {
    let glyph_w = super::glyphs::GLYPH_SIZE * scale;
    let right = clip.x + clip.width;
    let fits = (right.saturating_sub(origin.0) / glyph_w.max(1)) as usize;
    let visible: String = text.chars().take(fits).collect();
    draw_text(canvas, origin, &visible, scale, TEXT_COLOR);
}
