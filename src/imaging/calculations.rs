//! Pure calculation functions for capture dimensions and watermark geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::glyphs::GLYPH_SIZE;

/// Downscale `source` so neither side exceeds `bound`, preserving aspect ratio.
///
/// Sources already within the bound are returned unchanged. Returns `None`
/// when the source or the result has a zero side.
///
/// # Examples
/// ```
/// # use fieldproof::imaging::calculations::fit_within;
/// assert_eq!(fit_within((1920, 1080), 1280), Some((1280, 720)));
/// assert_eq!(fit_within((1080, 1920), 1280), Some((720, 1280)));
/// assert_eq!(fit_within((800, 600), 1280), Some((800, 600)));
/// ```
pub fn fit_within(source: (u32, u32), bound: u32) -> Option<(u32, u32)> {
    let (w, h) = source;
    if w == 0 || h == 0 || bound == 0 {
        return None;
    }
    let longer = w.max(h);
    if longer <= bound {
        return Some((w, h));
    }

    let ratio = bound as f64 / longer as f64;
    let (out_w, out_h) = if w >= h {
        (bound, (h as f64 * ratio).round() as u32)
    } else {
        ((w as f64 * ratio).round() as u32, bound)
    };

    (out_w > 0 && out_h > 0).then_some((out_w, out_h))
}

/// Dimensions of the upright surface for a stored image of `dims`.
pub fn oriented_dimensions(dims: (u32, u32), swaps: bool) -> (u32, u32) {
    if swaps { (dims.1, dims.0) } else { dims }
}

/// An axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where each part of the watermark goes on a canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkLayout {
    /// Integer upscale applied to the 8x8 glyphs of the main box.
    pub scale: u32,
    pub line_height: u32,
    pub padding: u32,
    /// Semi-opaque box anchored bottom-left.
    pub text_box: Rect,
    /// Top-left origin of each text line inside `text_box`.
    pub line_origins: Vec<(u32, u32)>,
    pub brand_scale: u32,
    /// Small box anchored top-right.
    pub brand_box: Rect,
    pub brand_origin: (u32, u32),
}

/// Pixel font size for a canvas: 1/40 of the shorter side, at least `min_font_px`.
///
/// Rounded down to a multiple of the glyph size so glyphs scale by whole pixels.
pub fn font_size(canvas: (u32, u32), min_font_px: u32) -> u32 {
    let target = (canvas.0.min(canvas.1) / 40).max(min_font_px);
    (target / GLYPH_SIZE).max(1) * GLYPH_SIZE
}

/// Lay out the watermark box and branding box for a canvas.
///
/// Box height is `lines × line_height + 2 × padding`; box width fits the
/// longest line. Both boxes are clamped to the canvas, so text that does not
/// fit is clipped rather than overflowing.
pub fn watermark_layout(
    canvas: (u32, u32),
    line_chars: &[usize],
    brand_chars: usize,
    min_font_px: u32,
) -> WatermarkLayout {
    let (cw, ch) = canvas;
    let font = font_size(canvas, min_font_px);
    let scale = font / GLYPH_SIZE;
    let line_height = font + font / 2;
    let padding = font / 2 + font / 4;
    let margin = font;

    let longest = line_chars.iter().copied().max().unwrap_or(0) as u32;
    let text_width = longest * font;
    let box_w = (text_width + 2 * padding).min(cw.saturating_sub(2 * margin).max(1));
    let box_h = (line_chars.len() as u32 * line_height + 2 * padding)
        .min(ch.saturating_sub(2 * margin).max(1));
    let box_x = margin.min(cw.saturating_sub(box_w));
    let box_y = ch.saturating_sub(margin + box_h);

    // Center each glyph row within its line.
    let leading = (line_height - font) / 2;
    let line_origins = (0..line_chars.len() as u32)
        .map(|i| (box_x + padding, box_y + padding + i * line_height + leading))
        .collect();

    let brand_scale = (scale / 2).max(1);
    let brand_font = brand_scale * GLYPH_SIZE;
    let brand_pad = brand_font / 2;
    let brand_w = (brand_chars as u32 * brand_font + 2 * brand_pad).min(cw);
    let brand_h = (brand_font + 2 * brand_pad).min(ch);
    let brand_x = cw.saturating_sub(margin / 2 + brand_w);
    let brand_y = (margin / 2).min(ch.saturating_sub(brand_h));

    WatermarkLayout {
        scale,
        line_height,
        padding,
        text_box: Rect {
            x: box_x,
            y: box_y,
            width: box_w,
            height: box_h,
        },
        line_origins,
        brand_scale,
        brand_box: Rect {
            x: brand_x,
            y: brand_y,
            width: brand_w,
            height: brand_h,
        },
        brand_origin: (brand_x + brand_pad, brand_y + brand_pad),
    }
}
