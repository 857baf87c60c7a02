//! Bitmap text and box drawing on RGB rasters.
//!
//! Glyphs come from `font8x8` (basic Latin plus Latin-1 supplement); any
//! other character renders as `?`. All drawing clips to the raster bounds.

use super::calculations::Rect;
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};

/// Native glyph edge in pixels.
pub const GLYPH_SIZE: u32 = 8;

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Draw `text` with its top-left corner at `origin`, each glyph pixel
/// expanded to a `scale`×`scale` block.
pub fn draw_text(img: &mut RgbImage, origin: (u32, u32), text: &str, scale: u32, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    let scale = scale.max(1);
    let mut pen_x = origin.0;

    for c in text.chars() {
        if pen_x >= w {
            break;
        }
        let rows = glyph(c);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                // Bit 0 is the leftmost pixel.
                if bits & (1 << col) == 0 {
                    continue;
                }
                let x0 = pen_x + col * scale;
                let y0 = origin.1 + row as u32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let (x, y) = (x0 + dx, y0 + dy);
                        if x < w && y < h {
                            img.put_pixel(x, y, color);
                        }
                    }
                }
            }
        }
        pen_x = pen_x.saturating_add(GLYPH_SIZE * scale);
    }
}

/// Blend `color` over `rect` with the given opacity (0.0 = invisible, 1.0 = solid).
pub fn fill_rect_blend(img: &mut RgbImage, rect: Rect, color: Rgb<u8>, opacity: f32) {
    let (w, h) = img.dimensions();
    let alpha = opacity.clamp(0.0, 1.0);
    let x_end = rect.x.saturating_add(rect.width).min(w);
    let y_end = rect.y.saturating_add(rect.height).min(h);

    for y in rect.y.min(h)..y_end {
        for x in rect.x.min(w)..x_end {
            let px = img.get_pixel_mut(x, y);
            for (channel, target) in px.0.iter_mut().zip(color.0) {
                let blended = *channel as f32 * (1.0 - alpha) + target as f32 * alpha;
                *channel = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}
