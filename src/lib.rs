//! # FieldProof
//!
//! Photo evidence and scoring for facility inspections.
//!
//! An inspector's capture gets the record of where and when it was taken
//! burned into its pixels (location name, local time, street address or raw
//! GPS), then is downscaled and re-encoded for upload. Separately, the
//! inspector's per-component ratings condense into one 0–100 score.
//!
//! # Architecture: Four-Stage Pipeline
//!
//! ```text
//! 1. Orienting    capture bytes  →  EXIF orientation      (default: upright)
//! 2. Resolving    device + HTTP  →  GeolocationFix?       (default: none)
//! 3. Compositing  bytes + fix    →  watermarked raster    (default: original)
//! 4. Encoding     raster         →  AVIF / JPEG bytes     (default: original)
//! ```
//!
//! Each stage races its own timeout and has a fallback value, so the pipeline
//! always returns a [`types::ProcessedPhoto`]. Losing the watermark is
//! acceptable; losing the photo is not. Whether the watermark made it is
//! recorded in the photo's [`pipeline::PipelineReport`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Stage orchestration, per-stage timeouts, fallbacks, audit report |
//! | [`geolocation`] | Bounded device position + reverse geocode (Nominatim) |
//! | [`watermark`] | Watermark text lines from the capture context and fix |
//! | [`imaging`] | EXIF orientation, decode, orient, downscale, draw, encode |
//! | [`scoring`] | Weighted 1–5 ratings → 0–100 inspection score |
//! | [`config`] | `fieldproof.toml` loading, validation, merging over stock defaults |
//! | [`types`] | Shared data model (`RawCapture`, `GeolocationFix`, `ProcessedPhoto`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Timeouts Over Retries
//!
//! Every wait is bounded. A slow reverse geocode degrades the watermark to
//! raw coordinates rather than holding up the inspector; a capture that will
//! not decode is uploaded as-is. Abandoned work runs on owned copies of its
//! inputs, so a late result has nowhere to write.
//!
//! ## Bitmap Glyphs
//!
//! Watermark text uses the 8x8 `font8x8` glyph set, scaled by whole pixels.
//! No font files, no system font lookup, and the same inputs always produce
//! the same pixels, on any machine.
//!
//! ## Quality From the Capture Size
//!
//! Encoding quality is chosen from the size of the *original* capture, not
//! the downscaled raster. Large captures are compressed harder. This mirrors
//! how the photos were historically produced, so scores and evidence from
//! older inspections stay comparable.

pub mod config;
pub mod geolocation;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod types;
pub mod watermark;

#[cfg(test)]
pub(crate) mod test_helpers;
