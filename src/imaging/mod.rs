//! Image processing — pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **EXIF orientation** | custom parser (JPEG APP1 + TIFF IFD0) |
//! | **Decode** | `image::ImageReader` with format sniffing |
//! | **Downscale** | `resize_exact` + Triangle filter |
//! | **Orient** | `rotate90/180/270` + `fliph/flipv` |
//! | **Watermark text** | `font8x8` bitmap glyphs, blended boxes |
//! | **Encode** | AVIF (rav1e) or JPEG via `image` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and layout math (unit testable)
//! - **Parameters**: Data structures describing what to produce
//! - **Backend**: [`PhotoEncoder`] trait + [`RustEncoder`]
//! - **Compositor / Codec**: High-level steps combining calculations + backend

pub mod backend;
pub mod calculations;
pub mod codec;
pub mod compositor;
pub mod exif_reader;
mod glyphs;
pub mod orientation;
pub mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, PhotoEncoder};
pub use codec::{CodecSelector, EncodedPhoto, select_quality};
pub use compositor::{CompositeError, compose};
pub use exif_reader::read_orientation;
pub use orientation::Orientation;
pub use params::{CompositeSettings, OutputFormat, Quality};
pub use rust_backend::RustEncoder;
