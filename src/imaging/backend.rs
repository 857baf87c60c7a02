//! Encoder trait and shared imaging types.
//!
//! The [`PhotoEncoder`] trait is the one operation the codec selector needs
//! from a backend: turn a raster into bytes of a given format and quality.
//!
//! The production implementation is
//! [`RustEncoder`](super::rust_backend::RustEncoder) — pure Rust, everything
//! statically linked into the binary.

use super::params::{OutputFormat, Quality};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
    #[error("Encode failed: {0}")]
    EncodeFailed(String),
}

/// Pixel dimensions of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Trait for image encoders.
///
/// `Send + Sync` so one encoder can be shared across concurrent pipeline
/// runs and moved into blocking workers behind an `Arc`.
pub trait PhotoEncoder: Send + Sync {
    fn encode(
        &self,
        raster: &RgbImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock encoder that records calls and returns canned output sizes.
    #[derive(Default)]
    pub struct MockEncoder {
        /// Output length per format; formats missing here fail to encode.
        pub sizes: HashMap<OutputFormat, usize>,
        pub calls: Mutex<Vec<RecordedEncode>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedEncode {
        pub format: OutputFormat,
        pub quality: u32,
        pub width: u32,
        pub height: u32,
    }

    impl MockEncoder {
        pub fn with_sizes(sizes: &[(OutputFormat, usize)]) -> Self {
            Self {
                sizes: sizes.iter().copied().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn get_calls(&self) -> Vec<RecordedEncode> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PhotoEncoder for MockEncoder {
        fn encode(
            &self,
            raster: &RgbImage,
            format: OutputFormat,
            quality: Quality,
        ) -> Result<Vec<u8>, BackendError> {
            self.calls.lock().unwrap().push(RecordedEncode {
                format,
                quality: quality.value(),
                width: raster.width(),
                height: raster.height(),
            });
            self.sizes
                .get(&format)
                .map(|&len| vec![0u8; len])
                .ok_or_else(|| BackendError::EncodeFailed(format!("mock has no {format:?}")))
        }
    }

    #[test]
    fn mock_records_encode() {
        let encoder = MockEncoder::with_sizes(&[(OutputFormat::Jpeg, 10)]);
        let raster = RgbImage::new(4, 3);

        let bytes = encoder
            .encode(&raster, OutputFormat::Jpeg, Quality::new(80))
            .unwrap();
        assert_eq!(bytes.len(), 10);

        let calls = encoder.get_calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0],
            RecordedEncode {
                format: OutputFormat::Jpeg,
                quality: 80,
                width: 4,
                height: 3,
            }
        ));
    }

    #[test]
    fn mock_fails_unknown_format() {
        let encoder = MockEncoder::default();
        let result = encoder.encode(&RgbImage::new(1, 1), OutputFormat::Avif, Quality::default());
        assert!(result.is_err());
        assert_eq!(encoder.get_calls().len(), 1);
    }
}
