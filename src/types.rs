//! Shared data model for the stamping pipeline.
//!
//! A [`RawCapture`] lives for exactly one pipeline run. The resulting
//! [`ProcessedPhoto`] is handed to the caller (typically an upload step) and
//! the pipeline keeps no reference to it.

use crate::imaging::Orientation;
use crate::imaging::backend::Dimensions;
use crate::pipeline::PipelineReport;
use crate::watermark::WatermarkSpec;
use serde::{Deserialize, Serialize};

/// Photo bytes exactly as captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCapture {
    pub bytes: Vec<u8>,
    /// Declared mime type, e.g. `image/jpeg`. Preserved on pass-through.
    pub mime_type: String,
    /// Source size in bytes; drives encoding quality.
    pub size_bytes: u64,
}

impl RawCapture {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let size_bytes = bytes.len() as u64;
        Self {
            bytes,
            mime_type: mime_type.into(),
            size_bytes,
        }
    }
}

/// Capture-time context supplied by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureContext {
    pub location_name: String,
    /// RFC 3339 timestamp of the capture, e.g. `2026-10-18T09:30:00+07:00`.
    pub timestamp_iso: String,
    pub organization_id: String,
}

/// A device position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters, when the device reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
}

/// Structured address from a reverse-geocode lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suburb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
}

impl AddressDetails {
    pub fn is_empty(&self) -> bool {
        self.parts().next().is_none()
    }

    /// Non-empty components, most specific first.
    fn parts(&self) -> impl Iterator<Item = &str> {
        [
            &self.road,
            &self.village,
            &self.suburb,
            &self.district,
            &self.city,
            &self.postcode,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref().map(str::trim))
        .filter(|part| !part.is_empty())
    }

    /// One-line address, e.g. `Jl. Sudirman, Menteng, Jakarta Pusat, 10310`.
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<&str> = self.parts().collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

/// Where a capture was taken. Absence of a fix is a valid outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocationFix {
    #[serde(flatten)]
    pub coordinates: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressDetails>,
}

/// Pipeline output, always produced.
///
/// When any stage degraded so far that no watermark could be burned in,
/// `bytes` is the untouched capture and `report.watermarked` is false.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedPhoto {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Output pixel dimensions; `None` when the bytes are not a readable image.
    pub dimensions: Option<Dimensions>,
    pub orientation: Orientation,
    pub watermark: WatermarkSpec,
    pub geolocation: Option<GeolocationFix>,
    /// Lowercase hex SHA-256 of `bytes`.
    pub sha256: String,
    pub size_bytes: u64,
    pub report: PipelineReport,
}
