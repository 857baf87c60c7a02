//! Watermark text for a capture.
//!
//! A [`WatermarkSpec`] is built once per capture from the capture context and
//! whatever geolocation was available, then handed unchanged to the
//! compositor and recorded on the processed photo for audit.
//!
//! ```text
//! Lobby WC                                 ← location name
//! 18 Oct 2026 09:30:00 +07:00              ← capture date and time
//! Jl. Sudirman, Menteng, Jakarta, 10310    ← address, or raw GPS without one
//! ```

use crate::types::{CaptureContext, Coordinates, GeolocationFix};
use chrono::DateTime;
use serde::{Deserialize, Serialize};

const UNKNOWN_LOCATION: &str = "Unknown location";

/// Ordered text lines plus the branding mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkSpec {
    pub lines: Vec<String>,
    pub branding: String,
}

impl WatermarkSpec {
    pub fn build(context: &CaptureContext, fix: Option<&GeolocationFix>, branding: &str) -> Self {
        let mut lines = Vec::with_capacity(3);

        let location = context.location_name.trim();
        lines.push(if location.is_empty() {
            UNKNOWN_LOCATION.to_string()
        } else {
            location.to_string()
        });

        match format_timestamp(&context.timestamp_iso) {
            Some(stamp) => lines.push(stamp),
            None => {
                let raw = context.timestamp_iso.trim();
                if !raw.is_empty() {
                    lines.push(raw.to_string());
                }
            }
        }

        if let Some(fix) = fix {
            let place = fix
                .address
                .as_ref()
                .and_then(|address| address.summary())
                .unwrap_or_else(|| format_coordinates(&fix.coordinates));
            lines.push(place);
        }

        Self {
            lines,
            branding: branding.to_string(),
        }
    }

    /// True when the last line carries raw coordinates rather than an address.
    pub fn shows_raw_coordinates(&self) -> bool {
        self.lines.last().is_some_and(|l| l.starts_with("GPS "))
    }
}

/// Format an RFC 3339 timestamp as `18 Oct 2026 09:30:00 +07:00`.
///
/// The offset of the original timestamp is kept; the inspector's local time
/// is what the watermark should show.
pub fn format_timestamp(iso: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(iso.trim()).ok()?;
    Some(parsed.format("%d %b %Y %H:%M:%S %:z").to_string())
}

/// Format coordinates as `GPS -6.200000, 106.800000`, with accuracy when known.
pub fn format_coordinates(coords: &Coordinates) -> String {
    let base = format!("GPS {:.6}, {:.6}", coords.latitude, coords.longitude);
    match coords.accuracy_m {
        Some(accuracy) if accuracy.is_finite() => format!("{base} (±{accuracy:.0}m)"),
        _ => base,
    }
}
