//! Stamping configuration.
//!
//! Handles loading, validating, and merging `fieldproof.toml`. User files are
//! sparse overlays on top of the stock defaults: set only what you want to
//! change, everything else keeps its default. Unknown keys are rejected.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [timeouts]                # milliseconds
//! orientation_ms = 3000     # EXIF orientation read
//! position_ms = 5000        # device position query
//! geocode_ms = 3000         # reverse geocode request
//! resolve_ms = 8000         # whole geolocation stage
//! composite_ms = 10000      # decode + orient + watermark
//! encode_ms = 10000         # output encoding
//!
//! [image]
//! max_dimension = 1280      # longest output side in pixels
//!
//! [watermark]
//! branding = "FieldProof"
//! box_opacity = 0.55
//! min_font_px = 16
//!
//! [encoding]
//! primary = "avif"
//! fallback = "jpeg"
//! avif_speed = 8            # 1 (slowest, smallest) to 10 (fastest)
//!
//! [geocoding]
//! enabled = true
//! endpoint = "https://nominatim.openstreetmap.org/reverse"
//! user_agent = "fieldproof/0.4.0"
//!
//! [scoring.weights]         # component id -> weight (default 1)
//! floor = 2.0
//! ```
//!
//! ## Partial Configuration
//!
//! ```toml
//! # Only tighten the geocode deadline and switch to JPEG output
//! [timeouts]
//! geocode_ms = 1500
//!
//! [encoding]
//! primary = "jpeg"
//! ```

use crate::imaging::codec::CodecSelector;
use crate::imaging::{CompositeSettings, OutputFormat};
use crate::scoring::WeightTable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "fieldproof.toml";
pub const DEFAULT_BRANDING: &str = "FieldProof";
pub const DEFAULT_GEOCODE_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `fieldproof.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StampConfig {
    /// Upper bounds for every bounded wait.
    pub timeouts: TimeoutsConfig,
    /// Output raster size.
    pub image: ImageConfig,
    /// Watermark appearance and branding.
    pub watermark: WatermarkConfig,
    /// Output format preference.
    pub encoding: EncodingConfig,
    /// Reverse geocoding service.
    pub geocoding: GeocodingConfig,
    /// Inspection scoring weights.
    pub scoring: ScoringConfig,
}

impl StampConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timeouts;
        for (name, value) in [
            ("orientation_ms", t.orientation_ms),
            ("position_ms", t.position_ms),
            ("geocode_ms", t.geocode_ms),
            ("resolve_ms", t.resolve_ms),
            ("composite_ms", t.composite_ms),
            ("encode_ms", t.encode_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!(
                    "timeouts.{name} must be non-zero"
                )));
            }
        }
        if self.image.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "image.max_dimension must be non-zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.watermark.box_opacity) {
            return Err(ConfigError::Validation(
                "watermark.box_opacity must be 0.0-1.0".into(),
            ));
        }
        if self.watermark.min_font_px == 0 {
            return Err(ConfigError::Validation(
                "watermark.min_font_px must be non-zero".into(),
            ));
        }
        if !(1..=10).contains(&self.encoding.avif_speed) {
            return Err(ConfigError::Validation(
                "encoding.avif_speed must be 1-10".into(),
            ));
        }
        if self.geocoding.enabled && self.geocoding.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "geocoding.endpoint must be set when geocoding is enabled".into(),
            ));
        }
        Ok(())
    }

    pub fn composite_settings(&self) -> CompositeSettings {
        CompositeSettings {
            max_dimension: self.image.max_dimension,
            box_opacity: self.watermark.box_opacity,
            min_font_px: self.watermark.min_font_px,
        }
    }

    pub fn codec_selector(&self) -> CodecSelector {
        CodecSelector {
            primary: self.encoding.primary,
            fallback: self.encoding.fallback,
        }
    }
}

/// Timeouts in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutsConfig {
    pub orientation_ms: u64,
    pub position_ms: u64,
    pub geocode_ms: u64,
    /// Whole geolocation stage; caps position + geocode together.
    pub resolve_ms: u64,
    pub composite_ms: u64,
    pub encode_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            orientation_ms: 3000,
            position_ms: 5000,
            geocode_ms: 3000,
            resolve_ms: 8000,
            composite_ms: 10_000,
            encode_ms: 10_000,
        }
    }
}

impl TimeoutsConfig {
    pub fn orientation(&self) -> Duration {
        Duration::from_millis(self.orientation_ms)
    }

    pub fn position(&self) -> Duration {
        Duration::from_millis(self.position_ms)
    }

    pub fn geocode(&self) -> Duration {
        Duration::from_millis(self.geocode_ms)
    }

    pub fn resolve(&self) -> Duration {
        Duration::from_millis(self.resolve_ms)
    }

    pub fn composite(&self) -> Duration {
        Duration::from_millis(self.composite_ms)
    }

    pub fn encode(&self) -> Duration {
        Duration::from_millis(self.encode_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    /// Longest side of the output raster, in pixels.
    pub max_dimension: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1280,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    /// Mark drawn in the top-right branding box. Empty disables the box.
    pub branding: String,
    /// Opacity of the black boxes behind the text (0.0-1.0).
    pub box_opacity: f32,
    /// Smallest text height in pixels; larger canvases scale up from here.
    pub min_font_px: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            branding: DEFAULT_BRANDING.to_string(),
            box_opacity: 0.55,
            min_font_px: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// Tried first.
    pub primary: OutputFormat,
    /// Used when the primary fails or is not smaller than the capture.
    pub fallback: OutputFormat,
    /// rav1e speed preset for AVIF, 1-10.
    pub avif_speed: u8,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            primary: OutputFormat::Avif,
            fallback: OutputFormat::Jpeg,
            avif_speed: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocodingConfig {
    pub enabled: bool,
    /// Nominatim-compatible `/reverse` URL.
    pub endpoint: String,
    /// Sent with every request; public Nominatim requires one.
    pub user_agent: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_GEOCODE_ENDPOINT.to_string(),
            user_agent: concat!("fieldproof/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Component id → weight. Validated on load: finite, non-negative.
    pub weights: WeightTable,
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(StampConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `fieldproof.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    read_toml(&config_path).map(Some)
}

fn read_toml(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<StampConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StampConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `fieldproof.toml` in `dir`, or stock defaults without one.
pub fn load_config(dir: &Path) -> Result<StampConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(dir)?)
}

/// Load config from an explicit file path. The file must exist.
pub fn load_config_file(path: &Path) -> Result<StampConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, Some(read_toml(path)?))
}

/// Returns a fully-commented stock `fieldproof.toml` with all keys.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# FieldProof Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Timeouts (milliseconds)
# ---------------------------------------------------------------------------
# A stage that runs out of time is replaced by its fallback; the photo is
# always saved, at worst without a watermark.
[timeouts]
# EXIF orientation read. Fallback: no rotation.
orientation_ms = 3000

# Device position query. Fallback: no location lines.
position_ms = 5000

# Reverse geocode request. Fallback: raw GPS coordinates.
geocode_ms = 3000

# Whole geolocation stage (position + geocode).
resolve_ms = 8000

# Decode, orient, downscale, and watermark. Fallback: original photo.
composite_ms = 10000

# Output encoding. Fallback: original photo.
encode_ms = 10000

# ---------------------------------------------------------------------------
# Output image
# ---------------------------------------------------------------------------
[image]
# Longest side of the stamped photo, in pixels. Smaller photos are not upscaled.
max_dimension = 1280

# ---------------------------------------------------------------------------
# Watermark
# ---------------------------------------------------------------------------
[watermark]
# Text in the top-right branding box. Set to "" to hide the box.
branding = "FieldProof"

# Opacity of the dark boxes behind the text (0.0 - 1.0).
box_opacity = 0.55

# Minimum text height in pixels. Larger photos get proportionally larger text.
min_font_px = 16

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encoding]
# Format tried first: "avif" or "jpeg".
primary = "avif"

# Used when the primary fails or is not smaller than the original capture.
fallback = "jpeg"

# AVIF encoder speed, 1 (slowest, smallest) to 10 (fastest).
avif_speed = 8

# ---------------------------------------------------------------------------
# Reverse geocoding
# ---------------------------------------------------------------------------
[geocoding]
# Turn coordinates into a street address for the watermark.
enabled = true

# Nominatim-compatible reverse geocoding endpoint.
endpoint = "https://nominatim.openstreetmap.org/reverse"

# User-Agent header sent with every request.
user_agent = "fieldproof/0.4.0"

# ---------------------------------------------------------------------------
# Inspection scoring
# ---------------------------------------------------------------------------
# Relative weight per component id. Components not listed weigh 1.
# Weights must be non-negative; they do not need to sum to anything.
[scoring.weights]
# floor = 2.0
# odor = 1.5
"##
}
