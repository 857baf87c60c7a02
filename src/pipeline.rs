//! Capture → stamped photo, under per-stage deadlines.
//!
//! ```text
//! Orienting ──► Resolving ──► Compositing ──► Encoding ──► ProcessedPhoto
//!   │ timeout      │ no fix       │ error/timeout  │ error/timeout
//!   ▼              ▼              ▼                ▼
//!   Normal         2-line mark    pass-through     pass-through
//! ```
//!
//! Every stage races its own timeout. A stage that times out or fails is
//! replaced by its fallback value and the run moves on, so [`PipelineSupervisor::run`]
//! always returns a [`ProcessedPhoto`]. The worst case is the original
//! capture, byte for byte, with its declared mime type and
//! `report.watermarked == false`.
//!
//! Blocking work (EXIF walk, decode/composite, encode) runs on tokio's
//! blocking pool. When a stage deadline passes, the worker's late result is
//! discarded; workers own clones of their inputs and write to nothing shared.

use crate::config::{StampConfig, TimeoutsConfig};
use crate::geolocation::{GeocodeError, GeolocationResolver, PositionSource};
use crate::imaging::backend::{Dimensions, PhotoEncoder};
use crate::imaging::codec::{CodecSelector, EncodedPhoto};
use crate::imaging::compositor::compose;
use crate::imaging::exif_reader::read_orientation_within;
use crate::imaging::rust_backend::{RustEncoder, probe_dimensions};
use crate::imaging::{CompositeSettings, Orientation};
use crate::types::{CaptureContext, GeolocationFix, ProcessedPhoto, RawCapture};
use crate::watermark::WatermarkSpec;
use image::RgbImage;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Orienting,
    Resolving,
    Compositing,
    Encoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Orienting => "orienting",
            Stage::Resolving => "resolving",
            Stage::Compositing => "compositing",
            Stage::Encoding => "encoding",
        };
        f.write_str(name)
    }
}

/// How a stage ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    /// Produced a usable but reduced result.
    Degraded(String),
    TimedOut,
    Failed(String),
    /// Not attempted because an earlier stage left nothing to work on.
    Skipped,
}

impl StageOutcome {
    /// True when the stage's fallback value was substituted.
    pub fn used_fallback(&self) -> bool {
        matches!(self, StageOutcome::TimedOut | StageOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub elapsed_ms: u64,
}

/// Audit trail of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub correlation_id: Uuid,
    pub stages: Vec<StageReport>,
    /// False when the output is the untouched capture.
    pub watermarked: bool,
    pub total_ms: u64,
}

impl PipelineReport {
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    /// Number of stages whose fallback value was substituted.
    pub fn fallback_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|r| r.outcome.used_fallback())
            .count()
    }

    /// True when every stage completed without degradation.
    pub fn is_clean(&self) -> bool {
        self.stages
            .iter()
            .all(|r| r.outcome == StageOutcome::Completed)
    }
}

/// Per-invocation context: correlation id and the run's start clock.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    pub correlation_id: Uuid,
    started: Instant,
}

impl RunContext {
    pub fn new() -> Self {
        Self::with_correlation_id(Uuid::new_v4())
    }

    pub fn with_correlation_id(correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Upper bounds for each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub orientation: Duration,
    /// Overall Resolving deadline; position and geocode have their own,
    /// shorter, limits inside the resolver.
    pub resolve: Duration,
    pub composite: Duration,
    pub encode: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self::from(&TimeoutsConfig::default())
    }
}

impl From<&TimeoutsConfig> for StageTimeouts {
    fn from(config: &TimeoutsConfig) -> Self {
        Self {
            orientation: config.orientation(),
            resolve: config.resolve(),
            composite: config.composite(),
            encode: config.encode(),
        }
    }
}

/// Runs captures through the stamping pipeline.
///
/// Holds only read-only collaborators, so one supervisor can serve many
/// concurrent runs.
pub struct PipelineSupervisor {
    resolver: Arc<GeolocationResolver>,
    encoder: Arc<dyn PhotoEncoder>,
    codec: CodecSelector,
    composite: CompositeSettings,
    timeouts: StageTimeouts,
    branding: String,
}

impl PipelineSupervisor {
    pub fn new(resolver: GeolocationResolver, encoder: Arc<dyn PhotoEncoder>) -> Self {
        Self {
            resolver: Arc::new(resolver),
            encoder,
            codec: CodecSelector::default(),
            composite: CompositeSettings::default(),
            timeouts: StageTimeouts::default(),
            branding: crate::config::DEFAULT_BRANDING.to_string(),
        }
    }

    /// Production supervisor: [`RustEncoder`] plus everything from `config`.
    pub fn from_config(
        config: &StampConfig,
        position: Arc<dyn PositionSource>,
    ) -> Result<Self, GeocodeError> {
        let resolver = GeolocationResolver::from_config(config, position)?;
        Ok(
            Self::new(resolver, Arc::new(RustEncoder::new(config.encoding.avif_speed)))
                .with_codec(config.codec_selector())
                .with_composite_settings(config.composite_settings())
                .with_timeouts(StageTimeouts::from(&config.timeouts))
                .with_branding(config.watermark.branding.clone()),
        )
    }

    pub fn with_codec(mut self, codec: CodecSelector) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_composite_settings(mut self, settings: CompositeSettings) -> Self {
        self.composite = settings;
        self
    }

    pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_branding(mut self, branding: impl Into<String>) -> Self {
        self.branding = branding.into();
        self
    }

    /// Process one capture with a fresh [`RunContext`].
    pub async fn run(&self, capture: RawCapture, context: &CaptureContext) -> ProcessedPhoto {
        self.run_with(capture, context, RunContext::new()).await
    }

    /// Process one capture. Never fails; see the module docs for fallbacks.
    pub async fn run_with(
        &self,
        capture: RawCapture,
        context: &CaptureContext,
        run: RunContext,
    ) -> ProcessedPhoto {
        let span = tracing::info_span!(
            "stamp",
            correlation_id = %run.correlation_id,
            location = %context.location_name,
            source_bytes = capture.size_bytes,
        );
        self.execute(capture, context, run).instrument(span).await
    }

    async fn execute(
        &self,
        capture: RawCapture,
        context: &CaptureContext,
        run: RunContext,
    ) -> ProcessedPhoto {
        let RawCapture {
            bytes,
            mime_type,
            size_bytes,
        } = capture;
        let source: Arc<[u8]> = bytes.into();
        let mut stages = Vec::with_capacity(4);

        let orientation = self.orient(&source, &mut stages).await;
        let fix = self.resolve(&mut stages).await;
        let watermark = WatermarkSpec::build(context, fix.as_ref(), &self.branding);
        let raster = self
            .composite(&source, orientation, &watermark, &mut stages)
            .await;
        let encoded = match raster {
            Some(raster) => self.encode(raster, size_bytes, &mut stages).await,
            None => {
                record(&mut stages, Stage::Encoding, StageOutcome::Skipped, Instant::now());
                None
            }
        };

        let (bytes, mime_type, dimensions, watermarked) = match encoded {
            Some((photo, dimensions)) => {
                let mime = photo.mime_type().to_string();
                (photo.bytes, mime, Some(dimensions), true)
            }
            None => {
                tracing::warn!("returning original capture without watermark");
                let dimensions = probe_dimensions(&source);
                (source.to_vec(), mime_type, dimensions, false)
            }
        };

        let sha256 = format!("{:x}", Sha256::digest(&bytes));
        let report = PipelineReport {
            correlation_id: run.correlation_id,
            stages,
            watermarked,
            total_ms: millis(run.elapsed()),
        };
        tracing::info!(
            watermarked,
            fallbacks = report.fallback_count(),
            mime = %mime_type,
            output_bytes = bytes.len(),
            total_ms = report.total_ms,
            "capture processed"
        );

        ProcessedPhoto {
            size_bytes: bytes.len() as u64,
            bytes,
            mime_type,
            dimensions,
            orientation,
            watermark,
            geolocation: fix,
            sha256,
            report,
        }
    }

    async fn orient(&self, source: &Arc<[u8]>, stages: &mut Vec<StageReport>) -> Orientation {
        let started = Instant::now();
        match read_orientation_within(source.clone(), self.timeouts.orientation).await {
            Some(orientation) => {
                record(stages, Stage::Orienting, StageOutcome::Completed, started);
                orientation
            }
            None => {
                record(stages, Stage::Orienting, StageOutcome::TimedOut, started);
                Orientation::Normal
            }
        }
    }

    async fn resolve(&self, stages: &mut Vec<StageReport>) -> Option<GeolocationFix> {
        let started = Instant::now();
        let deadline = started + self.timeouts.resolve;
        // The resolver caps each step by `deadline`; the outer race also
        // bounds anything a custom position source does outside its future.
        match tokio::time::timeout(self.timeouts.resolve, self.resolver.resolve_by(deadline)).await
        {
            Ok(resolution) => {
                let outcome = if resolution.deadline_reached {
                    StageOutcome::TimedOut
                } else {
                    match resolution.degraded {
                        Some(reason) => StageOutcome::Degraded(reason),
                        None => StageOutcome::Completed,
                    }
                };
                record(stages, Stage::Resolving, outcome, started);
                resolution.fix
            }
            Err(_) => {
                record(stages, Stage::Resolving, StageOutcome::TimedOut, started);
                None
            }
        }
    }

    async fn composite(
        &self,
        source: &Arc<[u8]>,
        orientation: Orientation,
        watermark: &WatermarkSpec,
        stages: &mut Vec<StageReport>,
    ) -> Option<RgbImage> {
        let started = Instant::now();
        let bytes = source.clone();
        let watermark = watermark.clone();
        let settings = self.composite.clone();
        let task = tokio::task::spawn_blocking(move || {
            compose(&bytes, orientation, &watermark, &settings)
        });

        let (outcome, raster) = match tokio::time::timeout(self.timeouts.composite, task).await {
            Ok(Ok(Ok(raster))) => (StageOutcome::Completed, Some(raster)),
            Ok(Ok(Err(e))) => (StageOutcome::Failed(e.to_string()), None),
            Ok(Err(join_error)) => (StageOutcome::Failed(join_error.to_string()), None),
            Err(_) => (StageOutcome::TimedOut, None),
        };
        record(stages, Stage::Compositing, outcome, started);
        raster
    }

    async fn encode(
        &self,
        raster: RgbImage,
        source_size: u64,
        stages: &mut Vec<StageReport>,
    ) -> Option<(EncodedPhoto, Dimensions)> {
        let started = Instant::now();
        let dimensions = Dimensions::from(raster.dimensions());
        let encoder = self.encoder.clone();
        let codec = self.codec;
        let task = tokio::task::spawn_blocking(move || {
            codec.encode(encoder.as_ref(), &raster, source_size)
        });

        let (outcome, photo) = match tokio::time::timeout(self.timeouts.encode, task).await {
            Ok(Ok(Ok(photo))) => {
                tracing::debug!(
                    format = ?photo.format,
                    quality = photo.quality.value(),
                    fell_back = photo.fell_back,
                    "encoded"
                );
                (StageOutcome::Completed, Some((photo, dimensions)))
            }
            Ok(Ok(Err(e))) => (StageOutcome::Failed(e.to_string()), None),
            Ok(Err(join_error)) => (StageOutcome::Failed(join_error.to_string()), None),
            Err(_) => (StageOutcome::TimedOut, None),
        };
        record(stages, Stage::Encoding, outcome, started);
        photo
    }
}

fn record(stages: &mut Vec<StageReport>, stage: Stage, outcome: StageOutcome, started: Instant) {
    let elapsed_ms = millis(started.elapsed());
    match &outcome {
        StageOutcome::Completed => tracing::debug!(%stage, elapsed_ms, "stage completed"),
        StageOutcome::Skipped => tracing::debug!(%stage, "stage skipped"),
        StageOutcome::Degraded(reason) => {
            tracing::warn!(%stage, elapsed_ms, %reason, "stage degraded")
        }
        StageOutcome::TimedOut => {
            tracing::warn!(%stage, elapsed_ms, "stage timed out, using fallback")
        }
        StageOutcome::Failed(reason) => {
            tracing::warn!(%stage, elapsed_ms, %reason, "stage failed, using fallback")
        }
    }
    stages.push(StageReport {
        stage,
        outcome,
        elapsed_ms,
    });
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
