//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Stamp
//!
//! ```text
//! lobby.avif (image/avif, 720x1280, 184213 bytes)
//!     Watermark:
//!         Lobby WC
//!         18 Oct 2026 09:30:00 +07:00
//!         Jl. Sudirman, Menteng, Jakarta Pusat
//!     Orientation: 6
//!     SHA-256: 3f1a…
//!     Stages:
//!         orienting    completed            0ms
//!         resolving    degraded             3004ms  reverse geocode timed out
//!         compositing  completed            412ms
//!         encoding     completed            1380ms
//! ```
//!
//! A capture saved without a watermark gets a `Saved without watermark` line
//! in place of the watermark block.
//!
//! ## Score
//!
//! ```text
//! Score: 82/100 (6 components)
//!     aroma         70  (2)
//!     visual        90  (3)
//!     functional    80  (1)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::pipeline::{StageOutcome, StageReport};
use crate::scoring::{ComponentCategory, InspectionScore};
use crate::types::ProcessedPhoto;
use std::collections::BTreeMap;
use std::path::Path;

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn outcome_label(outcome: &StageOutcome) -> (&'static str, Option<&str>) {
    match outcome {
        StageOutcome::Completed => ("completed", None),
        StageOutcome::Degraded(reason) => ("degraded", Some(reason)),
        StageOutcome::TimedOut => ("timed out", None),
        StageOutcome::Failed(reason) => ("failed", Some(reason)),
        StageOutcome::Skipped => ("skipped", None),
    }
}

fn stage_line(report: &StageReport) -> String {
    let (label, reason) = outcome_label(&report.outcome);
    let line = format!(
        "{}{:<12} {:<12} {:>6}ms",
        indent(2),
        report.stage.to_string(),
        label,
        report.elapsed_ms
    );
    match reason {
        Some(reason) => format!("{line}  {reason}"),
        None => line,
    }
}

// ============================================================================
// Stamp
// ============================================================================

pub fn format_stamp_report(photo: &ProcessedPhoto, output: &Path) -> Vec<String> {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| output.display().to_string());
    let dims = photo
        .dimensions
        .map(|d| format!("{}x{}", d.width, d.height))
        .unwrap_or_else(|| "unknown size".to_string());

    let mut lines = vec![format!(
        "{name} ({}, {dims}, {} bytes)",
        photo.mime_type, photo.size_bytes
    )];

    if photo.report.watermarked {
        lines.push(format!("{}Watermark:", indent(1)));
        for text in &photo.watermark.lines {
            lines.push(format!("{}{text}", indent(2)));
        }
    } else {
        lines.push(format!("{}Saved without watermark", indent(1)));
    }

    lines.push(format!("{}Orientation: {}", indent(1), photo.orientation.code()));
    lines.push(format!("{}SHA-256: {}", indent(1), photo.sha256));
    lines.push(format!("{}Stages:", indent(1)));
    lines.extend(photo.report.stages.iter().map(stage_line));
    lines
}

pub fn print_stamp_report(photo: &ProcessedPhoto, output: &Path) {
    for line in format_stamp_report(photo, output) {
        println!("{line}");
    }
}

// ============================================================================
// Score
// ============================================================================

pub fn format_score(
    score: &InspectionScore,
    breakdown: &BTreeMap<ComponentCategory, InspectionScore>,
) -> Vec<String> {
    let noun = if score.component_count == 1 {
        "component"
    } else {
        "components"
    };
    let mut lines = vec![format!(
        "Score: {}/100 ({} {noun})",
        score.value, score.component_count
    )];
    for (category, part) in breakdown {
        lines.push(format!(
            "{}{:<13} {:>3}  ({})",
            indent(1),
            category.label(),
            part.value,
            part.component_count
        ));
    }
    lines
}

pub fn print_score(
    score: &InspectionScore,
    breakdown: &BTreeMap<ComponentCategory, InspectionScore>,
) {
    for line in format_score(score, breakdown) {
        println!("{line}");
    }
}
