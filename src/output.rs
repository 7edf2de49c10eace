//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Intake
//!
//! ```text
//! Stamps
//! 001 (dawn.jpg) 800x400
//! 002 (cat.png) 512x512
//! Skipped
//!     broken.png: failed to decode image: ...
//! ```
//!
//! ## Export
//!
//! ```text
//! Exporting 2 stamps
//!     01.png 370x320 (48210 bytes)
//!     02.png 370x320 (51002 bytes)
//!     main.png 240x240 (30111 bytes)
//!     tab.png 96x74 (6120 bytes)
//! Wrote 4 files (135443 bytes) → stamps.zip
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::export::{ExportEvent, ExportSummary};
use crate::intake::IntakeReport;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Intake
// ============================================================================

/// Format the loaded batch: one line per stamp, then any skipped inputs.
///
/// Stamp indices are the 1-based numbers the `--main`/`--tab` flags take.
pub fn format_intake_report(report: &IntakeReport) -> Vec<String> {
    let mut lines = vec!["Stamps".to_string()];
    for (i, (path, bitmap)) in report.loaded.iter().enumerate() {
        let (w, h) = bitmap.dimensions();
        lines.push(format!(
            "{} ({}) {}x{}",
            format_index(i + 1),
            file_name(path),
            w,
            h
        ));
    }
    if !report.skipped.is_empty() {
        lines.push("Skipped".to_string());
        for skipped in &report.skipped {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                file_name(&skipped.path),
                skipped.error
            ));
        }
    }
    lines
}

pub fn print_intake_report(report: &IntakeReport) {
    for line in format_intake_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Export
// ============================================================================

/// Format a single export progress event as display lines.
pub fn format_export_event(event: &ExportEvent) -> Vec<String> {
    match event {
        ExportEvent::Started { items } => {
            vec![format!("Exporting {}", plural(*items, "stamp"))]
        }
        ExportEvent::AssetRendered {
            filename,
            size,
            bytes,
            ..
        } => vec![format!("{}{} {} ({} bytes)", indent(1), filename, size, bytes)],
        // The summary line is printed once the archive is on disk.
        ExportEvent::Written { .. } => Vec::new(),
    }
}

/// Format the closing line of an export.
pub fn format_export_summary(summary: &ExportSummary, destination: &Path) -> Vec<String> {
    vec![format!(
        "Wrote {} ({} bytes) → {}",
        plural(summary.files.len(), "file"),
        summary.total_bytes(),
        destination.display()
    )]
}

pub fn print_export_summary(summary: &ExportSummary, destination: &Path) {
    for line in format_export_summary(summary, destination) {
        println!("{}", line);
    }
}
