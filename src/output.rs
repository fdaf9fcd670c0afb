//! CLI output formatting for the `convert` and `check` commands.
//!
//! # Output Format
//!
//! ## Convert
//!
//! One entry per file as it finishes (order follows completion, not input),
//! then a summary line:
//!
//! ```text
//! art/logo.svg → out/logo.png
//!     1250x1250 px, 48.2 KB
//! art/badge.svg → out/badge.jpg
//!     600x300 px, 21.0 KB
//!     warning: jpeg: Invalid JPEG header: missing SOI marker
//! FAILED art/broken.svg
//!     Invalid SVG: root element is <html>, expected <svg>
//!
//! Converted 2 of 3 files (1 failed, 1 warning)
//! ```
//!
//! ## Check
//!
//! ```text
//! art/logo.svg: 1250x1250 px at 300 dpi
//! art/broken.svg: invalid: Invalid SVG: document has no root element
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary, CheckReport};

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count: `512 B`, `48.2 KB`, `3.1 MB`.
fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Convert
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Converted {
            source,
            output,
            width,
            height,
            bytes,
            warnings,
        } => {
            let mut lines = vec![
                format!("{} → {}", source.display(), output.display()),
                format!("{}{width}x{height} px, {}", indent(1), format_bytes(*bytes)),
            ];
            for warning in warnings {
                lines.push(format!("{}warning: {warning}", indent(1)));
            }
            lines
        }
        BatchEvent::Failed { source, error } => vec![
            format!("FAILED {}", source.display()),
            format!("{}{error}", indent(1)),
        ],
    }
}

/// Format the closing summary of a batch.
pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    let mut details = Vec::new();
    if !summary.failed.is_empty() {
        details.push(format!("{} failed", summary.failed.len()));
    }
    if summary.warnings > 0 {
        details.push(plural(summary.warnings, "warning"));
    }

    let head = if summary.failed.is_empty() {
        format!("Converted {}", plural(summary.converted, "file"))
    } else {
        format!(
            "Converted {} of {}",
            summary.converted,
            plural(summary.total(), "file")
        )
    };

    if details.is_empty() {
        vec![head]
    } else {
        vec![format!("{head} ({})", details.join(", "))]
    }
}

pub fn print_batch_event(event: &BatchEvent) {
    for line in format_batch_event(event) {
        println!("{}", line);
    }
}

pub fn print_batch_summary(summary: &BatchSummary) {
    println!();
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format check results, one line per file.
pub fn format_check_reports(reports: &[CheckReport], dpi: u32) -> Vec<String> {
    reports
        .iter()
        .map(|report| match &report.result {
            Ok(size) => format!(
                "{}: {}x{} px at {dpi} dpi",
                report.source.display(),
                size.width,
                size.height
            ),
            Err(error) => format!("{}: invalid: {error}", report.source.display()),
        })
        .collect()
}

pub fn print_check_reports(reports: &[CheckReport], dpi: u32) {
    for line in format_check_reports(reports, dpi) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
