//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Plan
//!
//! Printed once the pipeline is validated, before the input is decoded:
//!
//! ```text
//! photo.png
//! Pipeline (3 operations)
//!     001 blur (strength 2)
//!     002 brightness (-30)
//!     003 sharpen (strength 1)
//! ```
//!
//! ## Stages
//!
//! One block per completed stage, streamed while the pipeline runs:
//!
//! ```text
//! [1/3] blur (strength 2): 5x5 kernel, 14ms
//!     Range: 0.0..255.0
//! [2/3] brightness (-30): 0ms
//!     Range: -30.0..225.0
//! ```
//!
//! ## Result
//!
//! ```text
//! Saved out.jpg (640x480 rgb)
//! Displayed result
//! ```
//!
//! # Architecture
//!
//! Each section has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::buffer::PixelBuffer;
use crate::pipeline::{Pipeline, StageEvent};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `640x480 rgb`
fn dimensions(buffer: &PixelBuffer) -> String {
    format!("{}x{} {}", buffer.width(), buffer.height(), buffer.layout())
}

fn millis(elapsed: Duration) -> String {
    format!("{}ms", elapsed.as_millis())
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

// ============================================================================
// Plan
// ============================================================================

pub fn format_plan(input: &Path, pipeline: &Pipeline) -> Vec<String> {
    let mut lines = vec![input.display().to_string()];

    if pipeline.is_empty() {
        lines.push("Pipeline empty, image passes through unchanged".to_string());
        return lines;
    }

    lines.push(format!(
        "Pipeline ({})",
        plural(pipeline.len(), "operation", "operations")
    ));
    for (i, operation) in pipeline.operations().iter().enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), operation));
    }
    lines
}

pub fn print_plan(input: &Path, pipeline: &Pipeline) {
    for line in format_plan(input, pipeline) {
        println!("{}", line);
    }
}

// ============================================================================
// Stages
// ============================================================================

pub fn format_stage_event(event: &StageEvent) -> Vec<String> {
    let header = match event.kernel_size {
        Some(size) => format!(
            "[{}/{}] {}: {}x{} kernel, {}",
            event.index,
            event.total,
            event.operation,
            size,
            size,
            millis(event.elapsed)
        ),
        None => format!(
            "[{}/{}] {}: {}",
            event.index,
            event.total,
            event.operation,
            millis(event.elapsed)
        ),
    };
    let (lo, hi) = event.range;
    vec![header, format!("{}Range: {:.1}..{:.1}", indent(1), lo, hi)]
}

// ============================================================================
// Result
// ============================================================================

pub fn format_result(saved: Option<&Path>, displayed: bool, buffer: &PixelBuffer) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(path) = saved {
        lines.push(format!("Saved {} ({})", path.display(), dimensions(buffer)));
    }
    if displayed {
        lines.push("Displayed result".to_string());
    }
    if lines.is_empty() {
        lines.push("Nothing written (no --output, display disabled)".to_string());
    }
    lines
}

pub fn print_result(saved: Option<&Path>, displayed: bool, buffer: &PixelBuffer) {
    for line in format_result(saved, displayed, buffer) {
        println!("{}", line);
    }
}
