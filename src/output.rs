//! CLI output formatting.
//!
//! Output is image-centric: each image leads with its positional index and
//! file name, with the written file and caption as indented context.
//!
//! ## Annotate
//!
//! ```text
//! ==> Annotating 3 images
//! 001 DSCF0041.JPG → DSCF0041-edited.JPG
//!     Caption: X100V | F/2.8 | 1/250S | ISO 400 | 23.0MM
//! 002 DSCF0042.JPG failed [CodecOpenFailure]
//!     Error: cannot open read stream for DSCF0042.JPG: ...
//!
//! Annotated 2 of 3 images, 1 failed
//! ```
//!
//! ## Check
//!
//! ```text
//! Font
//!     /usr/share/fonts/truetype/dejavu/DejaVuSans.ttf at 24px
//! Border
//!     60px white, caption in black
//! Caption
//!     001 Model
//!     002 FNumber (prefix "f/")
//! ```
//!
//! Each section has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::InfotoConfig;
use crate::process::{BatchReport, ProcessEvent};
use std::path::Path;

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

/// File name of `path`, or the whole path if it has none.
fn display_name(path: &Path) -> String {
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
// Annotate
// ============================================================================

/// Format a single annotation progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started { total } => {
            vec![format!("==> Annotating {}", plural(*total, "image"))]
        }
        ProcessEvent::Annotated { index, image } => {
            let mut lines = vec![format!(
                "{} {} \u{2192} {}",
                format_index(*index),
                display_name(&image.source),
                display_name(&image.output)
            )];
            if !image.caption.is_empty() {
                lines.push(format!("{}Caption: {}", indent(1), image.caption));
            }
            lines
        }
        ProcessEvent::Failed {
            index,
            source,
            kind,
            message,
        } => vec![
            format!(
                "{} {} failed [{kind}]",
                format_index(*index),
                display_name(source)
            ),
            format!("{}Error: {message}", indent(1)),
        ],
    }
}

/// Format the closing summary of a batch.
pub fn format_batch_summary(report: &BatchReport) -> Vec<String> {
    let total = report.annotated.len() + report.failed.len();
    let mut summary = format!(
        "Annotated {} of {}",
        report.annotated.len(),
        plural(total, "image")
    );
    if !report.failed.is_empty() {
        summary.push_str(&format!(", {} failed", report.failed.len()));
    }
    let mut lines = vec![String::new(), summary];
    for failure in &report.failed {
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            failure.source.display(),
            failure.error
        ));
    }
    lines
}

/// Print batch summary to stdout.
pub fn print_batch_summary(report: &BatchReport) {
    for line in format_batch_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the resolved configuration for `infoto check`.
pub fn format_check_output(config: &InfotoConfig) -> Vec<String> {
    let mut lines = vec![
        "Font".to_string(),
        format!(
            "{}{} at {}px",
            indent(1),
            config.font.ttf_file.display(),
            config.font.point
        ),
        "Border".to_string(),
        format!(
            "{}{}px {}, caption in {}",
            indent(1),
            config.background.pixels,
            config.background.color,
            config.font.color
        ),
        "Caption".to_string(),
    ];
    if config.metadata.is_empty() {
        lines.push(format!("{}(no metadata fields)", indent(1)));
    }
    for (i, field) in config.metadata.iter().enumerate() {
        let mut affixes = Vec::new();
        if !field.prefix.is_empty() {
            affixes.push(format!("prefix {:?}", field.prefix));
        }
        if !field.postfix.is_empty() {
            affixes.push(format!("postfix {:?}", field.postfix));
        }
        let mut line = format!("{}{} {}", indent(1), format_index(i + 1), field.name);
        if !affixes.is_empty() {
            line.push_str(&format!(" ({})", affixes.join(", ")));
        }
        if !crate::metadata::is_known_tag(&field.name) {
            line.push_str(" [unknown tag, will be skipped]");
        }
        lines.push(line);
    }
    lines
}

/// Print check output to stdout.
pub fn print_check_output(config: &InfotoConfig) {
    for line in format_check_output(config) {
        println!("{}", line);
    }
}
