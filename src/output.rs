//! CLI output formatting for pipeline progress.
//!
//! Format functions are pure (no I/O) so the display contract is unit
//! testable; `print_event` is the thin stdout wrapper the printer thread
//! uses.
//!
//! ```text
//! /img/dawn.jpg: cached
//! /img/dusk.jpg: generating 8 derivatives
//!     3 of 8
//!     8 of 8
//! /img/dusk.jpg: done (8 encoded)
//! ```

use crate::naming::{Variant, fallback_href, normalize_src, published_href};
use crate::probe::Dimensions;
use crate::progress::ProgressEvent;
use crate::sizes::SizeSpec;

/// Render one progress event. Intermediate job counts are only shown at
/// milestones to keep batch output readable.
pub fn format_event(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::CacheHit { src } => Some(format!("{src}: cached")),
        ProgressEvent::GenerationStarted { src, total } => {
            Some(format!("{src}: generating {total} derivatives"))
        }
        ProgressEvent::JobFinished {
            completed, total, ..
        } => {
            if completed == total || completed % 4 == 0 {
                Some(format!("    {completed} of {total}"))
            } else {
                None
            }
        }
        ProgressEvent::ImageFinished { src, jobs } => {
            Some(format!("{src}: done ({jobs} encoded)"))
        }
    }
}

/// Print an event to stdout.
pub fn print_event(event: &ProgressEvent) {
    if let Some(line) = format_event(event) {
        println!("{line}");
    }
}

/// Render the published path table for one source image: per size the
/// native and modern paths, then the plain `<img>` fallback.
pub fn format_paths(path_prefix: &str, src: &str, sizes: &[SizeSpec]) -> Vec<String> {
    let mut lines = vec![format!("{}:", normalize_src(src))];
    for spec in sizes {
        lines.push(format!(
            "  {:<3} {:>5}px  {}",
            spec.suffix,
            spec.width,
            published_href(path_prefix, src, spec.suffix, Variant::Native)
        ));
        lines.push(format!(
            "               {}",
            published_href(path_prefix, src, spec.suffix, Variant::Modern)
        ));
    }
    lines.push(format!("  fallback     {}", fallback_href(path_prefix, src)));
    lines
}

/// Render a probed dimension result.
pub fn format_dimensions(src: &str, dims: Dimensions) -> String {
    format!("{src}: {dims}")
}
