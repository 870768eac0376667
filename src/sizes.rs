//! Breakpoint size table for derivative generation.
//!
//! Every source image is rendered at each width in the table, in both the
//! native and the WebP variant. Callers may override widths positionally
//! (entry 0 of the override list replaces the width of the first table
//! entry, and so on) while the suffix labels stay fixed — the labels are
//! part of the cache filename contract and must not drift between runs.
//!
//! All functions here are pure; no I/O.

/// One named breakpoint: a target width and the filename suffix it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeSpec {
    /// Target width in pixels (upper bound — images are never upscaled).
    pub width: u32,
    /// Filename suffix label, unique within the table.
    pub suffix: &'static str,
}

/// Default breakpoint table: `sm=250, md=500, lg=800, hd=1368`.
pub const DEFAULT_SIZES: [SizeSpec; 4] = [
    SizeSpec {
        width: 250,
        suffix: "sm",
    },
    SizeSpec {
        width: 500,
        suffix: "md",
    },
    SizeSpec {
        width: 800,
        suffix: "lg",
    },
    SizeSpec {
        width: 1368,
        suffix: "hd",
    },
];

/// Resolve the effective size table for one request.
///
/// `overrides` replaces widths by position; entries beyond its length keep
/// their default width. An override longer than the table is truncated to
/// the table length — there is no error path, mirroring the permissive
/// caller contract.
///
/// ```
/// # use thumbsmith::sizes::resolve_sizes;
/// let sizes = resolve_sizes(Some(&[300]));
/// assert_eq!(sizes[0].width, 300);
/// assert_eq!(sizes[0].suffix, "sm");
/// assert_eq!(sizes[1].width, 500);
/// ```
pub fn resolve_sizes(overrides: Option<&[u32]>) -> Vec<SizeSpec> {
    let mut sizes = DEFAULT_SIZES.to_vec();
    if let Some(widths) = overrides {
        for (spec, &w) in sizes.iter_mut().zip(widths.iter()) {
            spec.width = w;
        }
    }
    sizes
}
