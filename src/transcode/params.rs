//! Parameter types for transcode operations.
//!
//! These structs describe *what* to encode, not *how*. They are the
//! interface between the [`pipeline`](crate::pipeline) (which decides which
//! derivatives to create) and the [`backend`](super::backend) (which does
//! the pixel work), so a mock backend can stand in during tests without
//! touching orchestration.
//!
//! ## Option Layering
//!
//! Compression options are merged from three ordered layers, later layers
//! winning per field:
//!
//! 1. global defaults — `quality=70`, `png_speed=1`, `png_dithering=1.0`,
//!    `jpeg_progressive=true`
//! 2. the production base — `lossless=true` (applies to the codec-level
//!    WebP encode only; the recompression pass is always lossy)
//! 3. the request's overrides
//!
//! A request can therefore switch `lossless` off, and any unset request
//! field falls through to the layer below.

use crate::naming::{FormatFamily, Variant};
use std::sync::Arc;

/// Lossy encoding quality (1–100), clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(70)
    }
}

/// Caller-supplied compression overrides. Unset fields fall through to the
/// defaults documented in the [module docs](self).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressionOptions {
    pub quality: Option<u32>,
    pub lossless: Option<bool>,
    pub png_speed: Option<i32>,
    pub png_dithering: Option<f32>,
    pub jpeg_progressive: Option<bool>,
}

impl CompressionOptions {
    /// Merge the three option layers into concrete values.
    pub fn resolve(&self) -> ResolvedCompression {
        ResolvedCompression {
            quality: Quality::new(self.quality.unwrap_or(70)),
            lossless: self.lossless.unwrap_or(true),
            png_speed: self.png_speed.unwrap_or(1),
            png_dithering: self.png_dithering.unwrap_or(1.0),
            jpeg_progressive: self.jpeg_progressive.unwrap_or(true),
        }
    }
}

/// Fully-merged compression settings passed to every transcode job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCompression {
    pub quality: Quality,
    pub lossless: bool,
    pub png_speed: i32,
    pub png_dithering: f32,
    pub jpeg_progressive: bool,
}

impl ResolvedCompression {
    /// Quantization quality band for the PNG recompression pass.
    ///
    /// The quality value maps to a `[q, min(q+20, 100)]` range — a
    /// tolerance band, not a single target: the quantizer may stop anywhere
    /// inside it.
    pub fn png_quality_range(self) -> (u8, u8) {
        let q = self.quality.value() as u8;
        (q, q.saturating_add(20).min(100))
    }
}

/// One unit of encode work: produce a single derivative from the already
/// loaded source bytes.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    /// Raw source file bytes, shared across the image's jobs.
    pub source: Arc<Vec<u8>>,
    /// Target width upper bound; never exceeded, never upscaled to.
    pub width: u32,
    pub variant: Variant,
    /// Target encoding family (the source's family, or WebP for Modern).
    pub family: FormatFamily,
    pub options: ResolvedCompression,
}
