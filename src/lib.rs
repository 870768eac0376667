//! # Thumbsmith
//!
//! Responsive image derivative generator with a persistent on-disk cache.
//! Given a source image, thumbsmith produces resized copies at several
//! breakpoint widths, each in two variants — the image's native format
//! (JPEG/PNG) and WebP — and publishes them into a build output directory.
//! A durable cache directory survives across builds so identical derivatives
//! are never encoded twice.
//!
//! # Architecture: Validate, Then Generate
//!
//! Each request runs a strict two-phase protocol:
//!
//! ```text
//! 1. Validate   cache dir  →  hit?          (read-only, side-effect free)
//! 2. Generate   source     →  cache + dist  (the only phase that writes)
//! ```
//!
//! On a hit, cached files are copied into the publish directory (skip if
//! already there) and no codec runs. On a miss, every (width × variant) job
//! is encoded concurrently, written into the cache, and published. Cache
//! validity is all-or-nothing: one missing file regenerates the whole image.
//!
//! Concurrent requests for the *same* source are deduplicated by an
//! owner/follower protocol: the first caller generates, later callers block
//! until it finishes and observe the same outcome.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`sizes`] | default breakpoint table and positional width overrides |
//! | [`naming`] | derivative filenames, published paths, format families |
//! | [`store`] | filesystem cache: completeness check, write, publish-copy |
//! | [`transcode`] | decode → resize → encode → lossy recompress, behind a trait |
//! | [`coordinate`] | per-source in-flight ticket registry (owner/follower) |
//! | [`pipeline`] | orchestrator tying validation, fan-out, and publishing together |
//! | [`progress`] | progress event types and reporter seam |
//! | [`probe`] | image dimension resolution for local files and URLs |
//! | [`config`] | process-level configuration: `thumbsmith.toml` + env vars |
//! | [`output`] | CLI display formatting for progress events |
//!
//! # Design Decisions
//!
//! ## Two-Stage Encoding
//!
//! Every derivative is encoded twice: a codec-level encode (the `image`
//! crate, Lanczos3 resampling), then a lossy recompression pass through the
//! format's dedicated compressor — mozjpeg for JPEG, libimagequant for PNG,
//! libwebp for WebP. The codec encoder and the dedicated compressor produce
//! materially different byte sizes at the same quality setting, so the
//! second pass is mandatory, not an optimization.
//!
//! ## Name-Based Cache Keys
//!
//! Cache identity is `{basename}-{suffix}{ext}` — no content hash, no mtime.
//! Replacing a source image in place therefore reuses stale derivatives
//! until the cache is cleared. This is a deliberate compatibility choice;
//! [`store::InvalidationPolicy`] is the seam where a content-aware policy
//! would plug in.
//!
//! ## Pure-Rust-First Imaging
//!
//! Decode and resize go through the `image` crate. The recompression
//! collaborators are in-process library crates (statically linked), not
//! shelled-out binaries: no `apt install`, no PATH probing, one
//! self-contained binary.

pub mod config;
pub mod coordinate;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod sizes;
pub mod store;
pub mod transcode;
