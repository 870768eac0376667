//! Transcoding — the per-derivative encode pipeline.
//!
//! Each derivative goes through decode → resize → codec encode → lossy
//! recompress, all in memory. The module is split into:
//!
//! - **Parameters**: data describing one job and the layered compression
//!   options ([`params`])
//! - **Backend**: the [`ImageTranscoder`] trait seam (+ recording mock for
//!   tests) ([`backend`])
//! - **Codec**: the production implementation ([`codec`])

pub mod backend;
pub mod codec;
pub mod params;

pub use backend::{ImageTranscoder, TranscodeError, TranscodeStage};
pub use codec::CodecTranscoder;
pub use params::{CompressionOptions, Quality, ResolvedCompression, TranscodeJob};
