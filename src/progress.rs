//! Progress reporting seam between the pipeline and the CLI.
//!
//! The pipeline emits [`ProgressEvent`]s through a [`ProgressReporter`];
//! how they are displayed is not its concern. The CLI wires a
//! [`ChannelReporter`] to a printer thread (see `main.rs`); tests collect
//! events in memory; library embedders can pass [`NullReporter`].

use std::sync::mpsc::Sender;

/// Lifecycle events of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The cache held the full derivative set; nothing to encode.
    CacheHit { src: String },
    /// Generation started with `total` transcode jobs queued.
    GenerationStarted { src: String, total: u32 },
    /// One transcode job finished (`completed` of `total`).
    JobFinished {
        src: String,
        completed: u32,
        total: u32,
    },
    /// All jobs finished and the derivatives are published.
    ImageFinished { src: String, jobs: u32 },
}

/// Observer the pipeline reports job start/advance/completion to.
pub trait ProgressReporter: Sync {
    fn report(&self, event: ProgressEvent);
}

/// Reporter that discards every event.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _event: ProgressEvent) {}
}

/// Reporter that forwards events over an mpsc channel.
///
/// A dropped receiver silently ends reporting; progress display must never
/// fail a build.
pub struct ChannelReporter {
    tx: Sender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new(tx: Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}
