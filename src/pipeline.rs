//! Pipeline orchestration: validate the cache, then generate what's missing.
//!
//! One [`ThumbnailPipeline::run`] call handles one source image end to end:
//!
//! 1. normalize the path and resolve the size table;
//! 2. claim the in-flight ticket (followers wait for the owner instead);
//! 3. ensure cache/publish directories exist;
//! 4. phase 1 — validate: if the cache holds the complete derivative set,
//!    publish-copy it and stop, no codec work;
//! 5. phase 2 — generate: read the source once, fan out one transcode job
//!    per (size × variant) across the rayon pool, write each result into
//!    the cache and publish it as it completes;
//! 6. fan in — one failed job fails the run (finished siblings stay in
//!    cache, each is independently valid);
//! 7. release the ticket, handing every follower the same outcome.
//!
//! The validation phase is read-only; writes only ever happen in phase 2,
//! and only after the completeness decision has been made, so a run never
//! consults cache state it is concurrently mutating. There is no
//! cancellation: a started run completes or fails.

use crate::config::Config;
use crate::coordinate::{CoordinationError, InFlightCoordinator, Role};
use crate::naming::{DerivativeKey, SourceImage, Variant};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::sizes::resolve_sizes;
use crate::store::{CacheStore, StoreError};
use crate::transcode::{CompressionOptions, ImageTranscoder, TranscodeError, TranscodeJob};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
    #[error(transparent)]
    Coordination(#[from] CoordinationError),
    #[error("source image not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("failed to read source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failure of a run this caller shared with other waiters.
    #[error("{0}")]
    Shared(Arc<PipelineError>),
}

/// One request: a source image plus optional per-request overrides.
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    /// Site-relative source path (leading `/` added if missing).
    pub src: String,
    /// Positional width overrides for the default size table.
    pub width_overrides: Option<Vec<u32>>,
    /// Per-request compression overrides, layered over the defaults.
    pub compression: CompressionOptions,
}

impl PipelineRequest {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }
}

/// What one run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Whether the cache already held the complete derivative set.
    pub cache_hit: bool,
    /// Number of transcode jobs executed (0 on a hit).
    pub jobs: u32,
}

/// Outcome shared between an owner and its followers.
pub type Outcome = Result<RunReport, Arc<PipelineError>>;

/// Orchestrator for derivative generation. One instance serves a whole
/// build; it is Sync and can be driven from many threads at once.
pub struct ThumbnailPipeline<T: ImageTranscoder> {
    config: Config,
    store: CacheStore,
    transcoder: T,
    in_flight: InFlightCoordinator<Outcome>,
}

impl<T: ImageTranscoder> ThumbnailPipeline<T> {
    pub fn new(config: Config, transcoder: T) -> Self {
        let store = CacheStore::new(config.cache_dir.clone(), config.publish_dir.clone());
        Self {
            config,
            store,
            transcoder,
            in_flight: InFlightCoordinator::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ensure every derivative of the requested image exists in the cache
    /// and the publish directory.
    ///
    /// Concurrent calls for the same source are served by a single
    /// generation run; every caller gets that run's outcome.
    pub fn run(
        &self,
        request: &PipelineRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunReport, PipelineError> {
        let image = SourceImage::resolve(&request.src);
        let gate = PathBuf::from(&image.src);

        match self.in_flight.begin(&gate) {
            Role::Follower(waiter) => waiter.wait().map_err(PipelineError::Shared),
            Role::Owner => {
                let result = self.generate(&image, request, reporter);
                let (outcome, returned) = match result {
                    Ok(report) => (Ok(report), Ok(report)),
                    Err(e) => {
                        let shared = Arc::new(e);
                        (
                            Err(Arc::clone(&shared)),
                            Err(PipelineError::Shared(shared)),
                        )
                    }
                };
                self.in_flight.end(&gate, outcome)?;
                returned
            }
        }
    }

    fn generate(
        &self,
        image: &SourceImage,
        request: &PipelineRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunReport, PipelineError> {
        let sizes = resolve_sizes(request.width_overrides.as_deref());
        self.store.ensure_directories()?;

        // Phase 1 — validate. publish() only copies when the cache holds
        // the complete set, so a miss leaves the output untouched.
        if self.store.publish(image, &sizes)? {
            reporter.report(ProgressEvent::CacheHit {
                src: image.src.clone(),
            });
            return Ok(RunReport {
                cache_hit: true,
                jobs: 0,
            });
        }

        // Phase 2 — generate. Whole-image invalidation: every size and
        // variant is re-encoded, including ones still present in cache.
        let path = image.local_path(Path::new(&self.config.source_prefix));
        let source = Arc::new(std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                PipelineError::SourceNotFound(path.clone())
            } else {
                PipelineError::SourceRead {
                    path: path.clone(),
                    source,
                }
            }
        })?);

        let options = request.compression.resolve();
        let jobs: Vec<(DerivativeKey, u32)> = sizes
            .iter()
            .flat_map(|spec| {
                [
                    (image.key(spec.suffix, Variant::Native), spec.width),
                    (image.key(spec.suffix, Variant::Modern), spec.width),
                ]
            })
            .collect();
        let total = jobs.len() as u32;
        reporter.report(ProgressEvent::GenerationStarted {
            src: image.src.clone(),
            total,
        });

        let completed = AtomicU32::new(0);
        jobs.par_iter()
            .try_for_each(|(key, width)| -> Result<(), PipelineError> {
                let encoded = self.transcoder.transcode(&TranscodeJob {
                    source: Arc::clone(&source),
                    width: *width,
                    variant: key.variant,
                    family: key.target_family(),
                    options,
                })?;
                // write happens-before publish for each key; keys are
                // partitioned by (size, variant), so jobs never collide.
                self.store.write(key, &encoded)?;
                self.store.publish_one(key)?;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                reporter.report(ProgressEvent::JobFinished {
                    src: image.src.clone(),
                    completed: done,
                    total,
                });
                Ok(())
            })?;

        reporter.report(ProgressEvent::ImageFinished {
            src: image.src.clone(),
            jobs: total,
        });
        Ok(RunReport {
            cache_hit: false,
            jobs: total,
        })
    }
}
