//! Filesystem-backed derivative cache and publish directory.
//!
//! The cache directory is the durable side: derivative files written there
//! survive across builds (and across CI runs when the cache dir is on the
//! provider's build cache). The publish directory is the build output;
//! publishing is a copy from cache to output, skipped when the destination
//! already exists.
//!
//! ## Validity Policy
//!
//! Cache validity is checked per *image*, not per file:
//! [`InvalidationPolicy::WholeImage`] requires every native/modern pair at
//! every size to exist. One missing file regenerates all `2 × |sizes|`
//! derivatives for that image, including the ones that were still present.
//! This inefficiency is an explicit, named policy rather than an accident of
//! checking inside a loop, so a per-artifact policy can replace it without
//! touching orchestration.
//!
//! ## Failure Semantics
//!
//! Filesystem errors propagate as [`StoreError`]; the store never retries.

use crate::naming::{DerivativeKey, SourceImage, Variant};
use crate::sizes::SizeSpec;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// How cache completeness is judged for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationPolicy {
    /// Any missing derivative invalidates the image's whole set.
    #[default]
    WholeImage,
}

/// Filesystem store for derivative artifacts.
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_root: PathBuf,
    publish_root: PathBuf,
    policy: InvalidationPolicy,
}

impl CacheStore {
    pub fn new(cache_root: PathBuf, publish_root: PathBuf) -> Self {
        Self {
            cache_root,
            publish_root,
            policy: InvalidationPolicy::default(),
        }
    }

    pub fn policy(&self) -> InvalidationPolicy {
        self.policy
    }

    /// Cache-side path of a derivative.
    pub fn cache_path(&self, key: &DerivativeKey) -> PathBuf {
        self.cache_root.join(key.filename())
    }

    /// Publish-side path of a derivative (same filename, different root).
    pub fn publish_path(&self, key: &DerivativeKey) -> PathBuf {
        self.publish_root.join(key.filename())
    }

    /// Create cache and publish roots (with parents). Idempotent; called
    /// once per run before any write.
    pub fn ensure_directories(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.cache_root)
            .map_err(|e| StoreError::io(&self.cache_root, e))?;
        std::fs::create_dir_all(&self.publish_root)
            .map_err(|e| StoreError::io(&self.publish_root, e))?;
        Ok(())
    }

    /// Whether every derivative of `image` at every size exists in cache,
    /// in both variants.
    pub fn is_complete(&self, image: &SourceImage, sizes: &[SizeSpec]) -> bool {
        match self.policy {
            InvalidationPolicy::WholeImage => self
                .keys(image, sizes)
                .all(|key| self.cache_path(&key).exists()),
        }
    }

    /// Copy the image's cached derivatives into the publish directory.
    ///
    /// Returns `true` only when the cache held the complete set (the
    /// cache-hit signal). Incomplete sets copy nothing: existence is checked
    /// for all files before the first copy, keeping the validation phase
    /// free of side effects when it fails.
    ///
    /// Each copy is skipped when its own destination already exists, so a
    /// second publish of the same set is a no-op.
    pub fn publish(&self, image: &SourceImage, sizes: &[SizeSpec]) -> Result<bool, StoreError> {
        if !self.is_complete(image, sizes) {
            return Ok(false);
        }
        for key in self.keys(image, sizes) {
            self.publish_one(&key)?;
        }
        Ok(true)
    }

    /// Copy one cached derivative to its publish path unless already
    /// present. Returns whether a copy happened. Never overwrites.
    pub fn publish_one(&self, key: &DerivativeKey) -> Result<bool, StoreError> {
        let dest = self.publish_path(key);
        if dest.exists() {
            return Ok(false);
        }
        let src = self.cache_path(key);
        std::fs::copy(&src, &dest).map_err(|e| StoreError::io(&dest, e))?;
        Ok(true)
    }

    /// Persist encoded bytes at the derivative's cache path. Overwrite is
    /// allowed: a regeneration always supersedes prior content for the same
    /// key.
    pub fn write(&self, key: &DerivativeKey, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.cache_path(key);
        std::fs::write(&path, bytes).map_err(|e| StoreError::io(&path, e))
    }

    /// All derivative keys of an image over a size table, native and modern.
    fn keys<'a>(
        &self,
        image: &'a SourceImage,
        sizes: &'a [SizeSpec],
    ) -> impl Iterator<Item = DerivativeKey> + 'a {
        sizes.iter().flat_map(move |spec| {
            [
                image.key(spec.suffix, Variant::Native),
                image.key(spec.suffix, Variant::Modern),
            ]
        })
    }
}

/// Per-run cache effectiveness counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u32,
    pub generated: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn generate(&mut self) {
        self.generated += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.generated
    }
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.generated,
                self.total()
            )
        } else {
            write!(f, "{} generated", self.generated)
        }
    }
}
