//! Process-level configuration.
//!
//! Read once at startup from three layers, later layers winning:
//!
//! 1. built-in defaults
//! 2. an optional `thumbsmith.toml` in the project root
//! 3. environment variables
//!
//! Environment variables:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `THUMBSMITH_PATH_PREFIX` | prefix prepended to published URL paths |
//! | `THUMBSMITH_SRC_PREFIX` | directory source paths are resolved under |
//! | `THUMBSMITH_CACHE_DIR` | cache directory location |
//! | `DEPLOY_URL` | when set (CI deploys), the cache moves to the fixed build-cache path so it survives across CI runs |

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config filename looked up in the project root.
const CONFIG_FILENAME: &str = "thumbsmith.toml";

/// Cache location used on CI deploys (persisted between builds by the
/// provider's build-cache mechanism).
const CI_CACHE_DIR: &str = "/opt/build/cache/thumbsmith";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Resolved configuration for one process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Prefix prepended to every published URL path (e.g. `/my-site`).
    pub path_prefix: String,
    /// Directory that site-relative source paths resolve under.
    pub source_prefix: String,
    /// Durable cache directory, reused across builds.
    pub cache_dir: PathBuf,
    /// Output directory published derivatives are copied into.
    pub publish_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path_prefix: String::new(),
            source_prefix: "src/site".to_string(),
            cache_dir: PathBuf::from(".cache"),
            publish_dir: PathBuf::from("dist/img/compressed"),
        }
    }
}

impl Config {
    /// Load configuration for a project root: defaults, then
    /// `thumbsmith.toml` if present, then environment variables.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(project_root)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Defaults merged with `thumbsmith.toml` if the file exists.
    fn from_file(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(CONFIG_FILENAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Apply environment overrides through a lookup function (injected so
    /// tests don't mutate the process environment).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(prefix) = lookup("THUMBSMITH_PATH_PREFIX") {
            self.path_prefix = prefix;
        }
        if let Some(prefix) = lookup("THUMBSMITH_SRC_PREFIX") {
            self.source_prefix = prefix;
        }
        // A deploy URL marks a CI build: pin the cache to the provider's
        // persisted build-cache directory unless explicitly overridden.
        if lookup("DEPLOY_URL").is_some() {
            self.cache_dir = PathBuf::from(CI_CACHE_DIR);
        }
        if let Some(dir) = lookup("THUMBSMITH_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
    }

    /// Filesystem path a site-relative source path resolves to.
    pub fn source_path(&self, src: &str) -> PathBuf {
        Path::new(&self.source_prefix).join(src.trim_start_matches('/'))
    }
}

/// A documented stock `thumbsmith.toml` with every option at its default.
pub fn stock_config_toml() -> String {
    r##"# thumbsmith configuration
# Place this file in the directory you run thumbsmith from.

# Prefix prepended to every published URL path (for sites served under a
# sub-path, e.g. "/my-site").
path_prefix = ""

# Directory that site-relative source paths resolve under:
# "/img/photo.jpg" is read from "{source_prefix}/img/photo.jpg".
source_prefix = "src/site"

# Durable cache directory, reused across builds. On CI deploys (DEPLOY_URL
# set) this moves to /opt/build/cache/thumbsmith automatically.
cache_dir = ".cache"

# Output directory published derivatives are copied into.
publish_dir = "dist/img/compressed"
"##
    .to_string()
}
