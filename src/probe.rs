//! Intrinsic dimension probing for local and remote sources.
//!
//! Markup generators need the source's pixel dimensions (for
//! `width`/`height` attributes) without decoding the full image. Local
//! sources are probed from the file header; `http(s)://` sources are
//! downloaded and probed in memory.

use crate::config::Config;
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("cannot determine dimensions of {location}: {source}")]
    Unreadable {
        location: String,
        #[source]
        source: image::ImageError,
    },
}

/// Intrinsic pixel dimensions of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

/// Resolve the intrinsic dimensions of `src`.
///
/// Site-relative paths are read under the configured source prefix;
/// `http(s)://` URLs are fetched with a blocking GET. Only the image
/// header is parsed, never the full pixel data.
pub fn resolve_dimensions(config: &Config, src: &str) -> Result<Dimensions, ProbeError> {
    if is_remote(src) {
        return remote_dimensions(src);
    }
    let path = config.source_path(src);
    let (width, height) =
        image::image_dimensions(&path).map_err(|source| ProbeError::Unreadable {
            location: path.display().to_string(),
            source,
        })?;
    Ok(Dimensions { width, height })
}

fn remote_dimensions(url: &str) -> Result<Dimensions, ProbeError> {
    let download = |source| ProbeError::Download {
        url: url.to_string(),
        source,
    };
    let bytes = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.bytes())
        .map_err(download)?;

    let unreadable = |source| ProbeError::Unreadable {
        location: url.to_string(),
        source,
    };
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| unreadable(image::ImageError::IoError(e)))?;
    let (width, height) = reader.into_dimensions().map_err(unreadable)?;
    Ok(Dimensions { width, height })
}
