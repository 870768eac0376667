//! Centralized naming for derivative files and published paths.
//!
//! Cache identity is purely name-based: a derivative is addressed by
//! `(base name, size suffix, variant, source extension)` and nothing else.
//! The same filename is used under the cache root and the publish root, so
//! every path the system touches is derived from the functions in this
//! module.
//!
//! ## Filename Contract
//!
//! ```text
//! photo.jpg  →  photo-sm.jpg           (native variant, suffix "sm")
//!            →  photo-modern-sm.webp   (modern variant, suffix "sm")
//! ```
//!
//! The source extension is carried verbatim (case included) so cache files
//! line up with whatever the content directory uses.

use std::path::{Path, PathBuf};

/// Whether a derivative keeps the source's format family or is WebP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Source's own format family (jpeg or png).
    Native,
    /// Always WebP, regardless of source family.
    Modern,
}

/// Encoding family selected by a source extension.
///
/// `.png` selects PNG; every other extension is treated as the jpeg-like
/// family (`jpg`, `jpeg`, `JPEG`, ...). WebP only appears as the target of
/// the modern variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    Jpeg,
    Png,
    WebP,
}

impl FormatFamily {
    /// Map a file extension (with or without the leading dot) to its family.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        if ext.eq_ignore_ascii_case("png") {
            FormatFamily::Png
        } else if ext.eq_ignore_ascii_case("webp") {
            FormatFamily::WebP
        } else {
            FormatFamily::Jpeg
        }
    }
}

impl std::fmt::Display for FormatFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatFamily::Jpeg => write!(f, "jpeg"),
            FormatFamily::Png => write!(f, "png"),
            FormatFamily::WebP => write!(f, "webp"),
        }
    }
}

/// Ensure a site-relative source path starts with `/`.
pub fn normalize_src(src: &str) -> String {
    if src.starts_with('/') {
        src.to_string()
    } else {
        format!("/{src}")
    }
}

/// One logical source image, resolved from a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    /// Normalized site-relative path (leading `/`).
    pub src: String,
    /// Filename without directory or extension.
    pub base_name: String,
    /// Extension including the leading dot, verbatim. Empty if none.
    pub extension: String,
    /// Native encoding family selected by the extension.
    pub family: FormatFamily,
}

impl SourceImage {
    /// Resolve a request path into its naming parts.
    ///
    /// ```
    /// # use thumbsmith::naming::{SourceImage, FormatFamily};
    /// let img = SourceImage::resolve("img/photo.JPG");
    /// assert_eq!(img.src, "/img/photo.JPG");
    /// assert_eq!(img.base_name, "photo");
    /// assert_eq!(img.extension, ".JPG");
    /// assert_eq!(img.family, FormatFamily::Jpeg);
    /// ```
    pub fn resolve(src: &str) -> Self {
        let src = normalize_src(src);
        let path = Path::new(&src);
        let base_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let family = FormatFamily::from_extension(&extension);
        Self {
            src,
            base_name,
            extension,
            family,
        }
    }

    /// Absolute (or root-relative) filesystem path of the source file.
    pub fn local_path(&self, source_root: &Path) -> PathBuf {
        source_root.join(self.src.trim_start_matches('/'))
    }

    /// Derivative key for one (suffix, variant) pair of this image.
    pub fn key(&self, suffix: &'static str, variant: Variant) -> DerivativeKey {
        DerivativeKey {
            base_name: self.base_name.clone(),
            extension: self.extension.clone(),
            suffix,
            variant,
        }
    }
}

/// Deterministic address of one derivative artifact.
///
/// The same key yields the same filename under both the cache root and the
/// publish root; only the directory differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeKey {
    pub base_name: String,
    /// Source extension with leading dot (used by the native variant only).
    pub extension: String,
    pub suffix: &'static str,
    pub variant: Variant,
}

impl DerivativeKey {
    /// Filename of this derivative.
    pub fn filename(&self) -> String {
        match self.variant {
            Variant::Native => format!("{}-{}{}", self.base_name, self.suffix, self.extension),
            Variant::Modern => format!("{}-modern-{}.webp", self.base_name, self.suffix),
        }
    }

    /// Encoding family this derivative is produced in.
    pub fn target_family(&self) -> FormatFamily {
        match self.variant {
            Variant::Native => FormatFamily::from_extension(&self.extension),
            Variant::Modern => FormatFamily::WebP,
        }
    }
}

/// Public URL path of a published derivative, as consumed by markup
/// generators: `{path_prefix}{dir}/compressed/{filename}`.
pub fn published_href(path_prefix: &str, src: &str, suffix: &'static str, variant: Variant) -> String {
    let image = SourceImage::resolve(src);
    let dir = Path::new(&image.src)
        .parent()
        .and_then(|p| p.to_str())
        .unwrap_or("");
    let key = image.key(suffix, variant);
    format!("{path_prefix}{dir}/compressed/{}", key.filename())
}

/// Public URL path of the small native derivative, used as the plain `<img>`
/// fallback when no srcset applies.
pub fn fallback_href(path_prefix: &str, src: &str) -> String {
    published_href(path_prefix, src, "sm", Variant::Native)
}
