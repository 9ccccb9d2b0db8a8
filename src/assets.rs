//! Image reference rewriting.
//!
//! When `images.compress_to_webp` is on, every reference to a `.jpg`,
//! `.jpeg` or `.png` file (case-insensitive) is pointed at the `.webp`
//! variant that [`encode`](crate::encode) writes next to it. The decision is
//! made from the extension alone; file contents are never inspected. With
//! the flag off every reference passes through unchanged.
//!
//! Lazy-load placeholders live in `static/lazy/` under the same file name as
//! the (possibly rewritten) asset.

use std::borrow::Cow;

use crate::config::ImagesConfig;
use crate::paths;
use crate::types::{AssetRewrite, ContentNode, NodeKind};

/// Extensions (lowercase) that have a WebP variant and a placeholder.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// URL prefix of lazy-load placeholders.
pub const PLACEHOLDER_PREFIX: &str = "/static/lazy/";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetPipeline {
    compress_to_webp: bool,
}

impl AssetPipeline {
    pub fn new(compress_to_webp: bool) -> Self {
        Self { compress_to_webp }
    }

    pub fn from_config(config: &ImagesConfig) -> Self {
        Self::new(config.compress_to_webp)
    }

    pub fn compress_to_webp(&self) -> bool {
        self.compress_to_webp
    }

    /// What a page should reference instead of `reference`.
    ///
    /// Query strings and fragments are carried over.
    pub fn rewrite<'r>(&self, reference: &'r str) -> Cow<'r, str> {
        if !self.compress_to_webp {
            return Cow::Borrowed(reference);
        }
        let (path, suffix) = paths::split_suffix(reference);
        match recognized_extension_start(path) {
            Some(dot) => Cow::Owned(format!("{}.webp{}", &path[..dot], suffix)),
            None => Cow::Borrowed(reference),
        }
    }

    pub fn rewrite_entry(&self, reference: &str) -> AssetRewrite {
        AssetRewrite {
            original: reference.to_string(),
            replacement: self.rewrite(reference).into_owned(),
        }
    }

    /// Rewrites for every image entry of a directory listing, in listing order.
    pub fn rewrites(&self, listing: &[ContentNode]) -> Vec<AssetRewrite> {
        listing
            .iter()
            .filter(|node| node.kind == NodeKind::Image)
            .map(|node| self.rewrite_entry(&node.path))
            .collect()
    }

    /// Placeholder URL for an image reference, if it gets one.
    ///
    /// Only recognized formats have placeholders generated for them.
    pub fn placeholder_url(&self, reference: &str) -> Option<String> {
        let (path, _) = paths::split_suffix(reference);
        recognized_extension_start(path)?;
        let rewritten = self.rewrite(path);
        let name = rewritten.rsplit('/').next().unwrap_or(&rewritten);
        Some(format!("{PLACEHOLDER_PREFIX}{name}"))
    }
}

/// Whether a reference names one of the [`RECOGNIZED_EXTENSIONS`].
pub fn is_recognized(reference: &str) -> bool {
    let (path, _) = paths::split_suffix(reference);
    recognized_extension_start(path).is_some()
}

/// Byte offset of the `.` before a recognized extension in the final path
/// component.
fn recognized_extension_start(path: &str) -> Option<usize> {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let dot = path[name_start..].rfind('.')? + name_start;
    if dot == name_start {
        return None;
    }
    let ext = &path[dot + 1..];
    RECOGNIZED_EXTENSIONS
        .iter()
        .any(|r| ext.eq_ignore_ascii_case(r))
        .then_some(dot)
}
