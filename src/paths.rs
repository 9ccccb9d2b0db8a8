//! Content paths and the URLs they publish under.
//!
//! Every entry in the content tree has a `/`-separated path relative to the
//! content root. This module maps those paths into the three URL spaces the
//! site uses:
//!
//! | Entry | Path | URL |
//! |-------|------|-----|
//! | Document | `notes/rust.md` | `/notes/rust` |
//! | Root index | `index.md` | `/` |
//! | Directory | `notes` | `/notes/` |
//! | Asset | `notes/img/a b.png` | `/static/notes-img-a-u0020b.png` |
//!
//! Assets are flattened into a single `static/` directory, so the path
//! separator becomes `-` and anything outside `[A-Za-z0-9._-]` is spelled
//! out as `-uXXXX`.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

use crate::assets::AssetPipeline;
use crate::types::{ContentNode, NodeKind};

/// Extensions (lowercase) that make a file a markdown document.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Flatten a content path into a single static file name.
pub fn sanitize_filename(path: &str) -> String {
    let mut sanitized = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '/' | '\\' => sanitized.push('-'),
            c if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') => sanitized.push(c),
            c => sanitized.push_str(&format!("-u{:04x}", c as u32)),
        }
    }
    sanitized
}

/// URL an asset is published under, before any format rewrite.
pub fn static_url(path: &str) -> String {
    format!("/static/{}", sanitize_filename(path))
}

/// Strip a markdown extension (case-insensitive), if present.
pub fn strip_document_extension(path: &str) -> Option<&str> {
    let (stem, ext) = path.rsplit_once('.')?;
    if stem.is_empty() || stem.ends_with('/') || ext.contains('/') {
        return None;
    }
    DOCUMENT_EXTENSIONS
        .iter()
        .any(|d| ext.eq_ignore_ascii_case(d))
        .then_some(stem)
}

/// Page URL of a document. The root `index.md` is served at `/`.
pub fn document_url(path: &str) -> String {
    let stem = strip_document_extension(path).unwrap_or(path);
    if stem == "index" {
        "/".to_string()
    } else {
        format!("/{stem}")
    }
}

/// URL of a directory listing.
pub fn dir_url(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        format!("/{path}/")
    }
}

/// URL a node is linked under from listings and the file tree.
pub fn node_url(node: &ContentNode, assets: &AssetPipeline) -> String {
    match node.kind {
        NodeKind::Document => document_url(&node.path),
        NodeKind::Directory => dir_url(&node.path),
        NodeKind::Image | NodeKind::OtherAsset => {
            assets.rewrite(&static_url(&node.path)).into_owned()
        }
    }
}

/// Directory part of a content path (`""` for top-level entries).
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Final component of a content path without its extension.
pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Split a reference into its path and the `?query#fragment` suffix.
pub fn split_suffix(reference: &str) -> (&str, &str) {
    match reference.find(['?', '#']) {
        Some(i) => reference.split_at(i),
        None => (reference, ""),
    }
}

/// Whether a link target leaves the site.
pub fn is_external(target: &str) -> bool {
    if target.starts_with("//") {
        return true;
    }
    let lower = target.to_ascii_lowercase();
    if ["mailto:", "tel:", "data:"].iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    match target.find("://") {
        Some(i) => target[..i]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        None => false,
    }
}

/// Resolve `target` against `base_dir` into a normalized content path.
///
/// A leading `/` resolves from the content root. `.` segments are dropped
/// and `..` pops a segment. Returns `None` if the path climbs above the
/// root. `%XX` escapes are decoded; a target that does not decode to
/// UTF-8 is used as written.
pub fn resolve_relative(base_dir: &str, target: &str) -> Option<String> {
    let decoded = percent_decode_str(target)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_else(|_| target.to_string());
    let mut segments: Vec<&str> = Vec::new();
    let rest = match decoded.strip_prefix('/') {
        Some(rest) => rest,
        None => {
            segments.extend(base_dir.split('/').filter(|s| !s.is_empty()));
            decoded.as_str()
        }
    };
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }
    Some(segments.join("/"))
}
