//! Shared types passed between pipeline components.
//!
//! The scanner produces [`ContentNode`]s, the markdown processor produces
//! [`TocEntry`]s, the backlink indexer produces [`BacklinkEntry`]s, and the
//! site builder composes all of them into a [`SiteIndexView`]. Everything a
//! template can see is `Serialize`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What a scanned entry is, decided by extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Document,
    Image,
    OtherAsset,
    Directory,
}

/// One entry in the scanned content tree.
///
/// `path` is relative to the content root, `/`-separated and includes the
/// file extension. The root directory has an empty path. Children are
/// stored in listing order: directories first, then case-insensitive name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentNode {
    pub path: String,
    pub kind: NodeKind,
    /// Display name: front matter title for documents, file name otherwise.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentNode>,
}

impl ContentNode {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Final path component (the root has none).
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// Look up a descendant by its relative path. `""` is the node itself.
    pub fn find(&self, path: &str) -> Option<&ContentNode> {
        if path.is_empty() {
            return Some(self);
        }
        let mut current = self;
        let mut walked = String::new();
        for segment in path.split('/') {
            if !walked.is_empty() {
                walked.push('/');
            }
            walked.push_str(segment);
            current = current.children.iter().find(|c| c.path == walked)?;
        }
        Some(current)
    }

    /// Depth-first iterator over this node and every descendant.
    pub fn walk(&self) -> impl Iterator<Item = &ContentNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// A heading in a document's outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level, 1 for `#`.
    pub level: u8,
    /// Anchor id, unique within the document.
    pub id: String,
    pub title: String,
}

/// A reference to the current page from another document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklinkEntry {
    /// URL of the linking document.
    pub path: String,
    pub title: String,
}

/// One image reference and what pages should point at instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRewrite {
    pub original: String,
    pub replacement: String,
}

/// A row in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingItem {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A document after markdown rendering.
#[derive(Debug, Clone)]
pub struct Document {
    /// Content-relative path including extension (`notes/a.md`).
    pub path: String,
    /// Page URL (`/notes/a`, or `/` for the root index).
    pub url: String,
    pub title: String,
    pub source: String,
    pub html: String,
    pub toc: Vec<TocEntry>,
    /// Outbound internal link targets as content paths, in first-seen order.
    pub links: Vec<String>,
    pub has_images: bool,
    pub date: Option<String>,
    pub description: Option<String>,
}

/// Template context for a directory page.
#[derive(Debug, Serialize)]
pub struct ListingView<'a> {
    pub dir_path: String,
    pub items: Vec<ListingItem>,
    pub file_tree: &'a str,
    pub comments: &'a BTreeMap<String, String>,
}

/// Template context for a document page.
#[derive(Debug, Serialize)]
pub struct ContentView<'a> {
    pub title: &'a str,
    /// Rendered HTML body.
    pub markdown: &'a str,
    pub table_of_contents: &'a [TocEntry],
    pub backlinks: &'a [BacklinkEntry],
    pub file_tree: &'a str,
    pub has_images: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub comments: &'a BTreeMap<String, String>,
}

/// The view model handed to the template layer for one page.
#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum SiteIndexView<'a> {
    Listing(ListingView<'a>),
    Content(ContentView<'a>),
}

/// Category of a recovered failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A subtree or entry was unreadable and left out of the tree.
    Scan,
    /// Input was malformed and emitted literally or ignored.
    ParseDegraded,
    /// An internal link pointed at a document that does not exist.
    DanglingLink,
}

/// A non-fatal problem found during a generation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Content-relative path the problem was found in.
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            DiagnosticKind::Scan => "scan",
            DiagnosticKind::ParseDegraded => "degraded",
            DiagnosticKind::DanglingLink => "dangling link",
        };
        write!(f, "{label}: {}: {}", self.path, self.message)
    }
}
