//! Content tree scanning.
//!
//! First stage of a generation pass. Walks the content root and produces a
//! [`ContentNode`] tree plus the raw text of every document, so later
//! stages never touch the filesystem again.
//!
//! ```text
//! content/
//! ├── config.toml          # site config, not content
//! ├── index.md             # Document
//! ├── .drafts/             # hidden, skipped
//! ├── garden/              # Directory (listed before files)
//! │   ├── roses.md         # Document
//! │   └── roses.JPG        # Image
//! └── notes.pdf            # OtherAsset
//! ```
//!
//! ## Classification
//!
//! By extension, case-insensitive: `md`/`markdown` are documents,
//! `jpg`/`jpeg`/`png`/`gif`/`webp` are images, anything else is an other
//! asset.
//!
//! ## Ordering
//!
//! Within a directory: subdirectories first, then case-insensitive file
//! name, ties broken by exact byte order. The OS iteration order never
//! leaks into the tree.
//!
//! ## Failure handling
//!
//! Symlinks are followed. A directory whose canonical path is already on
//! the current ancestor chain is a cycle and is dropped. Unreadable
//! directories and files are dropped as well. Each drop leaves a
//! [`DiagnosticKind::Scan`] diagnostic; only a root that cannot be read
//! fails the scan.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::config::CONFIG_FILENAME;
use crate::frontmatter;
use crate::paths::{self, DOCUMENT_EXTENSIONS};
use crate::types::{ContentNode, Diagnostic, DiagnosticKind, NodeKind};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Content root is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Cannot read content root {path}: {source}")]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Output of a scan.
#[derive(Debug)]
pub struct ContentTree {
    pub root: ContentNode,
    /// Document path → raw text as read from disk.
    pub sources: BTreeMap<String, String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scan the content root into a tree.
pub fn scan(root: &Path) -> Result<ContentTree, ScanError> {
    let metadata = fs::metadata(root).map_err(|source| ScanError::Root {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    let canonical = fs::canonicalize(root)?;

    let mut scanner = Scanner {
        sources: BTreeMap::new(),
        diagnostics: Vec::new(),
    };
    let children = scanner
        .scan_directory(root, "", &mut vec![canonical])
        .map_err(|e| ScanError::Root {
            path: root.to_path_buf(),
            source: e.into(),
        })?;

    let tree = ContentTree {
        root: ContentNode {
            path: String::new(),
            kind: NodeKind::Directory,
            name: String::new(),
            date: None,
            description: None,
            children,
        },
        sources: scanner.sources,
        diagnostics: scanner.diagnostics,
    };
    tracing::debug!(
        root = %root.display(),
        documents = tree.sources.len(),
        dropped = tree.diagnostics.len(),
        "content scanned"
    );
    Ok(tree)
}

/// Node kind for a file name.
pub fn classify(name: &str) -> NodeKind {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return NodeKind::OtherAsset;
    };
    let ext = ext.to_ascii_lowercase();
    if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
        NodeKind::Document
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        NodeKind::Image
    } else {
        NodeKind::OtherAsset
    }
}

struct Scanner {
    sources: BTreeMap<String, String>,
    diagnostics: Vec<Diagnostic>,
}

impl Scanner {
    fn drop_entry(&mut self, path: &str, message: String) {
        tracing::warn!(path, %message, "skipping content entry");
        self.diagnostics
            .push(Diagnostic::new(DiagnosticKind::Scan, path, message));
    }

    /// Children of `dir`. Fails only when `dir` itself cannot be listed.
    fn scan_directory(
        &mut self,
        dir: &Path,
        rel: &str,
        ancestors: &mut Vec<PathBuf>,
    ) -> Result<Vec<ContentNode>, walkdir::Error> {
        let mut children = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e),
                Err(e) => {
                    let name = e
                        .path()
                        .and_then(Path::file_name)
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    self.drop_entry(&join(rel, &name), e.to_string());
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || (rel.is_empty() && name == CONFIG_FILENAME) {
                continue;
            }
            let path = join(rel, &name);

            if entry.file_type().is_dir() {
                if let Some(node) = self.scan_subdirectory(entry.path(), path, ancestors) {
                    children.push(node);
                }
            } else if let Some(node) = self.scan_file(entry.path(), path, &name) {
                children.push(node);
            }
        }

        children.sort_by(|a, b| {
            b.is_dir()
                .cmp(&a.is_dir())
                .then_with(|| a.file_name().to_lowercase().cmp(&b.file_name().to_lowercase()))
                .then_with(|| a.file_name().cmp(b.file_name()))
        });
        Ok(children)
    }

    fn scan_subdirectory(
        &mut self,
        dir: &Path,
        path: String,
        ancestors: &mut Vec<PathBuf>,
    ) -> Option<ContentNode> {
        let canonical = match fs::canonicalize(dir) {
            Ok(c) => c,
            Err(e) => {
                self.drop_entry(&path, e.to_string());
                return None;
            }
        };
        if ancestors.contains(&canonical) {
            self.drop_entry(
                &path,
                format!("symlink cycle back to {}", canonical.display()),
            );
            return None;
        }

        ancestors.push(canonical);
        let result = self.scan_directory(dir, &path, ancestors);
        ancestors.pop();

        match result {
            Ok(children) => Some(ContentNode {
                name: path.rsplit('/').next().unwrap_or_default().to_string(),
                path,
                kind: NodeKind::Directory,
                date: None,
                description: None,
                children,
            }),
            Err(e) => {
                self.drop_entry(&path, e.to_string());
                None
            }
        }
    }

    fn scan_file(&mut self, file: &Path, path: String, name: &str) -> Option<ContentNode> {
        let kind = classify(name);
        if kind != NodeKind::Document {
            return Some(ContentNode {
                path,
                kind,
                name: name.to_string(),
                date: None,
                description: None,
                children: Vec::new(),
            });
        }

        let text = match fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                self.drop_entry(&path, e.to_string());
                return None;
            }
        };
        let split = frontmatter::split(&text);
        let title = split
            .meta
            .title
            .clone()
            .or_else(|| frontmatter::first_heading(split.body))
            .unwrap_or_else(|| paths::file_stem(&path).to_string());
        let node = ContentNode {
            path: path.clone(),
            kind,
            name: title,
            date: split.meta.date.clone(),
            description: split.meta.description.clone(),
            children: Vec::new(),
        };
        self.sources.insert(path, text);
        Some(node)
    }
}

fn join(rel: &str, name: &str) -> String {
    if rel.is_empty() {
        name.to_string()
    } else {
        format!("{rel}/{name}")
    }
}
