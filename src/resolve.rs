//! Lookup tables over a scanned tree for link resolution.
//!
//! Built once per pass and shared read-only by every render job.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::paths::{self, DOCUMENT_EXTENSIONS};
use crate::types::{ContentNode, NodeKind};

#[derive(Debug, Default)]
pub struct ContentIndex {
    documents: BTreeSet<String>,
    directories: HashSet<String>,
    assets: HashSet<String>,
    /// Document file stem → document paths, lexically sorted.
    stems: HashMap<String, Vec<String>>,
    /// Asset file name → asset paths, lexically sorted.
    asset_names: HashMap<String, Vec<String>>,
}

impl ContentIndex {
    pub fn new(root: &ContentNode) -> Self {
        let mut index = Self::default();
        for node in root.walk() {
            match node.kind {
                NodeKind::Directory => {
                    index.directories.insert(node.path.clone());
                }
                NodeKind::Document => {
                    index.documents.insert(node.path.clone());
                    index
                        .stems
                        .entry(paths::file_stem(&node.path).to_string())
                        .or_default()
                        .push(node.path.clone());
                }
                NodeKind::Image | NodeKind::OtherAsset => {
                    index.assets.insert(node.path.clone());
                    index
                        .asset_names
                        .entry(node.file_name().to_string())
                        .or_default()
                        .push(node.path.clone());
                }
            }
        }
        for candidates in index.stems.values_mut().chain(index.asset_names.values_mut()) {
            candidates.sort();
        }
        index
    }

    /// Find the document a link key points at.
    ///
    /// The key may carry its extension (`notes/a.md`) or be written as a
    /// page path (`notes/a`).
    pub fn resolve_document(&self, key: &str) -> Option<&str> {
        let key = key.trim_end_matches('/');
        if let Some(path) = self.documents.get(key) {
            return Some(path.as_str());
        }
        DOCUMENT_EXTENSIONS.iter().find_map(|ext| {
            self.documents
                .get(format!("{key}.{ext}").as_str())
                .map(String::as_str)
        })
    }

    /// Document whose file stem is `stem`. With several candidates the
    /// lexically first path wins.
    pub fn find_document_by_stem(&self, stem: &str) -> Option<&str> {
        let stem = paths::strip_document_extension(stem).unwrap_or(stem);
        self.stems.get(stem)?.first().map(String::as_str)
    }

    /// Asset whose file name is `name`, anywhere in the tree.
    pub fn find_asset_by_name(&self, name: &str) -> Option<&str> {
        self.asset_names.get(name)?.first().map(String::as_str)
    }

    pub fn is_asset(&self, path: &str) -> bool {
        self.assets.contains(path)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.directories.contains(path)
    }

    pub fn is_document(&self, path: &str) -> bool {
        self.documents.contains(path)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(path: &str, kind: NodeKind, children: Vec<ContentNode>) -> ContentNode {
        ContentNode {
            path: path.to_string(),
            kind,
            name: path.to_string(),
            date: None,
            description: None,
            children,
        }
    }

    fn sample() -> ContentNode {
        node(
            "",
            NodeKind::Directory,
            vec![
                node(
                    "b",
                    NodeKind::Directory,
                    vec![
                        node("b/rust.md", NodeKind::Document, vec![]),
                        node("b/photo.png", NodeKind::Image, vec![]),
                    ],
                ),
                node("a", NodeKind::Directory, vec![node("a/rust.md", NodeKind::Document, vec![])]),
                node("essay.markdown", NodeKind::Document, vec![]),
            ],
        )
    }

    #[test]
    fn resolves_with_and_without_extension() {
        let index = ContentIndex::new(&sample());
        assert_eq!(index.resolve_document("b/rust.md"), Some("b/rust.md"));
        assert_eq!(index.resolve_document("b/rust"), Some("b/rust.md"));
        assert_eq!(index.resolve_document("essay"), Some("essay.markdown"));
        assert_eq!(index.resolve_document("missing"), None);
    }

    #[test]
    fn stem_lookup_prefers_lexically_first() {
        let index = ContentIndex::new(&sample());
        assert_eq!(index.find_document_by_stem("rust"), Some("a/rust.md"));
        assert_eq!(index.find_document_by_stem("rust.md"), Some("a/rust.md"));
        assert_eq!(index.find_document_by_stem("nope"), None);
    }

    #[test]
    fn asset_and_directory_queries() {
        let index = ContentIndex::new(&sample());
        assert_eq!(index.find_asset_by_name("photo.png"), Some("b/photo.png"));
        assert!(index.is_asset("b/photo.png"));
        assert!(index.is_dir("a"));
        assert!(index.is_dir(""));
        assert!(!index.is_dir("a/rust.md"));
        assert!(index.is_document("a/rust.md"));
        assert_eq!(index.document_count(), 3);
    }
}
