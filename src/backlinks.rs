//! Reverse-reference graph between documents.
//!
//! Built from scratch on every pass, after all documents are rendered:
//!
//! 1. **Collect** forward adjacency `source → {targets}` from each
//!    document's outbound links.
//! 2. **Derive** the inverse `target → [sources]`.
//!
//! Self-links are skipped. Targets that are not documents in the current
//! tree are dropped and reported as [`DiagnosticKind::DanglingLink`]. Each
//! target's entries are ordered by the linking document's URL, then by its
//! content path, and list every source document once. Two sources can share
//! a URL (`a.md` and `a.markdown`) and still appear separately.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{BacklinkEntry, Diagnostic, DiagnosticKind, Document};

#[derive(Debug, Default)]
pub struct BacklinkIndex {
    /// Target document path → documents linking to it.
    reverse: BTreeMap<String, Vec<BacklinkEntry>>,
    dangling: Vec<Diagnostic>,
}

impl BacklinkIndex {
    pub fn build<'d, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'d Document>,
    {
        let by_path: BTreeMap<&str, &Document> =
            documents.into_iter().map(|d| (d.path.as_str(), d)).collect();

        // Phase 1: forward adjacency
        let mut forward: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (path, doc) in &by_path {
            let targets = forward.entry(*path).or_default();
            targets.extend(doc.links.iter().map(String::as_str));
        }

        // Phase 2: invert
        let mut reverse: BTreeMap<String, Vec<BacklinkEntry>> = BTreeMap::new();
        let mut dangling = Vec::new();
        for (source, targets) in &forward {
            let source_doc = by_path[source];
            for &target in targets {
                if target == *source {
                    continue;
                }
                if !by_path.contains_key(target) {
                    tracing::debug!(source, target, "dropping dangling link");
                    dangling.push(Diagnostic::new(
                        DiagnosticKind::DanglingLink,
                        *source,
                        format!("links to missing document {target}"),
                    ));
                    continue;
                }
                reverse.entry(target.to_string()).or_default().push(BacklinkEntry {
                    path: source_doc.url.clone(),
                    title: source_doc.title.clone(),
                });
            }
        }
        // Stable: equal URLs keep source path order
        for entries in reverse.values_mut() {
            entries.sort_by(|a, b| a.path.cmp(&b.path));
        }

        Self { reverse, dangling }
    }

    /// Documents linking to the document at `path`.
    pub fn backlinks_for(&self, path: &str) -> &[BacklinkEntry] {
        self.reverse.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One diagnostic per dropped link.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.dangling
    }

    /// Number of documents with at least one backlink.
    pub fn linked_count(&self) -> usize {
        self.reverse.len()
    }
}
