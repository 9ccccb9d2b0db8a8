//! Site assembly and view building.
//!
//! [`Site::build`] runs a full generation pass:
//!
//! ```text
//! scan ──► ContentIndex ──► render documents (parallel) ──► backlinks ──► file tree, feed
//! ```
//!
//! The backlink build is a barrier: it starts only once every document is
//! rendered. The result is immutable. [`Site::view`] borrows from it to
//! produce the template context for one page, so any number of views can be
//! built concurrently from a shared `&Site`.
//!
//! Re-running [`Site::build`] is the only way to pick up content changes.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;

use crate::assets::AssetPipeline;
use crate::backlinks::BacklinkIndex;
use crate::config::{self, ConfigError, SiteConfig, effective_threads};
use crate::encode::{self, AssetReport, EncodeError};
use crate::feed::{FEED_FILENAME, Feed};
use crate::file_tree;
use crate::markdown::{self, RenderContext};
use crate::paths;
use crate::resolve::ContentIndex;
use crate::scan::{self, ContentTree, ScanError};
use crate::types::{
    AssetRewrite, BacklinkEntry, ContentNode, ContentView, Diagnostic, Document, ListingItem,
    ListingView, NodeKind, SiteIndexView,
};

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// A fully built site.
#[derive(Debug)]
pub struct Site {
    root: PathBuf,
    config: SiteConfig,
    tree: ContentNode,
    /// Document path → rendered document.
    documents: BTreeMap<String, Document>,
    /// Page path (URL without surrounding slashes, or path without
    /// extension) → document path.
    url_index: HashMap<String, String>,
    backlinks: BacklinkIndex,
    file_tree: String,
    feed: Feed,
    assets: AssetPipeline,
    diagnostics: Vec<Diagnostic>,
}

impl Site {
    /// Load `config.toml` from the content root, then build.
    pub fn load(root: &Path) -> Result<Self, SiteError> {
        let config = config::load_config(root)?;
        Self::build(root, config)
    }

    pub fn build(root: &Path, config: SiteConfig) -> Result<Self, SiteError> {
        let ContentTree {
            root: tree,
            sources,
            mut diagnostics,
        } = scan::scan(root)?;

        let assets = AssetPipeline::from_config(&config.images);
        let index = ContentIndex::new(&tree);
        let ctx = RenderContext {
            index: &index,
            assets: &assets,
            lazy_placeholders: config.images.lazy_placeholders,
        };

        let nodes: Vec<&ContentNode> = tree
            .walk()
            .filter(|n| n.kind == NodeKind::Document)
            .collect();
        let render_all = || {
            nodes
                .par_iter()
                .map(|node| render_document(node, &sources, &ctx))
                .collect::<Vec<_>>()
        };
        let rendered = match rayon::ThreadPoolBuilder::new()
            .num_threads(effective_threads(&config.processing))
            .build()
        {
            Ok(pool) => pool.install(render_all),
            Err(e) => {
                tracing::warn!(error = %e, "could not build render pool, using the global pool");
                render_all()
            }
        };

        let mut documents = BTreeMap::new();
        for (document, problems) in rendered {
            diagnostics.extend(problems);
            documents.insert(document.path.clone(), document);
        }

        let backlinks = BacklinkIndex::build(documents.values());
        diagnostics.extend(backlinks.diagnostics().iter().cloned());

        let mut url_index = HashMap::new();
        for doc in documents.values() {
            if let Some(stem) = paths::strip_document_extension(&doc.path) {
                url_index.insert(stem.to_string(), doc.path.clone());
            }
        }
        for doc in documents.values() {
            url_index.insert(doc.url.trim_matches('/').to_string(), doc.path.clone());
        }

        let file_tree = file_tree::render(&tree, &assets);
        let feed = Feed::build(&config.site, documents.values());
        diagnostics.extend(feed.diagnostics().iter().cloned());

        tracing::info!(
            root = %root.display(),
            documents = documents.len(),
            backlinked = backlinks.linked_count(),
            feed_items = feed.items.len(),
            diagnostics = diagnostics.len(),
            "site built"
        );

        Ok(Self {
            root: root.to_path_buf(),
            config,
            tree,
            documents,
            url_index,
            backlinks,
            file_tree,
            feed,
            assets,
            diagnostics,
        })
    }

    /// Template context for a target path.
    ///
    /// Leading and trailing `/` are ignored. The empty target is the root
    /// `index.md` when there is one, else the root listing. Asset files and
    /// unknown paths are [`SiteError::NotFound`].
    pub fn view(&self, target: &str) -> Result<SiteIndexView<'_>, SiteError> {
        let key = target.trim_matches('/');
        let not_found = || SiteError::NotFound(target.to_string());

        if key.is_empty() {
            let index = self
                .documents
                .get("index.md")
                .or_else(|| self.document_at_url(""));
            return Ok(match index {
                Some(doc) => SiteIndexView::Content(self.content_view(doc)),
                None => SiteIndexView::Listing(self.listing_view(&self.tree)),
            });
        }

        if let Some(node) = self.tree.find(key) {
            return match node.kind {
                NodeKind::Directory => Ok(SiteIndexView::Listing(self.listing_view(node))),
                NodeKind::Document => self
                    .documents
                    .get(&node.path)
                    .map(|doc| SiteIndexView::Content(self.content_view(doc)))
                    .ok_or_else(not_found),
                NodeKind::Image | NodeKind::OtherAsset => Err(not_found()),
            };
        }

        self.document_at_url(key)
            .map(|doc| SiteIndexView::Content(self.content_view(doc)))
            .ok_or_else(not_found)
    }

    /// Listing view of a directory.
    pub fn listing(&self, dir_path: &str) -> Result<ListingView<'_>, SiteError> {
        let key = dir_path.trim_matches('/');
        match self.tree.find(key) {
            Some(node) if node.is_dir() => Ok(self.listing_view(node)),
            _ => Err(SiteError::NotFound(dir_path.to_string())),
        }
    }

    /// Image reference rewrites for one directory's entries.
    pub fn asset_rewrites(&self, dir_path: &str) -> Result<Vec<AssetRewrite>, SiteError> {
        let key = dir_path.trim_matches('/');
        match self.tree.find(key) {
            Some(node) if node.is_dir() => Ok(self.assets.rewrites(&node.children)),
            _ => Err(SiteError::NotFound(dir_path.to_string())),
        }
    }

    /// Write the static assets into `output_dir`.
    pub fn generate_assets(&self, output_dir: &Path) -> Result<AssetReport, EncodeError> {
        encode::generate_assets(&self.root, &self.tree, output_dir, &self.config)
    }

    /// Write the RSS feed to `<output_dir>/rss.xml`, returning its path.
    pub fn write_feed(&self, output_dir: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(FEED_FILENAME);
        fs::write(&path, self.feed.to_rss())?;
        tracing::info!(path = %path.display(), items = self.feed.items.len(), "feed written");
        Ok(path)
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn tree(&self) -> &ContentNode {
        &self.tree
    }

    pub fn document(&self, path: &str) -> Option<&Document> {
        self.documents.get(path)
    }

    /// Documents in path order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn backlinks_for(&self, path: &str) -> &[BacklinkEntry] {
        self.backlinks.backlinks_for(path)
    }

    pub fn file_tree(&self) -> &str {
        &self.file_tree
    }

    /// Dated documents, newest first.
    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    /// Every recovered problem of the pass, in discovery order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn document_at_url(&self, key: &str) -> Option<&Document> {
        self.url_index.get(key).and_then(|p| self.documents.get(p))
    }

    fn listing_view(&self, dir: &ContentNode) -> ListingView<'_> {
        ListingView {
            dir_path: dir.path.clone(),
            items: dir
                .children
                .iter()
                .map(|child| ListingItem {
                    name: child.name.clone(),
                    url: paths::node_url(child, &self.assets),
                    date: child.date.clone(),
                    description: child.description.clone(),
                })
                .collect(),
            file_tree: &self.file_tree,
            comments: &self.config.comments,
        }
    }

    fn content_view<'s>(&'s self, doc: &'s Document) -> ContentView<'s> {
        ContentView {
            title: &doc.title,
            markdown: &doc.html,
            table_of_contents: &doc.toc,
            backlinks: self.backlinks.backlinks_for(&doc.path),
            file_tree: &self.file_tree,
            has_images: doc.has_images,
            date: doc.date.as_deref(),
            description: doc.description.as_deref(),
            comments: &self.config.comments,
        }
    }
}

fn render_document(
    node: &ContentNode,
    sources: &BTreeMap<String, String>,
    ctx: &RenderContext<'_>,
) -> (Document, Vec<Diagnostic>) {
    let source = sources.get(&node.path).cloned().unwrap_or_default();
    let rendered = markdown::render(&node.path, &source, ctx);
    let document = Document {
        path: node.path.clone(),
        url: paths::document_url(&node.path),
        title: node.name.clone(),
        source,
        html: rendered.html,
        toc: rendered.toc,
        links: rendered.links,
        has_images: rendered.has_images,
        date: node.date.clone(),
        description: node.description.clone(),
    };
    (document, rendered.diagnostics)
}
