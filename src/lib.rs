//! # Sekiei
//!
//! Site generation core for a markdown digital garden. The content directory
//! is the data source: markdown files become pages, directories become
//! listings, and every other file is published as a static asset.
//!
//! # Architecture: One Pass, Five Stages
//!
//! ```text
//! 1. Scan       content/   →  ContentNode tree + document sources
//! 2. Render     documents  →  HTML, TOC, outbound links      (parallel)
//! 3. Link       links      →  backlink index                  (barrier)
//! 4. Assemble   tree       →  file tree, feed, listing/content views
//! 5. Publish    assets     →  output/static/, output/rss.xml  (parallel, cached)
//! ```
//!
//! Stages 1 to 4 run in [`site::Site::build`] and never write to disk.
//! Stage 5 is [`site::Site::generate_assets`] and [`site::Site::write_feed`],
//! which write only into the output directory. Theming, serving and HTML
//! page layout live outside this crate: it hands serializable view models
//! to whatever template layer sits on top.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the content root into a [`types::ContentNode`] tree |
//! | [`frontmatter`] | YAML front matter: title, date, description |
//! | [`markdown`] | pulldown-cmark rendering with heading ids, link and image rewriting |
//! | [`code_block`] | Fenced code decoration: file name, line numbers, highlighted lines |
//! | [`slug`] | Heading slugs and per-document id deduplication |
//! | [`resolve`] | Lookup tables used to resolve internal and wiki links |
//! | [`backlinks`] | Reverse link graph, rebuilt every pass |
//! | [`assets`] | Flag-gated `.webp` reference rewriting and placeholder URLs |
//! | [`encode`] | WebP variants and lazy-load placeholders, in parallel |
//! | [`cache`] | Content-addressed skip cache for [`encode`] |
//! | [`file_tree`] | Site-wide navigation tree, rendered once with Maud |
//! | [`feed`] | RSS 2.0 feed of dated documents |
//! | [`site`] | Builds the whole site and answers view requests |
//! | [`paths`] | Content path ↔ URL mapping |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`types`] | Shared data model and view models |
//!
//! # Design Decisions
//!
//! ## Failures Stay Local
//!
//! Only an unreadable content root or an invalid config stops a build.
//! Everything else (an unreadable subdirectory, broken front matter, a
//! malformed code block range, a link to a page that does not exist) is
//! recovered in place and recorded as a [`types::Diagnostic`] on the site.
//!
//! ## Backlinks as a Batch Job
//!
//! Every document records its outbound links while rendering. The reverse
//! index is derived from scratch once all documents are done, so it is
//! always consistent with the current content and needs no invalidation.
//!
//! ## Flat Static URL Space
//!
//! Assets are published in a single `static/` directory under a flattened,
//! sanitized name (see [`paths::sanitize_filename`]). Renaming a directory
//! changes the names but not the bytes, which the [`cache`] turns into a
//! copy instead of a re-encode.

pub mod assets;
pub mod backlinks;
pub mod cache;
pub mod code_block;
pub mod config;
pub mod encode;
pub mod feed;
pub mod file_tree;
pub mod frontmatter;
pub mod markdown;
pub mod paths;
pub mod resolve;
pub mod scan;
pub mod site;
pub mod slug;
pub mod types;

pub use site::{Site, SiteError};

#[cfg(test)]
pub(crate) mod test_helpers;
