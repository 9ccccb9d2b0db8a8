//! Markdown to HTML, with a heading outline and link graph.
//!
//! Rendering runs over the pulldown-cmark event stream in two passes:
//!
//! ```text
//! events ──► pass 1: collect heading titles ──► slug::assign_ids
//!        ──► pass 2: rewrite links/images, decorate code, emit headings ──► push_html
//! ```
//!
//! Pass 2 handles:
//!
//! - **Headings** get `id` attributes and a [`TocEntry`] each.
//! - **Links** to other documents are resolved against the linking
//!   document's directory (or the root for `/…`), rewritten to page URLs and
//!   recorded as outbound links. Wiki links (`[[name]]`) resolve by file
//!   stem, and their `#fragment` is slugified like a heading id.
//!   `wiki:Article` goes to Wikipedia. External links, email autolinks and
//!   pure fragments are left alone.
//! - **Images** are resolved into the static URL space, passed through the
//!   [`AssetPipeline`], and marked up for lazy loading.
//! - **Code blocks** go through [`code_block::render`].
//!
//! Nothing here fails. Unparseable front matter is shown literally and
//! reported as a [`DiagnosticKind::ParseDegraded`] diagnostic, like
//! malformed code block line ranges.

use std::collections::HashSet;

use maud::html;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};

use crate::assets::AssetPipeline;
use crate::code_block;
use crate::frontmatter;
use crate::paths;
use crate::resolve::ContentIndex;
use crate::slug;
use crate::types::{Diagnostic, DiagnosticKind, TocEntry};

const WIKIPEDIA_BASE: &str = "https://en.wikipedia.org/wiki/";

/// Everything a render job reads besides the document itself.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub index: &'a ContentIndex,
    pub assets: &'a AssetPipeline,
    pub lazy_placeholders: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RenderedMarkdown {
    pub html: String,
    pub toc: Vec<TocEntry>,
    /// Outbound internal targets: document paths when they resolve, the
    /// normalized link key when they dangle. First-seen order, no repeats.
    pub links: Vec<String>,
    pub has_images: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parser extensions enabled for every document.
pub fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_MATH);
    options.insert(Options::ENABLE_GFM);
    options.insert(Options::ENABLE_DEFINITION_LIST);
    options.insert(Options::ENABLE_WIKILINKS);
    options
}

/// Render a document's full text (front matter included).
///
/// `doc_path` is the document's content path; relative links and images
/// resolve against its directory.
pub fn render(doc_path: &str, text: &str, ctx: &RenderContext<'_>) -> RenderedMarkdown {
    let split = frontmatter::split(text);
    let mut html = String::with_capacity(text.len() * 3 / 2);
    let mut diagnostics = Vec::new();

    if let Some(degraded) = &split.degraded {
        tracing::warn!(
            path = doc_path,
            reason = %degraded.reason,
            "front matter did not parse, rendering it literally"
        );
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::ParseDegraded,
            doc_path,
            format!("front matter: {}", degraded.reason),
        ));
        html.push_str(&html! { pre.unparsed-block { (degraded.raw) } }.into_string());
    }

    let events: Vec<Event<'_>> = Parser::new_ext(split.body, parser_options()).collect();
    let ids = slug::assign_ids(&heading_titles(&events));

    let mut pass = RenderPass {
        doc_path,
        doc_dir: paths::parent_dir(doc_path),
        ctx,
        ids: ids.into_iter(),
        toc: Vec::new(),
        links: Vec::new(),
        seen_links: HashSet::new(),
        has_images: false,
        diagnostics,
    };
    let output = pass.run(events);
    pulldown_cmark::html::push_html(&mut html, output.into_iter());

    RenderedMarkdown {
        html,
        toc: pass.toc,
        links: pass.links,
        has_images: pass.has_images,
        diagnostics: pass.diagnostics,
    }
}

/// Plain-text title of every heading, in source order.
fn heading_titles(events: &[Event<'_>]) -> Vec<String> {
    let mut titles = Vec::new();
    let mut current: Option<String> = None;
    let mut in_image = false;
    for event in events {
        match event {
            Event::Start(Tag::Heading { .. }) => current = Some(String::new()),
            Event::End(TagEnd::Heading(_)) => titles.extend(current.take()),
            Event::Start(Tag::Image { .. }) => in_image = true,
            Event::End(TagEnd::Image) => in_image = false,
            Event::Text(t) | Event::Code(t) | Event::InlineMath(t) if !in_image => {
                if let Some(title) = current.as_mut() {
                    title.push_str(t);
                }
            }
            _ => {}
        }
    }
    titles
}

/// A heading whose opening tag is out and whose title is still being read.
struct OpenHeading {
    level: u8,
    id: String,
    title: String,
}

struct PendingImage {
    link_type: LinkType,
    dest: String,
    title: String,
    alt: String,
}

/// Where an image points once resolved.
enum ImageSource {
    External(String),
    Local { url: String, placeholder: Option<String> },
}

struct RenderPass<'a, 'c> {
    doc_path: &'a str,
    doc_dir: &'a str,
    ctx: &'a RenderContext<'c>,
    ids: std::vec::IntoIter<String>,
    toc: Vec<TocEntry>,
    links: Vec<String>,
    seen_links: HashSet<String>,
    has_images: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, 'c> RenderPass<'a, 'c> {
    fn run<'e>(&mut self, events: Vec<Event<'e>>) -> Vec<Event<'e>> {
        let mut output: Vec<Event<'e>> = Vec::with_capacity(events.len());
        let mut heading: Option<OpenHeading> = None;
        let mut code: Option<(String, String)> = None;
        let mut image: Option<PendingImage> = None;

        for event in events {
            if let Some((info, text)) = code.as_mut() {
                match event {
                    Event::Text(t) => text.push_str(&t),
                    Event::End(TagEnd::CodeBlock) => {
                        let block = self.code_block(info, text);
                        code = None;
                        output.push(Event::Html(block.into()));
                    }
                    _ => {}
                }
                continue;
            }

            if let Some(pending) = image.as_mut() {
                match event {
                    Event::End(TagEnd::Image) => {
                        let markup = self.image_markup(pending);
                        image = None;
                        output.push(Event::InlineHtml(markup.into()));
                    }
                    Event::Text(t) | Event::Code(t) => pending.alt.push_str(&t),
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let info = match kind {
                        CodeBlockKind::Fenced(info) => info.to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    code = Some((info, String::new()));
                }
                Event::Start(Tag::Heading { level, .. }) => {
                    let open = self.open_heading(level as u8);
                    output.push(Event::Html(format!("<h{} id=\"{}\">", open.level, open.id).into()));
                    heading = Some(open);
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(done) = heading.take() {
                        output.push(Event::Html(format!("</h{}>\n", done.level).into()));
                        self.toc.push(TocEntry {
                            level: done.level,
                            id: done.id,
                            title: done.title.trim().to_string(),
                        });
                    }
                }
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    ..
                }) => {
                    image = Some(PendingImage {
                        link_type,
                        dest: dest_url.to_string(),
                        title: title.to_string(),
                        alt: String::new(),
                    });
                }
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    let href = self.link_href(link_type, &dest_url);
                    let link_type = match link_type {
                        LinkType::WikiLink { .. } => LinkType::Inline,
                        other => other,
                    };
                    output.push(Event::Start(Tag::Link {
                        link_type,
                        dest_url: CowStr::from(href),
                        title,
                        id,
                    }));
                }
                other => {
                    if let Some(h) = heading.as_mut()
                        && let Event::Text(t) | Event::Code(t) | Event::InlineMath(t) = &other
                    {
                        h.title.push_str(t);
                    }
                    output.push(other);
                }
            }
        }
        output
    }

    /// Heading contents stay in the main event stream so footnote numbers
    /// and other writer state are shared with the rest of the document.
    fn open_heading(&mut self, level: u8) -> OpenHeading {
        let id = self
            .ids
            .next()
            .unwrap_or_else(|| format!("section-{}", self.toc.len() + 1));
        OpenHeading {
            level,
            id,
            title: String::new(),
        }
    }

    fn code_block(&mut self, info: &str, code: &str) -> String {
        let (markup, problems) = code_block::render(info, code);
        for problem in problems {
            tracing::warn!(path = self.doc_path, problem = %problem, "code block info string");
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::ParseDegraded,
                self.doc_path,
                format!("code block: {problem}"),
            ));
        }
        markup
    }

    /// Final href for a link, recording internal targets on the way.
    fn link_href(&mut self, link_type: LinkType, dest: &str) -> String {
        // Autolinks carry the bare address; the writer adds `mailto:` itself.
        if matches!(link_type, LinkType::Email | LinkType::Autolink) {
            return dest.to_string();
        }
        if let Some(article) = dest.strip_prefix("wiki:") {
            return wikipedia_url(article);
        }
        let is_wiki = matches!(link_type, LinkType::WikiLink { .. });
        if is_wiki && let Some(heading) = dest.strip_prefix('#') {
            return format!("#{}", slug::slugify(heading));
        }
        if dest.is_empty() || dest.starts_with('#') || paths::is_external(dest) {
            return dest.to_string();
        }

        let (path, suffix) = paths::split_suffix(dest);
        let fragment = match suffix.find('#').map(|i| &suffix[i + 1..]) {
            Some(heading) if is_wiki => format!("#{}", slug::slugify(heading)),
            Some(heading) => format!("#{heading}"),
            None => String::new(),
        };

        let key = match link_type {
            LinkType::WikiLink { .. } if !path.contains('/') => {
                match self.ctx.index.find_document_by_stem(path) {
                    Some(found) => Some(found.to_string()),
                    None => paths::resolve_relative("", path),
                }
            }
            LinkType::WikiLink { .. } => paths::resolve_relative("", path),
            _ => paths::resolve_relative(self.doc_dir, path),
        };
        let Some(key) = key else {
            return dest.to_string();
        };

        let index = self.ctx.index;
        if index.is_asset(&key) {
            let url = paths::static_url(&key);
            return format!("{}{suffix}", self.ctx.assets.rewrite(&url));
        }
        if let Some(doc) = index.resolve_document(&key) {
            let doc = doc.to_string();
            let href = format!("{}{fragment}", paths::document_url(&doc));
            self.record_link(doc);
            return href;
        }
        if index.is_dir(&key) {
            return format!("{}{fragment}", paths::dir_url(&key));
        }

        let key = paths::strip_document_extension(&key)
            .unwrap_or(&key)
            .to_string();
        let href = format!("/{key}{fragment}");
        self.record_link(key);
        href
    }

    fn record_link(&mut self, target: String) {
        if self.seen_links.insert(target.clone()) {
            self.links.push(target);
        }
    }

    fn image_source(&self, image: &PendingImage) -> ImageSource {
        let dest = image.dest.as_str();
        if paths::is_external(dest) {
            return ImageSource::External(dest.to_string());
        }
        let (path, suffix) = paths::split_suffix(dest);

        let url = if path.starts_with("/static/") {
            path.to_string()
        } else {
            let resolved = match image.link_type {
                LinkType::WikiLink { .. } if !path.contains('/') => self
                    .ctx
                    .index
                    .find_asset_by_name(path)
                    .map(str::to_string)
                    .or_else(|| paths::resolve_relative(self.doc_dir, path)),
                _ => paths::resolve_relative(self.doc_dir, path),
            };
            match resolved {
                Some(content_path) => paths::static_url(&content_path),
                None => return ImageSource::External(dest.to_string()),
            }
        };

        let placeholder = if self.ctx.lazy_placeholders {
            self.ctx.assets.placeholder_url(&url)
        } else {
            None
        };
        ImageSource::Local {
            url: format!("{}{suffix}", self.ctx.assets.rewrite(&url)),
            placeholder,
        }
    }

    fn image_markup(&mut self, image: &PendingImage) -> String {
        self.has_images = true;
        let title = (!image.title.is_empty()).then_some(image.title.as_str());
        let alt = image.alt.as_str();
        let markup = match self.image_source(image) {
            ImageSource::Local {
                url,
                placeholder: Some(placeholder),
            } => html! {
                span.lazy-image-container {
                    img src=(placeholder) data-src=(url) alt=(alt) title=[title] loading="lazy";
                    img.placeholder src=(placeholder) alt="loading...";
                }
            },
            ImageSource::Local { url, placeholder: None } | ImageSource::External(url) => html! {
                img src=(url) data-src=(url) alt=(alt) title=[title] loading="lazy";
            },
        };
        markup.into_string()
    }
}

fn wikipedia_url(article: &str) -> String {
    format!("{WIKIPEDIA_BASE}{}", article.trim().replace(' ', "_"))
}
