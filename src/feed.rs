//! RSS 2.0 feed of dated documents.
//!
//! Built once per pass from the rendered documents. Only documents whose
//! front matter carries a `date` are items; they are ordered newest first,
//! ties broken by content path, and linked under `site.base_url`.
//!
//! Accepted dates:
//!
//! | Form | Example |
//! |------|---------|
//! | ISO | `2024-03-01`, `2024-03-01T09:30:00Z` |
//! | Slashed | `2024/03/01`, `01/03/2024` (day first) |
//! | Written | `1 Mar 2024`, `1 March 2024` |
//!
//! A date in any other form drops the document from the feed with a
//! [`DiagnosticKind::ParseDegraded`] diagnostic.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder};
use serde::Serialize;

use crate::config::SiteMeta;
use crate::types::{Diagnostic, DiagnosticKind, Document};

/// File name of the feed inside the output directory.
pub const FEED_FILENAME: &str = "rss.xml";

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d %b %Y", "%d %B %Y"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct Feed {
    pub title: String,
    /// Site URL the channel points at.
    pub link: String,
    pub description: String,
    /// Newest first.
    pub items: Vec<FeedItem>,
    #[serde(skip)]
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    /// Content path of the document.
    pub path: String,
    pub title: String,
    /// Absolute when `base_url` is set, else the page URL.
    pub link: String,
    /// RFC 2822, as RSS wants it.
    pub pub_date: String,
    /// Front matter description, or the rendered page when there is none.
    pub description: String,
}

impl Feed {
    pub fn build<'d, I>(site: &SiteMeta, documents: I) -> Self
    where
        I: IntoIterator<Item = &'d Document>,
    {
        let base = site.base_url.trim_end_matches('/');
        let mut dated = Vec::new();
        let mut diagnostics = Vec::new();

        for doc in documents {
            let Some(raw) = doc.date.as_deref() else {
                continue;
            };
            let Some(published) = parse_date(raw) else {
                tracing::warn!(path = %doc.path, date = raw, "unrecognized date, leaving document out of the feed");
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ParseDegraded,
                    doc.path.as_str(),
                    format!("feed: unrecognized date {raw:?}"),
                ));
                continue;
            };
            dated.push((published, doc));
        }
        dated.sort_by(|(a, a_doc), (b, b_doc)| b.cmp(a).then_with(|| a_doc.path.cmp(&b_doc.path)));

        let items = dated
            .into_iter()
            .map(|(published, doc)| FeedItem {
                path: doc.path.clone(),
                title: doc.title.clone(),
                link: format!("{base}{}", doc.url),
                pub_date: published.and_utc().to_rfc2822(),
                description: doc.description.clone().unwrap_or_else(|| doc.html.clone()),
            })
            .collect();

        Self {
            title: site.title.clone(),
            link: if base.is_empty() { "/".to_string() } else { format!("{base}/") },
            description: site.description.clone(),
            items,
            diagnostics,
        }
    }

    /// Documents left out because their date did not parse.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The feed as an RSS 2.0 document.
    pub fn to_rss(&self) -> String {
        let items: Vec<rss::Item> = self
            .items
            .iter()
            .map(|item| {
                ItemBuilder::default()
                    .title(Some(item.title.clone()))
                    .link(Some(item.link.clone()))
                    .guid(Some(
                        GuidBuilder::default()
                            .permalink(true)
                            .value(item.link.clone())
                            .build(),
                    ))
                    .description(Some(item.description.clone()))
                    .pub_date(Some(item.pub_date.clone()))
                    .build()
            })
            .collect();

        ChannelBuilder::default()
            .title(self.title.clone())
            .link(self.link.clone())
            .description(self.description.clone())
            .generator(Some("sekiei".to_string()))
            .items(items)
            .build()
            .to_string()
    }
}

/// Midnight UTC for date-only forms.
fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.naive_utc());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::document_url;

    fn site(base_url: &str) -> SiteMeta {
        SiteMeta {
            title: "Garden".to_string(),
            base_url: base_url.to_string(),
            description: "Notes & sketches".to_string(),
        }
    }

    fn doc(path: &str, date: Option<&str>) -> Document {
        Document {
            path: path.to_string(),
            url: document_url(path),
            title: format!("Title of {path}"),
            source: String::new(),
            html: format!("<p>{path}</p>"),
            toc: Vec::new(),
            links: Vec::new(),
            has_images: false,
            date: date.map(str::to_string),
            description: None,
        }
    }

    fn paths(feed: &Feed) -> Vec<&str> {
        feed.items.iter().map(|i| i.path.as_str()).collect()
    }

    #[test]
    fn only_dated_documents_newest_first() {
        let docs = vec![
            doc("old.md", Some("2023-01-05")),
            doc("undated.md", None),
            doc("new.md", Some("24 Jan 2025")),
            doc("mid.md", Some("2024/06/30")),
        ];
        let feed = Feed::build(&site(""), &docs);
        assert_eq!(paths(&feed), vec!["new.md", "mid.md", "old.md"]);
        assert!(feed.diagnostics().is_empty());
    }

    #[test]
    fn same_day_ordered_by_path() {
        let docs = vec![
            doc("b.md", Some("2024-03-01")),
            doc("a.md", Some("1 March 2024")),
        ];
        let feed = Feed::build(&site(""), &docs);
        assert_eq!(paths(&feed), vec!["a.md", "b.md"]);
    }

    #[test]
    fn links_are_absolute_under_base_url() {
        let docs = vec![doc("notes/rust.md", Some("2024-03-01")), doc("index.md", Some("2024-01-01"))];
        let feed = Feed::build(&site("https://garden.example/"), &docs);
        assert_eq!(feed.link, "https://garden.example/");
        assert_eq!(feed.items[0].link, "https://garden.example/notes/rust");
        assert_eq!(feed.items[1].link, "https://garden.example/");
    }

    #[test]
    fn without_base_url_links_are_page_urls() {
        let feed = Feed::build(&site(""), &[doc("notes/rust.md", Some("2024-03-01"))]);
        assert_eq!(feed.link, "/");
        assert_eq!(feed.items[0].link, "/notes/rust");
    }

    #[test]
    fn dates_render_as_rfc2822() {
        let feed = Feed::build(
            &site(""),
            &[doc("a.md", Some("2024-03-01")), doc("b.md", Some("2024-03-02T09:30:00Z"))],
        );
        assert!(feed.items[0].pub_date.starts_with("Sat, "));
        assert!(feed.items[0].pub_date.contains("2 Mar 2024 09:30:00"));
        assert!(feed.items[1].pub_date.starts_with("Fri, "));
        assert!(feed.items[1].pub_date.contains("1 Mar 2024 00:00:00"));
    }

    #[test]
    fn description_falls_back_to_rendered_page() {
        let mut described = doc("a.md", Some("2024-03-01"));
        described.description = Some("Short".to_string());
        let feed = Feed::build(&site(""), &[described, doc("b.md", Some("2024-03-01"))]);
        assert_eq!(feed.items[0].description, "Short");
        assert_eq!(feed.items[1].description, "<p>b.md</p>");
    }

    #[test]
    fn unparseable_date_is_left_out_with_diagnostic() {
        let docs = vec![doc("a.md", Some("next tuesday")), doc("b.md", Some("2024-02-30"))];
        let feed = Feed::build(&site(""), &docs);
        assert!(feed.items.is_empty());
        assert_eq!(feed.diagnostics().len(), 2);
        assert_eq!(feed.diagnostics()[0].kind, DiagnosticKind::ParseDegraded);
        assert_eq!(feed.diagnostics()[0].path, "a.md");
    }

    #[test]
    fn rss_document_lists_items() {
        let feed = Feed::build(&site("https://garden.example"), &[doc("a.md", Some("2024-03-01"))]);
        let xml = feed.to_rss();
        assert!(xml.contains("<rss"));
        assert!(xml.contains("<title>Garden</title>"));
        assert!(xml.contains("<link>https://garden.example/</link>"));
        assert!(xml.contains("<link>https://garden.example/a</link>"));
        assert!(xml.contains("<title>Title of a.md</title>"));
        assert!(xml.contains("<pubDate>Fri, "));
    }
}
