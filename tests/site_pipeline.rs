//! End-to-end tests: content directory in, views and static assets out.
//!
//! Each test lays out a small garden in a temp directory, builds the site
//! through the public API and checks what a template layer would see.

use std::path::Path;

use sekiei::config::SiteConfig;
use sekiei::types::{ContentView, ListingView, SiteIndexView};
use sekiei::{Site, SiteError};
use tempfile::TempDir;

fn write(root: &Path, path: &str, contents: &str) {
    let full = root.join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(full, contents).unwrap();
}

fn garden() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(
        root,
        "index.md",
        "---\ntitle: Garden\n---\nWelcome. See [[roses]] and [the log](notes/log.md#2024).\n",
    );
    write(
        root,
        "plants/roses.md",
        "# Roses\n\n## Pruning\n\n## Pruning\n\n## Pruning 2\n\n![bloom](bloom.JPG)\n\nBack [home](/index.md).\n",
    );
    write(root, "plants/tulips.md", "# Tulips\n\nLike [roses](roses.md), but earlier.\n");
    write(root, "notes/log.md", "# Log\n\nNothing links back here from itself: [me](log.md).\n");
    write(root, "notes/zeta.png", "not really a png");
    write(root, "notes/apple.md", "plain text, no headings");
    image::RgbImage::from_pixel(40, 30, image::Rgb([200, 40, 90]))
        .save_with_format(root.join("plants/bloom.JPG"), image::ImageFormat::Png)
        .unwrap();
    tmp
}

fn content<'a>(view: SiteIndexView<'a>) -> ContentView<'a> {
    match view {
        SiteIndexView::Content(c) => c,
        SiteIndexView::Listing(l) => panic!("expected content, got listing {:?}", l.dir_path),
    }
}

fn listing<'a>(view: SiteIndexView<'a>) -> ListingView<'a> {
    match view {
        SiteIndexView::Listing(l) => l,
        SiteIndexView::Content(c) => panic!("expected listing, got content {:?}", c.title),
    }
}

#[test]
fn root_serves_index_document() {
    let tmp = garden();
    let site = Site::build(tmp.path(), SiteConfig::default()).unwrap();
    let view = content(site.view("/").unwrap());
    assert_eq!(view.title, "Garden");
    assert!(view.markdown.contains(r#"href="/plants/roses""#));
    assert!(view.markdown.contains(r#"href="/notes/log#2024""#));
}

#[test]
fn toc_ids_unique_and_deterministic() {
    let tmp = garden();
    let first = Site::build(tmp.path(), SiteConfig::default()).unwrap();
    let second = Site::build(tmp.path(), SiteConfig::default()).unwrap();

    let toc = content(first.view("plants/roses").unwrap()).table_of_contents;
    let ids: Vec<&str> = toc.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["roses", "pruning", "pruning-3", "pruning-2"]);
    assert_eq!(toc[1].level, 2);

    let again = content(second.view("plants/roses").unwrap()).table_of_contents;
    assert_eq!(toc, again);
}

#[test]
fn zero_headings_give_empty_toc() {
    let tmp = garden();
    let site = Site::build(tmp.path(), SiteConfig::default()).unwrap();
    let view = content(site.view("notes/apple").unwrap());
    assert!(view.table_of_contents.is_empty());
    assert_eq!(view.title, "apple");
}

#[test]
fn listing_order_is_stable() {
    let tmp = garden();
    write(tmp.path(), "notes/Banana.md", "# Banana");
    write(tmp.path(), "notes/archive/old.md", "# Old");
    let site = Site::build(tmp.path(), SiteConfig::default()).unwrap();

    let view = listing(site.view("notes").unwrap());
    let urls: Vec<&str> = view.items.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "/notes/archive/",
            "/notes/apple",
            "/notes/Banana",
            "/notes/log",
            "/static/notes-zeta.png",
        ]
    );
}

#[test]
fn backlinks_are_symmetric() {
    let tmp = garden();
    let site = Site::build(tmp.path(), SiteConfig::default()).unwrap();

    for doc in site.documents() {
        for target in &doc.links {
            if site.document(target).is_none() || target == &doc.path {
                continue;
            }
            assert!(
                site.backlinks_for(target).iter().any(|b| b.path == doc.url),
                "{} links to {} but is not in its backlinks",
                doc.path,
                target
            );
        }
    }

    let roses: Vec<&str> = site
        .backlinks_for("plants/roses.md")
        .iter()
        .map(|b| b.title.as_str())
        .collect();
    assert_eq!(roses, vec!["Garden", "Tulips"]);
}

#[test]
fn self_links_never_backlink() {
    let tmp = garden();
    let site = Site::build(tmp.path(), SiteConfig::default()).unwrap();
    let view = content(site.view("notes/log").unwrap());
    assert!(view.backlinks.iter().all(|b| b.path != "/notes/log"));
    assert_eq!(view.backlinks.len(), 1);
    assert_eq!(view.backlinks[0].path, "/");
}

#[test]
fn removing_a_link_removes_the_backlink() {
    let tmp = garden();
    let site = Site::build(tmp.path(), SiteConfig::default()).unwrap();
    assert_eq!(site.backlinks_for("plants/roses.md").len(), 2);

    write(tmp.path(), "plants/tulips.md", "# Tulips\n\nNo links any more.\n");
    let rebuilt = Site::build(tmp.path(), SiteConfig::default()).unwrap();
    let titles: Vec<&str> = rebuilt
        .backlinks_for("plants/roses.md")
        .iter()
        .map(|b| b.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Garden"]);
}

#[test]
fn webp_rewrite_follows_the_flag() {
    let tmp = garden();

    let plain = Site::build(tmp.path(), SiteConfig::default()).unwrap();
    let html = content(plain.view("plants/roses").unwrap()).markdown.to_string();
    assert!(html.contains("/static/plants-bloom.JPG"));
    assert!(!html.contains(".webp"));

    let mut config = SiteConfig::default();
    config.images.compress_to_webp = true;
    let webp = Site::build(tmp.path(), config).unwrap();
    let view = content(webp.view("plants/roses").unwrap());
    assert!(view.has_images);
    assert!(view.markdown.contains("/static/plants-bloom.webp"));
    assert!(view.markdown.contains("/static/lazy/plants-bloom.webp"));
    assert!(!view.markdown.contains("bloom.JPG"));
}

#[test]
fn missing_targets_are_not_found() {
    let tmp = garden();
    let site = Site::build(tmp.path(), SiteConfig::default()).unwrap();
    for target in ["nowhere", "plants/lilies", "notes/zeta.png", "plants/bloom.JPG"] {
        assert!(
            matches!(site.view(target), Err(SiteError::NotFound(ref t)) if t == target),
            "{target} should be NotFound"
        );
    }
}

#[test]
fn generated_assets_match_rendered_urls() {
    let tmp = garden();
    let out = TempDir::new().unwrap();
    let mut config = SiteConfig::default();
    config.images.compress_to_webp = true;
    let site = Site::build(tmp.path(), config).unwrap();

    let report = site.generate_assets(out.path()).unwrap();
    // zeta.png is not a decodable image
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| f.source == "notes/zeta.png"));
    assert!(out.path().join("static/plants-bloom.webp").exists());

    let placeholder = image::open(out.path().join("static/lazy/plants-bloom.webp")).unwrap();
    assert_eq!(placeholder.width(), 20);

    let again = site.generate_assets(out.path()).unwrap();
    assert_eq!(again.stats.hits, 2);
    assert_eq!(again.stats.misses, 0);
    assert_eq!(again.failures.len(), 2);
}

#[test]
fn feed_follows_front_matter_dates() {
    let tmp = garden();
    write(
        tmp.path(),
        "notes/spring.md",
        "---\ntitle: Spring\ndate: 2024-04-01\n---\nBuds.\n",
    );
    write(
        tmp.path(),
        "notes/winter.md",
        "---\ntitle: Winter\ndate: 12 Dec 2023\ndescription: Cold\n---\nFrost.\n",
    );
    let mut config = SiteConfig::default();
    config.site.base_url = "https://garden.example/".to_string();
    let site = Site::build(tmp.path(), config).unwrap();

    let titles: Vec<&str> = site.feed().items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Spring", "Winter"]);
    assert_eq!(site.feed().items[1].description, "Cold");

    let out = TempDir::new().unwrap();
    let xml = std::fs::read_to_string(site.write_feed(out.path()).unwrap()).unwrap();
    assert!(xml.contains("<link>https://garden.example/notes/spring</link>"));
}

#[test]
fn unreadable_root_fails_the_build() {
    let tmp = TempDir::new().unwrap();
    let result = Site::build(&tmp.path().join("missing"), SiteConfig::default());
    assert!(matches!(result, Err(SiteError::Scan(_))));
}
