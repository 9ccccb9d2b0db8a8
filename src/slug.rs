//! Heading anchors.
//!
//! Ids are assigned per document in two passes: the first slugifies every
//! heading, the second hands out ids in source order. The first heading
//! with a given slug keeps it. Later duplicates get `-2`, `-3`, … and skip
//! any suffix that is taken or that another heading in the document
//! produces naturally, so a literal `## FAQ 2` is never displaced by a
//! generated one.

use std::collections::HashSet;

/// Slug used when a heading has no alphanumeric characters.
pub const EMPTY_SLUG: &str = "section";

/// Lowercase, collapse every run of non-alphanumerics to one `-`, and trim
/// dashes from both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// Assign a unique id to every heading title, preserving order.
pub fn assign_ids<S: AsRef<str>>(titles: &[S]) -> Vec<String> {
    let bases: Vec<String> = titles.iter().map(|t| slugify(t.as_ref())).collect();
    let natural: HashSet<&str> = bases.iter().map(String::as_str).collect();

    let mut taken: HashSet<String> = HashSet::with_capacity(bases.len());
    let mut ids = Vec::with_capacity(bases.len());
    for base in &bases {
        if taken.insert(base.clone()) {
            ids.push(base.clone());
            continue;
        }
        let mut n = 2usize;
        let id = loop {
            let candidate = format!("{base}-{n}");
            if !taken.contains(&candidate) && !natural.contains(candidate.as_str()) {
                break candidate;
            }
            n += 1;
        };
        taken.insert(id.clone());
        ids.push(id);
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_joins_words() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("What's new?"), "what-s-new");
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("  --Hello,   World!--  "), "hello-world");
        assert_eq!(slugify("a---b"), "a-b");
    }

    #[test]
    fn slugify_keeps_unicode_letters() {
        assert_eq!(slugify("Café Menü"), "café-menü");
        assert_eq!(slugify("写真 2024"), "写真-2024");
    }

    #[test]
    fn slugify_empty_falls_back() {
        assert_eq!(slugify(""), "section");
        assert_eq!(slugify("!!! ???"), "section");
    }

    #[test]
    fn duplicates_get_numbered_suffixes() {
        let ids = assign_ids(&["FAQ", "FAQ", "FAQ"]);
        assert_eq!(ids, vec!["faq", "faq-2", "faq-3"]);
    }

    #[test]
    fn generated_suffix_skips_natural_slugs() {
        let ids = assign_ids(&["FAQ", "FAQ", "FAQ 2"]);
        assert_eq!(ids, vec!["faq", "faq-3", "faq-2"]);
    }

    #[test]
    fn natural_slug_after_generated_collision() {
        let ids = assign_ids(&["Intro", "Intro 2", "Intro", "Intro"]);
        assert_eq!(ids, vec!["intro", "intro-2", "intro-3", "intro-4"]);
    }

    #[test]
    fn ids_are_unique_and_deterministic() {
        let titles = ["A", "a", "A!", "a-2", "", "", "Section"];
        let first = assign_ids(&titles);
        let second = assign_ids(&titles);
        assert_eq!(first, second);
        let unique: HashSet<&String> = first.iter().collect();
        assert_eq!(unique.len(), first.len());
    }

    #[test]
    fn no_titles_no_ids() {
        let empty: [&str; 0] = [];
        assert!(assign_ids(&empty).is_empty());
    }
}
