//! YAML front matter.
//!
//! A document may open with a `---` fenced YAML block. Only three keys are
//! read: `title`, `date` and `description`; any other keys are ignored.
//!
//! ```text
//! ---
//! title: Gardening notes
//! date: 2024-03-01
//! ---
//! # Body starts here
//! ```
//!
//! A block without a closing fence is not front matter: the whole text is
//! the body. A closed block that is not valid YAML, or not a mapping, is
//! returned as [`Degraded`] so the renderer can show it literally.

use serde_yaml::Value;

/// Metadata read from a front matter block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
}

/// A closed front matter block that could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degraded<'a> {
    /// The block as written, fences included.
    pub raw: &'a str,
    pub reason: String,
}

/// A document split into metadata and markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<'a> {
    pub meta: FrontMatter,
    pub body: &'a str,
    pub degraded: Option<Degraded<'a>>,
}

impl<'a> Split<'a> {
    fn plain(body: &'a str) -> Self {
        Self {
            meta: FrontMatter::default(),
            body,
            degraded: None,
        }
    }
}

/// Separate the front matter block (if any) from the body.
pub fn split(text: &str) -> Split<'_> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(after_open) = strip_opening_fence(text) else {
        return Split::plain(text);
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        let fence = line.trim_end();
        if fence == "---" || fence == "..." {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            let raw = &text[..text.len() - body.len()];
            return match parse_meta(yaml) {
                Ok(meta) => Split {
                    meta,
                    body,
                    degraded: None,
                },
                Err(reason) => Split {
                    meta: FrontMatter::default(),
                    body,
                    degraded: Some(Degraded { raw, reason }),
                },
            };
        }
        offset += line.len();
    }
    Split::plain(text)
}

fn strip_opening_fence(text: &str) -> Option<&str> {
    let (first, rest) = match text.find('\n') {
        Some(i) => (&text[..i], &text[i + 1..]),
        None => (text, ""),
    };
    (first.trim_end() == "---").then_some(rest)
}

fn parse_meta(yaml: &str) -> Result<FrontMatter, String> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }
    let value: Value = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
    match value {
        Value::Null => Ok(FrontMatter::default()),
        Value::Mapping(map) => {
            let field = |key: &str| map.get(key).and_then(scalar_string);
            Ok(FrontMatter {
                title: field("title"),
                date: field("date"),
                description: field("description"),
            })
        }
        _ => Err("front matter is not a mapping".to_string()),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text of the first level-one ATX heading (`# Title`) in a markdown body.
pub fn first_heading(body: &str) -> Option<String> {
    let mut in_fence = false;
    for line in body.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(title) = trimmed.strip_prefix("# ") {
            let title = title.trim().trim_end_matches('#').trim_end();
            if !title.is_empty() {
                return Some(title.to_string());
            }
        }
    }
    None
}
