//! Fenced code block decoration.
//!
//! The info string after the opening fence can carry more than a language:
//!
//! ~~~text
//! ```rust title="src/main.rs" {2,4-5} add={7} del={8}
//! ~~~
//!
//! - first bare word: language, emitted as `language-<lang>` and in the header
//! - `title=`: file name shown in the header
//! - `{…}`: lines to highlight
//! - `add={…}` / `del={…}`: lines shown as added / removed
//!
//! Every line is numbered. Malformed ranges are dropped and reported back
//! to the caller so the document still renders.

use maud::html;

/// Inclusive, 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    fn contains(&self, line: usize) -> bool {
        (self.start..=self.end).contains(&line)
    }
}

/// Parsed fence info string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeInfo {
    pub language: Option<String>,
    pub filename: Option<String>,
    pub highlight: Vec<LineRange>,
    pub added: Vec<LineRange>,
    pub deleted: Vec<LineRange>,
}

impl CodeInfo {
    /// CSS class for a line. Removed wins over added, added over highlighted.
    pub fn line_class(&self, line: usize) -> Option<&'static str> {
        let hit = |ranges: &[LineRange]| ranges.iter().any(|r| r.contains(line));
        if hit(&self.deleted) {
            Some("highlight-del")
        } else if hit(&self.added) {
            Some("highlight-add")
        } else if hit(&self.highlight) {
            Some("highlight")
        } else {
            None
        }
    }
}

/// Parse an info string. Problems are returned alongside the usable parts.
pub fn parse_info(info: &str) -> (CodeInfo, Vec<String>) {
    let mut parsed = CodeInfo::default();
    let mut problems = Vec::new();

    for (i, token) in tokenize(info).into_iter().enumerate() {
        if let Some(value) = token.strip_prefix("title=") {
            let name = unquote(value);
            if !name.is_empty() {
                parsed.filename = Some(name.to_string());
            }
        } else if let Some(value) = token.strip_prefix("add=") {
            parsed.added.extend(parse_ranges(value, &mut problems));
        } else if let Some(value) = token.strip_prefix("del=") {
            parsed.deleted.extend(parse_ranges(value, &mut problems));
        } else if token.starts_with('{') {
            parsed.highlight.extend(parse_ranges(&token, &mut problems));
        } else if i == 0 && !token.contains('=') {
            parsed.language = Some(token);
        }
    }
    (parsed, problems)
}

/// Split on whitespace outside of quotes and braces.
fn tokenize(info: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_braces = false;

    for c in info.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    current.push(c);
                }
                '{' => {
                    in_braces = true;
                    current.push(c);
                }
                '}' => {
                    in_braces = false;
                    current.push(c);
                }
                c if c.is_whitespace() && !in_braces => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                c if c.is_whitespace() => {}
                c => current.push(c),
            },
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

fn parse_ranges(value: &str, problems: &mut Vec<String>) -> Vec<LineRange> {
    let Some(inner) = value.strip_prefix('{').and_then(|v| v.strip_suffix('}')) else {
        problems.push(format!("line ranges must be wrapped in braces: {value:?}"));
        return Vec::new();
    };

    let mut ranges = Vec::new();
    for part in inner.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let range = match part.split_once('-') {
            Some((start, end)) => start
                .trim()
                .parse::<usize>()
                .ok()
                .zip(end.trim().parse::<usize>().ok())
                .map(|(start, end)| LineRange { start, end }),
            None => part
                .parse::<usize>()
                .ok()
                .map(|n| LineRange { start: n, end: n }),
        };
        match range {
            Some(r) if r.start >= 1 && r.start <= r.end => ranges.push(r),
            _ => problems.push(format!("ignored line range {part:?}")),
        }
    }
    ranges
}

/// Render a code block. Returns the markup and any info-string problems.
pub fn render(info: &str, code: &str) -> (String, Vec<String>) {
    let (parsed, problems) = parse_info(info);
    let lines: Vec<&str> = code.lines().collect();
    let width = lines.len().max(1).to_string().len();
    let language_class = parsed.language.as_ref().map(|l| format!("language-{l}"));

    let markup = html! {
        div.code-block {
            div.code-header {
                @if let Some(filename) = &parsed.filename {
                    span.code-filename { (filename) }
                }
                div {
                    @if let Some(language) = &parsed.language {
                        span.code-language { (language) }
                    }
                    button.copy-button type="button" onclick="copyCode(this)" { "copy" }
                }
            }
            pre {
                code class=[language_class] {
                    @for (i, line) in lines.iter().enumerate() {
                        span class=[parsed.line_class(i + 1)] {
                            span.line-number { (format!("{:0width$}", i + 1)) }
                            span.code-line { (line) }
                        }
                        "\n"
                    }
                }
            }
        }
    };
    (markup.into_string(), problems)
}
