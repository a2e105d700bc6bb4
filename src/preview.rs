//! Link preview: every link in a document, with a short label for hover display.

use std::sync::LazyLock;

use log::debug;
use pulldown_cmark::{Event, LinkType, Options, Parser, Tag, TagEnd};
use regex::Regex;
use url::Url;

use crate::anchor::line_of;

/// Bare `http(s)://` URLs in prose. Trailing punctuation that usually
/// belongs to the sentence (`. , ; : ! ? - ' "`) is left out.
static BARE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>\)\]\}]+[^\s<>\)\]\}.,:;!?\-'"]"#).unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub url: String,
    /// Link text; the URL itself for bare links.
    pub text: String,
    /// 1-based Markdown source line.
    pub line: usize,
}

/// Collect `[text](url)` links, autolinks and bare URLs, in document order.
///
/// A bare URL that repeats a link already found on the same line is skipped.
pub fn collect_links(markdown: &str) -> Vec<LinkEntry> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut links: Vec<LinkEntry> = Vec::new();
    let mut current: Option<LinkEntry> = None;
    // (line, text, end offset) of prose outside links; adjacent fragments merged
    let mut bare: Vec<(usize, String, usize)> = Vec::new();

    for (event, range) in Parser::new_ext(markdown, options).into_offset_iter() {
        match event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                ..
            }) => {
                let url = match link_type {
                    LinkType::Email => format!("mailto:{dest_url}"),
                    _ => dest_url.into_string(),
                };
                current = Some(LinkEntry {
                    url,
                    text: String::new(),
                    line: line_of(markdown, range.start),
                });
            }
            Event::End(TagEnd::Link) => {
                if let Some(entry) = current.take()
                    && !entry.url.is_empty()
                {
                    links.push(entry);
                }
            }
            Event::Text(t) | Event::Code(t) if current.is_some() => {
                if let Some(entry) = current.as_mut() {
                    entry.text.push_str(&t);
                }
            }
            Event::Text(t) => match bare.last_mut() {
                Some((_, text, end)) if *end == range.start => {
                    text.push_str(&t);
                    *end = range.end;
                }
                _ => bare.push((line_of(markdown, range.start), t.into_string(), range.end)),
            },
            _ => {}
        }
    }

    // Bare URLs are gathered after the pass so that a link later on the
    // same line still suppresses its bare duplicate.
    for (line, text, _) in bare {
        for m in BARE_URL_RE.find_iter(&text) {
            let url = m.as_str();
            if links.iter().any(|l| l.line == line && l.url == url) {
                continue;
            }
            links.push(LinkEntry {
                url: url.to_string(),
                text: url.to_string(),
                line,
            });
        }
    }
    links.sort_by_key(|l| l.line);
    debug!("preview: {} link(s)", links.len());
    links
}

/// Short label for a link target: `host/path` for web URLs, verbatim otherwise.
/// Trailing `/` is trimmed, so a root URL is just its host. Labels over
/// `max_chars` are cut and end in `…`.
pub fn preview_label(url: &str, max_chars: usize) -> String {
    let label = match Url::parse(url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {
            let host = u.host_str().unwrap_or_default();
            let path = u.path().trim_end_matches('/');
            format!("{host}{path}")
        }
        _ => url.to_string(),
    };
    truncate(&label, max_chars)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

/// Link list with a clamped selection, as a hover/click preview walks it.
pub struct Preview {
    pub entries: Vec<LinkEntry>,
    pub selected: usize,
}

impl Preview {
    pub fn new(entries: Vec<LinkEntry>) -> Self {
        Self {
            entries,
            selected: 0,
        }
    }

    pub fn select_next(&mut self) {
        if !self.entries.is_empty() {
            self.selected = (self.selected + 1).min(self.entries.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Select the 1-based entry `n`. Returns `false` if out of range.
    pub fn select_number(&mut self, n: usize) -> bool {
        if n == 0 || n > self.entries.len() {
            return false;
        }
        self.selected = n - 1;
        true
    }

    pub fn selected_url(&self) -> Option<&str> {
        self.entries.get(self.selected).map(|e| e.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(md: &str) -> Vec<String> {
        collect_links(md).into_iter().map(|l| l.url).collect()
    }

    #[test]
    fn markdown_links_with_text_and_line() {
        let md = "See [Rust](https://rust.invalid/) here.\nPlain line.\n[Docs](https://docs.invalid/)\n";
        let links = collect_links(md);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].text, "Rust");
        assert_eq!(links[0].line, 1);
        assert_eq!(links[1].url, "https://docs.invalid/");
        assert_eq!(links[1].line, 3);
    }

    #[test]
    fn bare_urls_trailing_punctuation() {
        assert_eq!(urls("See https://example.invalid/page."), vec!["https://example.invalid/page"]);
        assert_eq!(urls("https://example.invalid/page, more"), vec!["https://example.invalid/page"]);
        assert_eq!(urls("URL: https://example.invalid:"), vec!["https://example.invalid"]);
    }

    #[test]
    fn bare_url_query_and_fragment() {
        assert_eq!(
            urls("go to https://example.invalid/path?q=1&r=2#frag now"),
            vec!["https://example.invalid/path?q=1&r=2#frag"]
        );
    }

    #[test]
    fn bare_duplicate_of_link_on_same_line_skipped() {
        let md = "https://a.invalid/x and [again](https://a.invalid/x)\n";
        let links = collect_links(md);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "again");
    }

    #[test]
    fn autolink_counted_once() {
        let links = collect_links("<https://a.invalid/auto>\n");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://a.invalid/auto");
    }

    #[test]
    fn email_autolink_gets_mailto() {
        assert_eq!(urls("<someone@example.invalid>\n"), vec!["mailto:someone@example.invalid"]);
    }

    #[test]
    fn code_in_link_text() {
        let links = collect_links("[`Vec::push`](https://doc.invalid/vec#push)\n");
        assert_eq!(links[0].text, "Vec::push");
    }

    #[test]
    fn no_links() {
        assert!(collect_links("plain text\n").is_empty());
    }

    #[test]
    fn label_web_url() {
        assert_eq!(
            preview_label("https://docs.invalid/book/ch01.html?x=1#top", 80),
            "docs.invalid/book/ch01.html"
        );
        assert_eq!(preview_label("https://docs.invalid/", 80), "docs.invalid");
        assert_eq!(preview_label("https://docs.invalid/a/b/", 80), "docs.invalid/a/b");
    }

    #[test]
    fn label_other_schemes_verbatim() {
        assert_eq!(preview_label("#install", 80), "#install");
        assert_eq!(preview_label("mailto:a@b.invalid", 80), "mailto:a@b.invalid");
    }

    #[test]
    fn label_truncates_on_char_boundary() {
        assert_eq!(preview_label("日本語のページへのリンク", 5), "日本語の…");
        assert_eq!(preview_label("short", 0), "");
    }

    #[test]
    fn selection_clamps() {
        let mut p = Preview::new(collect_links("[a](https://a.invalid/) [b](https://b.invalid/)\n"));
        assert_eq!(p.selected_url(), Some("https://a.invalid/"));
        p.select_next();
        p.select_next();
        assert_eq!(p.selected_url(), Some("https://b.invalid/"));
        p.select_prev();
        p.select_prev();
        assert_eq!(p.selected, 0);
        assert!(p.select_number(2));
        assert!(!p.select_number(3));
        assert!(!p.select_number(0));
        assert_eq!(p.selected, 1);
    }

    #[test]
    fn empty_preview() {
        let mut p = Preview::new(Vec::new());
        p.select_next();
        assert_eq!(p.selected_url(), None);
    }
}
