//! Heading anchors: stable, de-duplicated ids for every heading.

use std::collections::HashMap;

use log::debug;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// A heading and the anchor id generated for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingAnchor {
    /// 1..=6
    pub level: u8,
    pub text: String,
    pub slug: String,
    /// 1-based Markdown source line of the heading.
    pub line: usize,
}

impl HeadingAnchor {
    /// Fragment form, e.g. `#getting-started`.
    pub fn fragment(&self) -> String {
        format!("#{}", self.slug)
    }
}

/// GitHub-style slug: lowercase alphanumerics, runs of spaces, `-` and `_`
/// collapse to a single `-`, other punctuation is dropped.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        out.push_str("section");
    }
    out
}

/// Collect every heading in `markdown` with a unique anchor.
///
/// Repeated slugs get `-1`, `-2`, ... in document order. An explicit
/// `{#id}` attribute replaces the generated slug but is de-duplicated the
/// same way.
pub fn collect_anchors(markdown: &str) -> Vec<HeadingAnchor> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut anchors = Vec::new();
    let mut used: HashMap<String, usize> = HashMap::new();
    // (level, explicit id, text, byte offset)
    let mut current: Option<(u8, Option<String>, String, usize)> = None;

    for (event, range) in Parser::new_ext(markdown, options).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                let explicit = id.map(|s| s.into_string());
                current = Some((level as u8, explicit, String::new(), range.start));
            }
            Event::End(TagEnd::Heading(_)) => {
                let Some((level, explicit, text, offset)) = current.take() else {
                    continue;
                };
                let text = text.trim().to_string();
                let base = explicit
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| slugify(&text));
                let slug = unique_slug(&mut used, base);
                let line = line_of(markdown, offset);
                debug!("anchor: L{line} h{level} {text:?} → #{slug}");
                anchors.push(HeadingAnchor {
                    level,
                    text,
                    slug,
                    line,
                });
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some((_, _, text, _)) = current.as_mut() {
                    text.push_str(&t);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, _, text, _)) = current.as_mut() {
                    text.push(' ');
                }
            }
            _ => {}
        }
    }
    anchors
}

fn unique_slug(used: &mut HashMap<String, usize>, base: String) -> String {
    let Some(&next) = used.get(&base) else {
        used.insert(base.clone(), 1);
        return base;
    };
    let mut count = next.max(1);
    loop {
        let candidate = format!("{base}-{count}");
        count += 1;
        if !used.contains_key(&candidate) {
            used.insert(base, count);
            used.insert(candidate.clone(), 1);
            return candidate;
        }
    }
}

/// 1-based line number of a byte offset.
pub(crate) fn line_of(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}
