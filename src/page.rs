//! Rendered pages that carry their own state.
//!
//! A Markdown document is rendered into a standalone HTML page whose
//! `<title>` holds the encoded [`PageState`]. On rebuild the previous page's
//! title is read back, so scroll position and image sizes survive the reload.
//! [`TitleSlot`] exposes that title as a [`Slot`].

use std::io;
use std::sync::LazyLock;

use log::debug;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use regex::Regex;

use crate::anchor::collect_anchors;
use crate::slot::Slot;
use crate::state::{PageState, encode};

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title(?:\s[^>]*)?>(.*?)</title\s*>").unwrap()
});

/// Render Markdown to an HTML fragment.
///
/// Headings get the same ids [`collect_anchors`] reports, so anchor
/// fragments resolve inside the page.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut slugs = collect_anchors(markdown).into_iter().map(|a| a.slug);
    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Start(Tag::Heading {
            level,
            id,
            classes,
            attrs,
        }) => Event::Start(Tag::Heading {
            level,
            id: slugs.next().map(CowStr::from).or(id),
            classes,
            attrs,
        }),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

/// Wrap an HTML body in the page layout, embedding `state` in the title.
pub fn build_page(body: &str, state: &PageState) -> String {
    let page_state = escape_html(&encode(state));
    debug!("page: building with state {page_state}");
    format!(
        include_str!("../res/layout.html"),
        page_state = page_state,
        body = body,
    )
}

/// Render `markdown` into a full page carrying `state`.
pub fn render_page(markdown: &str, state: &PageState) -> String {
    build_page(&render_markdown(markdown), state)
}

/// Text content of the page's `<title>`, entity-decoded.
pub fn extract_title(page: &str) -> Option<String> {
    let caps = TITLE_RE.captures(page)?;
    Some(unescape_html(caps.get(1)?.as_str().trim()))
}

/// Replace the `<title>` text. `None` if the page has no title element.
pub fn replace_title(page: &str, text: &str) -> Option<String> {
    let range = TITLE_RE.captures(page)?.get(1)?.range();
    let escaped = escape_html(text);
    let mut out = String::with_capacity(page.len() - range.len() + escaped.len());
    out.push_str(&page[..range.start]);
    out.push_str(&escaped);
    out.push_str(&page[range.end..]);
    Some(out)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// A slot stored in the `<title>` of a page kept in another slot.
///
/// Writes rewrite only the title and leave the rest of the page untouched.
/// Writing before a page exists fails, as there is no title to hold the state.
#[derive(Debug, Clone)]
pub struct TitleSlot<S> {
    page: S,
}

impl<S: Slot> TitleSlot<S> {
    pub fn new(page: S) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &S {
        &self.page
    }

    pub fn into_inner(self) -> S {
        self.page
    }
}

impl<S: Slot> Slot for TitleSlot<S> {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.page.read()?.and_then(|page| extract_title(&page)))
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        let page = self
            .page
            .read()?
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no page to hold the state"))?;
        let updated = replace_title(&page, text)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "page has no <title> element"))?;
        self.page.write(&updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FixedViewport, StaticImage, Viewport};
    use crate::slot::MemorySlot;
    use crate::state::decode;
    use crate::store::{PageStateStore, StoreOptions};

    const DOC: &str = "# Guide\n\nSome *text*.\n\n## Usage\n\n![arch](https://a.invalid/arch.png)\n\n## Usage\n";

    #[test]
    fn headings_carry_anchor_ids() {
        let html = render_markdown(DOC);
        assert!(html.contains(r#"<h1 id="guide">Guide</h1>"#), "{html}");
        assert!(html.contains(r#"<h2 id="usage">Usage</h2>"#), "{html}");
        assert!(html.contains(r#"<h2 id="usage-1">Usage</h2>"#), "{html}");
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn explicit_heading_id_kept() {
        let html = render_markdown("## Setup {#install}\n");
        assert!(html.contains(r#"<h2 id="install">Setup</h2>"#), "{html}");
    }

    #[test]
    fn page_title_holds_state() {
        let mut state = PageState {
            scroll_top: 512,
            ..PageState::default()
        };
        state.record_image("https://a.invalid/q?a=1&b=<2>", 30, 40);
        let page = render_page(DOC, &state);

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("&amp;b=&lt;2&gt;"));
        let title = extract_title(&page).unwrap();
        assert_eq!(decode(&title).unwrap(), state);
    }

    #[test]
    fn replace_title_keeps_body() {
        let page = render_page(DOC, &PageState::default());
        let updated = replace_title(&page, "{\"scroll_top\":3}").unwrap();
        assert_eq!(extract_title(&updated).as_deref(), Some("{\"scroll_top\":3}"));
        assert!(updated.contains(r#"<h2 id="usage-1">Usage</h2>"#));
        assert_eq!(replace_title("<p>no head</p>", "x"), None);
    }

    #[test]
    fn title_with_attributes() {
        let page = "<html><head><TITLE lang=\"en\">\n  120\n</TITLE></head></html>";
        assert_eq!(extract_title(page).as_deref(), Some("120"));
        assert_eq!(extract_title("<titles>x</titles>"), None);
    }

    #[test]
    fn state_survives_rebuild() {
        let page = MemorySlot::with_text(render_page(DOC, &PageState::default()));
        let mut store = PageStateStore::load(TitleSlot::new(page.clone()), StoreOptions::default());
        store.on_scroll(&FixedViewport::at(900));
        let mut img = StaticImage::pending("https://a.invalid/arch.png");
        img.finish(1024, 768);
        store.on_image_load(&mut img);

        // Rebuild from the edited document, carrying the old title's state.
        let previous = PageStateStore::load(TitleSlot::new(page.clone()), StoreOptions::default());
        let mut rebuilt = page.clone();
        rebuilt
            .write(&render_page("# Guide\n\nEdited.\n", previous.state()))
            .unwrap();

        let store = PageStateStore::load(TitleSlot::new(page.clone()), StoreOptions::default());
        let mut viewport = FixedViewport::at(0);
        store.restore_scroll(&mut viewport);
        assert_eq!(viewport.scroll_top(), 900);
        assert_eq!(
            store.state().image_size("https://a.invalid/arch.png"),
            Some((1024, 768))
        );
        assert!(page.text().unwrap().contains("Edited."));
    }

    #[test]
    fn foreign_title_loads_default() {
        let page = MemorySlot::with_text("<html><head><title>Release notes</title></head></html>");
        let store = PageStateStore::load(TitleSlot::new(page), StoreOptions::default());
        assert_eq!(store.state(), &PageState::default());
    }

    #[test]
    fn write_without_page_fails() {
        let mut slot = TitleSlot::new(MemorySlot::new());
        assert_eq!(slot.read().unwrap(), None);
        let err = slot.write("{}").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let mut slot = TitleSlot::new(MemorySlot::with_text("<p>bare</p>"));
        let err = slot.write("{}").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(slot.page().text().as_deref(), Some("<p>bare</p>"));
    }
}
