//! Host seams: the scrollable viewport and image elements the store acts on.

use std::fmt;

/// Inline width/height reserved for an image before it has loaded.
///
/// Each dimension is applied on its own; a missing one leaves that axis
/// to the natural layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutHint {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl LayoutHint {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }
}

/// `640x360`, with `auto` for a missing dimension.
impl fmt::Display for LayoutHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.width {
            Some(w) => write!(f, "{w}")?,
            None => write!(f, "auto")?,
        }
        match self.height {
            Some(h) => write!(f, "x{h}"),
            None => write!(f, "xauto"),
        }
    }
}

/// The window's vertical scroll position.
pub trait Viewport {
    fn scroll_top(&self) -> u32;
    fn set_scroll_top(&mut self, offset: u32);
}

/// An image element in the page.
pub trait ImageElement {
    /// The `src` attribute as written in the document (may be relative).
    fn src(&self) -> &str;

    /// Natural `(width, height)` once decoded, `None` while loading.
    fn natural_size(&self) -> Option<(u32, u32)>;

    /// Set (`Some`) or clear (`None`) the inline layout hint.
    fn set_layout_hint(&mut self, hint: Option<LayoutHint>);
}

/// A viewport that only records its offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedViewport {
    offset: u32,
    /// Number of `set_scroll_top` calls seen.
    pub writes: usize,
}

impl FixedViewport {
    pub fn at(offset: u32) -> Self {
        Self { offset, writes: 0 }
    }
}

impl Viewport for FixedViewport {
    fn scroll_top(&self) -> u32 {
        self.offset
    }

    fn set_scroll_top(&mut self, offset: u32) {
        self.offset = offset;
        self.writes += 1;
    }
}

/// An image whose natural size is supplied up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticImage {
    src: String,
    natural: Option<(u32, u32)>,
    hint: Option<LayoutHint>,
}

impl StaticImage {
    /// An image that has not finished loading.
    pub fn pending(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            natural: None,
            hint: None,
        }
    }

    /// Mark the image as decoded with the given natural size.
    pub fn finish(&mut self, width: u32, height: u32) {
        self.natural = Some((width, height));
    }

    pub fn layout_hint(&self) -> Option<LayoutHint> {
        self.hint
    }
}

impl ImageElement for StaticImage {
    fn src(&self) -> &str {
        &self.src
    }

    fn natural_size(&self) -> Option<(u32, u32)> {
        self.natural
    }

    fn set_layout_hint(&mut self, hint: Option<LayoutHint>) {
        self.hint = hint;
    }
}
