//! PageStateStore: the one owner of a page's state and its slot.
//!
//! Lifecycle:
//!   load   → read + decode the slot (default state on any failure)
//!   events → `on_scroll` / `on_image_load` mutate, then persist
//!   unload → drop the store (or `into_slot` to hand the slot to the next page)
//!
//! Nothing here reports errors to the caller. Slot and decode failures are
//! logged and the in-memory state stays authoritative.

use log::{debug, info, warn};
use url::Url;

use crate::host::{ImageElement, LayoutHint, Viewport};
use crate::slot::Slot;
use crate::state::{self, DecodeError, PageState};

/// Knobs for a store, resolved from config.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Base URL that relative image sources are resolved against.
    pub base_url: Option<Url>,
    /// Skip slot writes whose text equals the previous write.
    pub coalesce_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            coalesce_writes: true,
        }
    }
}

pub struct PageStateStore<S: Slot> {
    slot: S,
    state: PageState,
    options: StoreOptions,
    /// Text of the last successful write (coalescing only).
    last_written: Option<String>,
}

impl<S: Slot> PageStateStore<S> {
    /// Read the slot and build the store. Never fails.
    pub fn load(slot: S, options: StoreOptions) -> Self {
        let state = match slot.read() {
            Ok(Some(text)) => match state::decode(&text) {
                Ok(s) => {
                    info!(
                        "store: loaded scroll_top={}, {} cached image(s)",
                        s.scroll_top,
                        s.cached_image_count()
                    );
                    s
                }
                Err(DecodeError::Empty) => {
                    debug!("store: slot is empty, starting fresh");
                    PageState::default()
                }
                Err(e) => {
                    warn!("store: {e}; starting fresh");
                    PageState::default()
                }
            },
            Ok(None) => {
                debug!("store: slot never written, starting fresh");
                PageState::default()
            }
            Err(e) => {
                warn!("store: failed to read slot: {e}; starting fresh");
                PageState::default()
            }
        };
        Self {
            slot,
            state,
            options,
            last_written: None,
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// End the page: give the slot back for the next load.
    pub fn into_slot(self) -> S {
        self.slot
    }

    /// Scroll the viewport to the persisted offset.
    ///
    /// The scroll event this triggers comes back through `on_scroll` with the
    /// same offset, which leaves the state unchanged.
    pub fn restore_scroll(&self, viewport: &mut impl Viewport) {
        debug!("store: restoring scroll_top={}", self.state.scroll_top);
        viewport.set_scroll_top(self.state.scroll_top);
    }

    /// Scroll event: take the viewport's current offset and persist.
    pub fn on_scroll(&mut self, viewport: &impl Viewport) {
        let offset = viewport.scroll_top();
        if offset != self.state.scroll_top {
            debug!("store: scroll_top {} → {offset}", self.state.scroll_top);
        }
        self.state.scroll_top = offset;
        self.persist();
    }

    /// Before load: reserve the image's cached width and/or height.
    ///
    /// Whichever dimensions are cached are applied. Returns the hint that was
    /// applied; images with neither dimension cached get no hint.
    pub fn apply_cached_image_size(&self, image: &mut impl ImageElement) -> Option<LayoutHint> {
        let key = self.resolve_image_url(image.src())?;
        let hint = LayoutHint {
            width: self.state.image_widths.get(&key).copied(),
            height: self.state.image_heights.get(&key).copied(),
        };
        if hint.width.is_none() && hint.height.is_none() {
            debug!("store: no cached size for {key}");
            return None;
        }
        debug!("store: hint {hint} for {key}");
        image.set_layout_hint(Some(hint));
        Some(hint)
    }

    /// Image finished loading: drop the hint, cache the natural size, persist.
    pub fn on_image_load(&mut self, image: &mut impl ImageElement) {
        image.set_layout_hint(None);
        let Some(key) = self.resolve_image_url(image.src()) else {
            return;
        };
        let Some((width, height)) = image.natural_size() else {
            debug!("store: load event for {key} without a natural size");
            return;
        };
        if !self.state.record_image(&key, width, height) {
            debug!("store: not caching {key} with empty size {width}x{height}");
            return;
        }
        debug!("store: cached {key} as {width}x{height}");
        self.persist();
    }

    /// Serialize the whole state into the slot.
    pub fn persist(&mut self) {
        let text = state::encode(&self.state);
        if self.options.coalesce_writes && self.last_written.as_deref() == Some(text.as_str()) {
            return;
        }
        match self.slot.write(&text) {
            Ok(()) => {
                if self.options.coalesce_writes {
                    self.last_written = Some(text);
                }
            }
            Err(e) => {
                warn!("store: failed to write slot: {e}");
                self.last_written = None;
            }
        }
    }

    /// Absolute URL used as the cache key for an image source.
    pub fn resolve_image_url(&self, src: &str) -> Option<String> {
        let parsed = match Url::parse(src) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.options.base_url {
                Some(base) => base.join(src),
                None => {
                    debug!("store: relative image source {src:?} with no base URL");
                    return None;
                }
            },
            Err(e) => Err(e),
        };
        match parsed {
            Ok(url) => Some(url.into()),
            Err(e) => {
                debug!("store: unusable image source {src:?}: {e}");
                None
            }
        }
    }
}
