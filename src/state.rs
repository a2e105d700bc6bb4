//! Page state and its slot encoding.
//!
//! The slot always holds a compact JSON record:
//!
//! ```text
//! {"scroll_top":120,"image_widths":{"https://a.invalid/x.png":640},"image_heights":{...}}
//! ```
//!
//! Older slots may hold a bare scroll offset (`"120"`). Those are still
//! readable, but every write uses the record form.
//!
//! Browsers report fractional pixels (`1840.5`, `640.0`). Any JSON number is
//! accepted on read and rounded to whole pixels; negatives clamp to zero.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Transient per-page UI state.
///
/// Maps are ordered so that a given state always encodes to the same text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageState {
    /// Vertical scroll offset in pixels.
    #[serde(deserialize_with = "de_pixels")]
    pub scroll_top: u32,
    /// Absolute image URL → natural width in pixels.
    #[serde(deserialize_with = "de_pixel_map")]
    pub image_widths: BTreeMap<String, u32>,
    /// Absolute image URL → natural height in pixels.
    #[serde(deserialize_with = "de_pixel_map")]
    pub image_heights: BTreeMap<String, u32>,
}

/// Round a reported pixel value to `u32`, clamping into range.
fn pixels(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, u32::MAX as f64) as u32
}

fn de_pixels<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    f64::deserialize(d).map(pixels)
}

fn de_pixel_map<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, u32>, D::Error> {
    let raw = BTreeMap::<String, f64>::deserialize(d)?;
    Ok(raw.into_iter().map(|(k, v)| (k, pixels(v))).collect())
}

impl PageState {
    /// Cached `(width, height)` for `url`, if both dimensions are known.
    pub fn image_size(&self, url: &str) -> Option<(u32, u32)> {
        let w = *self.image_widths.get(url)?;
        let h = *self.image_heights.get(url)?;
        Some((w, h))
    }

    /// Record an image's natural size. Zero dimensions are ignored.
    ///
    /// Returns `true` if the size was recorded.
    pub fn record_image(&mut self, url: &str, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.image_widths.insert(url.to_string(), width);
        self.image_heights.insert(url.to_string(), height);
        true
    }

    /// Number of URLs with a cached size.
    pub fn cached_image_count(&self) -> usize {
        self.image_widths
            .keys()
            .filter(|k| self.image_heights.contains_key(*k))
            .count()
    }

    fn drop_zero_sizes(&mut self) {
        self.image_widths.retain(|_, v| *v > 0);
        self.image_heights.retain(|_, v| *v > 0);
    }
}

/// Why a slot's text could not be turned into a [`PageState`].
#[derive(Debug)]
pub enum DecodeError {
    /// The slot is empty or whitespace.
    Empty,
    /// The text is neither a state record nor a bare scroll offset.
    Malformed(serde_json::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "slot is empty"),
            DecodeError::Malformed(e) => write!(f, "malformed page state: {e}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Empty => None,
            DecodeError::Malformed(e) => Some(e),
        }
    }
}

/// Serialize a state into slot text.
pub fn encode(state: &PageState) -> String {
    // Only string keys and integers: serialization cannot fail.
    serde_json::to_string(state).unwrap_or_default()
}

/// Parse slot text back into a state.
pub fn decode(text: &str) -> Result<PageState, DecodeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DecodeError::Empty);
    }
    if let Ok(offset) = text.parse::<f64>()
        && offset.is_finite()
    {
        return Ok(PageState {
            scroll_top: pixels(offset),
            ..PageState::default()
        });
    }
    let mut state: PageState = serde_json::from_str(text).map_err(DecodeError::Malformed)?;
    state.drop_zero_sizes();
    Ok(state)
}
