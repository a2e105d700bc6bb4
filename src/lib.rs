pub mod anchor;
pub mod clipboard;
pub mod config;
pub mod host;
pub mod page;
pub mod preview;
pub mod slot;
pub mod state;
pub mod store;

pub use host::{FixedViewport, ImageElement, LayoutHint, StaticImage, Viewport};
pub use page::TitleSlot;
pub use slot::{FileSlot, MemorySlot, Slot};
pub use state::{DecodeError, PageState};
pub use store::{PageStateStore, StoreOptions};
