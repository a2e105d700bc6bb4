//! Single-cell text storage for page state.
//!
//! A slot holds one string and is overwritten as a whole on every write.
//! In a browser this is the title element; here it is either an in-process
//! cell or one file on disk.

use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;

/// A persisted single text cell.
pub trait Slot {
    /// Current contents, or `None` if nothing was ever written.
    fn read(&self) -> io::Result<Option<String>>;

    /// Replace the contents with `text` in one synchronous write.
    fn write(&mut self, text: &str) -> io::Result<()>;
}

/// In-process slot. Clones share the same cell, so a slot outlives the
/// store that was writing it and can be handed to a fresh store.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    cell: Rc<RefCell<Option<String>>>,
    writes: Rc<RefCell<usize>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-filled with `text`, as if a previous page had written it.
    pub fn with_text(text: impl Into<String>) -> Self {
        let slot = Self::default();
        *slot.cell.borrow_mut() = Some(text.into());
        slot
    }

    pub fn text(&self) -> Option<String> {
        self.cell.borrow().clone()
    }

    /// Number of writes that reached this cell (across all clones).
    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

impl Slot for MemorySlot {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.text())
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        *self.cell.borrow_mut() = Some(text.to_string());
        *self.writes.borrow_mut() += 1;
        Ok(())
    }
}

/// File-backed slot.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so readers never observe a half-written slot.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "slot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Slot for FileSlot {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                debug!("slot: read {} bytes from {}", text.len(), self.path.display());
                Ok(Some(text))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("slot: {} does not exist yet", self.path.display());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(text.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!("slot: wrote {} bytes to {}", text.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_slot_starts_empty() {
        let slot = MemorySlot::new();
        assert_eq!(slot.read().unwrap(), None);
        assert_eq!(slot.write_count(), 0);
    }

    #[test]
    fn memory_slot_clones_share_cell() {
        let mut a = MemorySlot::new();
        let b = a.clone();
        a.write("one").unwrap();
        a.write("two").unwrap();
        assert_eq!(b.read().unwrap().as_deref(), Some("two"));
        assert_eq!(b.write_count(), 2);
    }

    #[test]
    fn memory_slot_prefilled() {
        let slot = MemorySlot::with_text("42");
        assert_eq!(slot.text().as_deref(), Some("42"));
        assert_eq!(slot.write_count(), 0);
    }

    #[test]
    fn file_slot_missing_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("absent.json"));
        assert_eq!(slot.read().unwrap(), None);
    }

    #[test]
    fn file_slot_overwrites_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/state.json");
        let mut slot = FileSlot::new(&path);
        slot.write("first, and longer than the second").unwrap();
        slot.write("second").unwrap();
        assert_eq!(slot.read().unwrap().as_deref(), Some("second"));
        assert!(!slot.temp_path().exists());
    }
}
