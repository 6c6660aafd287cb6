//! Per-file read progress.
//!
//! Tracks the byte offset reached in each file and any trailing fragment
//! that was read but not yet terminated by a delimiter. Both live only for
//! the lifetime of the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Undelimited bytes and the file position right after them.
#[derive(Debug)]
struct Fragment {
    ends_at: u64,
    bytes: Vec<u8>,
}

/// Byte cursors and pending fragments, keyed by file path.
#[derive(Debug, Default)]
pub struct OffsetStore {
    offsets: HashMap<PathBuf, u64>,
    pending: HashMap<PathBuf, Fragment>,
}

impl OffsetStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the stored offset for a file, 0 if the file has not been read.
    pub fn get(&self, path: &Path) -> u64 {
        self.offsets.get(path).copied().unwrap_or(0)
    }

    /// Advance the offset for a file by `delta` bytes.
    pub fn advance(&mut self, path: &Path, delta: u64) {
        let offset = self.offsets.entry(path.to_path_buf()).or_insert(0);
        *offset = offset.saturating_add(delta);
    }

    /// Move the offset for a file forward to `position`.
    ///
    /// The offset never moves backwards: re-reading an earlier range leaves
    /// it where it was.
    pub fn advance_to(&mut self, path: &Path, position: u64) {
        let offset = self.offsets.entry(path.to_path_buf()).or_insert(0);
        *offset = (*offset).max(position);
    }

    /// Bytes carried over from the previous length-mode read.
    pub fn pending(&self, path: &Path) -> &[u8] {
        self.pending
            .get(path)
            .map(|f| f.bytes.as_slice())
            .unwrap_or(&[])
    }

    /// The pending fragment if it ends exactly at `position`, else nothing.
    ///
    /// A read starting anywhere else must not be prefixed with it.
    pub fn pending_at(&self, path: &Path, position: u64) -> &[u8] {
        match self.pending.get(path) {
            Some(fragment) if fragment.ends_at == position => &fragment.bytes,
            _ => &[],
        }
    }

    /// Replace the pending fragment for a file. An empty fragment clears it.
    pub fn set_pending(&mut self, path: &Path, ends_at: u64, bytes: Vec<u8>) {
        if bytes.is_empty() {
            self.pending.remove(path);
        } else {
            self.pending
                .insert(path.to_path_buf(), Fragment { ends_at, bytes });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_default_to_zero() {
        let store = OffsetStore::new();
        assert_eq!(store.get(Path::new("data.dat")), 0);
    }

    #[test]
    fn test_advance_accumulates_per_file() {
        let mut store = OffsetStore::new();
        store.advance(Path::new("a.dat"), 10);
        store.advance(Path::new("a.dat"), 5);
        store.advance_to(Path::new("b.dat"), 3);

        assert_eq!(store.get(Path::new("a.dat")), 15);
        assert_eq!(store.get(Path::new("b.dat")), 3);
    }

    #[test]
    fn test_advance_to_never_moves_backwards() {
        let mut store = OffsetStore::new();
        let path = Path::new("a.dat");

        store.advance_to(path, 14);
        store.advance_to(path, 7);

        assert_eq!(store.get(path), 14);
    }

    #[test]
    fn test_pending_fragment_lifecycle() {
        let mut store = OffsetStore::new();
        let path = Path::new("data.dat");

        assert!(store.pending(path).is_empty());

        store.set_pending(path, 9, b"12".to_vec());
        assert_eq!(store.pending(path), b"12");

        store.set_pending(path, 9, Vec::new());
        assert!(store.pending(path).is_empty());
    }

    #[test]
    fn test_pending_at_requires_matching_position() {
        let mut store = OffsetStore::new();
        let path = Path::new("data.dat");
        store.set_pending(path, 13, b"2,bob".to_vec());

        assert_eq!(store.pending_at(path, 13), b"2,bob");
        assert!(store.pending_at(path, 0).is_empty());
        assert!(store.pending_at(path, 8).is_empty());
        assert_eq!(store.pending(path), b"2,bob");
    }
}
