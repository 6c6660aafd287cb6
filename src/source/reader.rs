//! Resumable batch reader.
//!
//! Reads a bounded batch of records from a file starting at a byte offset,
//! advances the file's stored offset by the number of bytes physically
//! consumed, and carries undelimited trailing bytes over to the next call so
//! that a record split across two reads is decoded exactly once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::codec::{Codec, DELIMITER, Record};
use crate::emit;
use crate::metrics::events::{BytesRead, RecordsRead};

use super::state::OffsetStore;

/// Default maximum number of records returned by one read.
pub const DEFAULT_MAX_READ: usize = 1000;

/// Default number of bytes requested per physical read.
pub const DEFAULT_READ_LENGTH: usize = 2048;

/// How a file is split into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// One line per physical read.
    #[default]
    Line,
    /// Fixed-size chunks split on the delimiter.
    Length,
}

/// Configuration for the record reader.
#[derive(Debug, Clone)]
pub struct RecordReaderConfig {
    /// Maximum number of records per batch.
    pub max_read: usize,
    /// Bytes requested per physical read.
    pub read_length: usize,
    /// Directory to retry relative paths against when they are not found.
    pub base_path: Option<PathBuf>,
}

impl Default for RecordReaderConfig {
    fn default() -> Self {
        Self {
            max_read: DEFAULT_MAX_READ,
            read_length: DEFAULT_READ_LENGTH,
            base_path: None,
        }
    }
}

/// Reads batches of records and remembers where each file left off.
///
/// Open handles are cached per resolved path until [`RecordReader::close`],
/// [`RecordReader::close_all`] or drop.
pub struct RecordReader {
    codec: Codec,
    config: RecordReaderConfig,
    handles: HashMap<PathBuf, BufReader<File>>,
    state: OffsetStore,
}

impl RecordReader {
    /// Create a new reader decoding with `codec`.
    pub fn new(codec: Codec, config: RecordReaderConfig) -> Self {
        Self {
            codec,
            config,
            handles: HashMap::new(),
            state: OffsetStore::new(),
        }
    }

    pub fn config(&self) -> &RecordReaderConfig {
        &self.config
    }

    /// Set the maximum batch size. Zero is ignored.
    pub fn set_max_read(&mut self, max_read: usize) {
        if max_read > 0 {
            self.config.max_read = max_read;
        }
    }

    /// Set the per-read byte count. Zero is ignored.
    pub fn set_read_length(&mut self, read_length: usize) {
        if read_length > 0 {
            self.config.read_length = read_length;
        }
    }

    /// Stored offset for a file.
    pub fn offset(&self, path: impl AsRef<Path>) -> u64 {
        let path = path.as_ref();
        match self.resolve(path) {
            Some(resolved) => self.state.get(&resolved),
            None => self.state.get(path),
        }
    }

    /// Number of undelimited bytes held back for a file.
    pub fn pending_len(&self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        match self.resolve(path) {
            Some(resolved) => self.state.pending(&resolved).len(),
            None => self.state.pending(path).len(),
        }
    }

    /// Read the next batch of a file, continuing from its stored offset.
    pub fn read_next(&mut self, path: impl AsRef<Path>, mode: ReadMode) -> Vec<Record> {
        let path = path.as_ref();
        let offset = self.offset(path);
        self.read(path, mode, offset)
    }

    /// Read a batch of records from `path` starting at `offset`.
    ///
    /// A missing or unreadable file yields an empty batch. The stored offset
    /// moves to the end of the bytes consumed, including bytes held back as a
    /// pending fragment, unless it is already further along. A pending
    /// fragment is only joined to a read that starts where it ended.
    pub fn read(&mut self, path: impl AsRef<Path>, mode: ReadMode, offset: u64) -> Vec<Record> {
        let path = path.as_ref();
        let Some(resolved) = self.resolve(path) else {
            debug!("No readable file at {}", path.display());
            return Vec::new();
        };

        match self.read_batch(&resolved, mode, offset) {
            Ok((batch, consumed)) => {
                if offset == self.state.get(&resolved) {
                    self.state.advance(&resolved, consumed);
                } else if consumed > 0 {
                    self.state
                        .advance_to(&resolved, offset.saturating_add(consumed));
                }
                emit!(BytesRead { bytes: consumed });
                emit!(RecordsRead {
                    count: batch.len() as u64
                });
                debug!(
                    "Read {} records ({} bytes) from {} at offset {}",
                    batch.len(),
                    consumed,
                    resolved.display(),
                    offset
                );
                batch
            }
            Err(e) => {
                warn!("Failed to read {}: {}", resolved.display(), e);
                self.handles.remove(&resolved);
                Vec::new()
            }
        }
    }

    /// Release the cached handle for a file. Returns whether one was open.
    pub fn close(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let resolved = self.resolve(path).unwrap_or_else(|| path.to_path_buf());
        self.handles.remove(&resolved).is_some()
    }

    /// Release every cached handle.
    pub fn close_all(&mut self) {
        let count = self.handles.len();
        self.handles.clear();
        if count > 0 {
            debug!("Closed {} cached file handles", count);
        }
    }

    /// Number of cached open handles.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    fn resolve(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        let candidate = self.config.base_path.as_ref()?.join(path);
        candidate.is_file().then_some(candidate)
    }

    fn read_batch(
        &mut self,
        path: &Path,
        mode: ReadMode,
        offset: u64,
    ) -> io::Result<(Vec<Record>, u64)> {
        let handle = match self.handles.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let file = File::open(path)?;
                debug!("Opened {}", path.display());
                entry.insert(BufReader::new(file))
            }
        };
        handle.seek(SeekFrom::Start(offset))?;

        let codec = &self.codec;
        let max_read = self.config.max_read.max(1);
        let read_length = self.config.read_length.max(1);
        let mut batch = Vec::new();

        let consumed = match mode {
            ReadMode::Line => read_lines(handle, codec, max_read, read_length, &mut batch)?,
            ReadMode::Length => {
                let cursor = self.state.get(path);
                let mut fragment = self.state.pending_at(path, offset).to_vec();
                let consumed = read_chunks(
                    handle,
                    codec,
                    max_read,
                    read_length,
                    &mut fragment,
                    &mut batch,
                )?;

                // A re-read of an earlier range leaves the cursor's fragment
                // alone; only a read from the cursor or past it replaces it.
                let end = offset.saturating_add(consumed);
                if offset == cursor || (consumed > 0 && end > cursor) {
                    self.state.set_pending(path, end, fragment);
                }
                consumed
            }
        };

        Ok((batch, consumed))
    }
}

/// Read whole lines until EOF or `max_read` records.
///
/// Each physical read is capped at `read_length` bytes; a longer line is
/// assembled from several reads. A final line without a delimiter is
/// decoded as-is.
fn read_lines<R: BufRead>(
    reader: &mut R,
    codec: &Codec,
    max_read: usize,
    read_length: usize,
    batch: &mut Vec<Record>,
) -> io::Result<u64> {
    let mut consumed = 0u64;
    let mut line = Vec::with_capacity(read_length);

    while batch.len() < max_read {
        line.clear();
        let n = read_line_bounded(reader, &mut line, read_length)?;
        if n == 0 {
            break;
        }
        consumed += n as u64;

        let body = line.strip_suffix(&[DELIMITER]).unwrap_or(&line);
        let record = codec.decode(body);
        if !record.is_empty() {
            batch.push(record);
        }
    }

    Ok(consumed)
}

fn read_line_bounded<R: BufRead>(
    reader: &mut R,
    line: &mut Vec<u8>,
    read_length: usize,
) -> io::Result<usize> {
    let mut total = 0;
    loop {
        let n = reader
            .by_ref()
            .take(read_length as u64)
            .read_until(DELIMITER, line)?;
        total += n;
        if n == 0 || line.last() == Some(&DELIMITER) {
            return Ok(total);
        }
    }
}

/// Read fixed-size chunks until EOF or `max_read` records.
///
/// `fragment` holds bytes carried from the previous call on entry and the
/// bytes to carry forward on return: any undelimited tail, plus complete
/// records that did not fit in this batch.
fn read_chunks<R: Read>(
    reader: &mut R,
    codec: &Codec,
    max_read: usize,
    read_length: usize,
    fragment: &mut Vec<u8>,
    batch: &mut Vec<Record>,
) -> io::Result<u64> {
    let mut consumed = 0u64;
    let mut chunk = vec![0u8; read_length];

    loop {
        drain_records(codec, max_read, fragment, batch);
        if batch.len() >= max_read {
            break;
        }

        let n = read_chunk(reader, &mut chunk)?;
        if n == 0 {
            break;
        }
        consumed += n as u64;
        fragment.extend_from_slice(&chunk[..n]);
    }

    Ok(consumed)
}

fn drain_records(codec: &Codec, max_read: usize, fragment: &mut Vec<u8>, batch: &mut Vec<Record>) {
    let mut start = 0;
    while batch.len() < max_read {
        let Some(pos) = fragment[start..].iter().position(|&b| b == DELIMITER) else {
            break;
        };
        let end = start + pos;
        let record = codec.decode(&fragment[start..end]);
        if !record.is_empty() {
            batch.push(record);
        }
        start = end + 1;
    }
    fragment.drain(..start);
}

fn read_chunk<R: Read>(reader: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(chunk) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
