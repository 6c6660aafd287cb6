//! Checkpoint logs for resumable processing.
//!
//! # Log Files
//!
//! Each prefix owns three files:
//!
//! - `<prefix>_success.log`: append-only, one encoded record per line
//! - `<prefix>_failure.log`: append-only, doubles as the replay queue
//! - `<prefix>_exit.log`: a single entry marking where the run stopped
//!
//! The exit log is rewritten through a temporary file and a rename, so a
//! crash during a write leaves the previous checkpoint in place.

pub mod state;

pub use state::{LastSeen, LogPaths, RunCounts};

use snafu::prelude::*;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::codec::{Codec, DELIMITER, Record};
use crate::emit;
use crate::error::{AppendSnafu, LogError, ReadExitSnafu, WriteExitSnafu};
use crate::metrics::events::{ExitCheckpointWritten, Outcome, RecordLogged};
use crate::source::{ReadMode, RecordReader};

/// What to store in the exit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitMode {
    /// The record truncated to an integer id.
    #[default]
    Marker,
    /// The fully encoded record.
    Full,
}

/// Success, failure and exit logs plus the counters for the current run.
pub struct CheckpointLog {
    paths: LogPaths,
    codec: Codec,
    counts: RunCounts,
    last: LastSeen,
}

impl CheckpointLog {
    /// Create a checkpoint log writing to `paths`. No file is touched until
    /// the first record is logged.
    pub fn new(paths: LogPaths, codec: Codec) -> Self {
        Self {
            paths,
            codec,
            counts: RunCounts::default(),
            last: LastSeen::default(),
        }
    }

    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    pub fn counts(&self) -> RunCounts {
        self.counts
    }

    pub fn count(&self) -> u64 {
        self.counts.total
    }

    pub fn success_count(&self) -> u64 {
        self.counts.success
    }

    pub fn failure_count(&self) -> u64 {
        self.counts.failure
    }

    /// Last values handed to the logger, for shutdown diagnostics.
    pub fn last_seen(&self) -> &LastSeen {
        &self.last
    }

    /// Append a record to the success log.
    ///
    /// Empty records are skipped and return `Ok(false)` without touching the
    /// counters or the file. Counters only move once the line is written.
    pub fn record_success(&mut self, record: &Record) -> Result<bool, LogError> {
        if record.is_empty() {
            return Ok(false);
        }
        append_line(&self.paths.success, &self.codec.encode(record))?;
        self.counts.success += 1;
        self.counts.total += 1;
        self.last.last_success = Some(record.clone());

        emit!(RecordLogged {
            outcome: Outcome::Success
        });
        Ok(true)
    }

    /// Append a record to the failure log.
    ///
    /// Empty records are skipped and return `Ok(false)`.
    pub fn record_failure(&mut self, record: &Record) -> Result<bool, LogError> {
        if record.is_empty() {
            return Ok(false);
        }
        append_line(&self.paths.failure, &self.codec.encode(record))?;
        self.counts.failure += 1;
        self.counts.total += 1;
        self.last.last_failure = Some(record.clone());

        emit!(RecordLogged {
            outcome: Outcome::Failure
        });
        Ok(true)
    }

    /// Replace the exit checkpoint with `record`.
    pub fn record_exit(&mut self, record: &Record, mode: ExitMode) -> Result<(), LogError> {
        let marker = record.as_integer();
        let contents = match mode {
            ExitMode::Marker => marker.to_string(),
            ExitMode::Full => self.codec.encode(record),
        };

        overwrite(&self.paths.exit, contents.as_bytes())?;
        self.last.last_exit = Some(record.clone());
        emit!(ExitCheckpointWritten { marker });
        Ok(())
    }

    /// Raw contents of the exit checkpoint, `None` if absent or empty.
    pub fn last_exit_data(&self) -> Result<Option<String>, LogError> {
        let contents = match fs::read(&self.paths.exit) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(source).context(ReadExitSnafu {
                    path: self.paths.exit.clone(),
                });
            }
        };

        let line = contents
            .split(|&b| b == DELIMITER)
            .next()
            .unwrap_or_default();
        let line = String::from_utf8_lossy(line).trim_end_matches('\r').to_string();
        Ok((!line.is_empty()).then_some(line))
    }

    /// Exit checkpoint decoded with this log's codec, `None` if absent or empty.
    pub fn last_exit_record(&self) -> Result<Option<Record>, LogError> {
        let Some(raw) = self.last_exit_data()? else {
            return Ok(None);
        };
        let record = self.codec.decode(raw.as_bytes());
        Ok((!record.is_empty()).then_some(record))
    }

    /// Read the next batch of the failure log for reprocessing.
    pub fn read_failure_file(&self, reader: &mut RecordReader, mode: ReadMode) -> Vec<Record> {
        reader.read_next(&self.paths.failure, mode)
    }
}

fn append_line(path: &Path, encoded: &str) -> Result<(), LogError> {
    let mut line = Vec::with_capacity(encoded.len() + 1);
    line.extend_from_slice(encoded.as_bytes());
    line.push(DELIMITER);

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(&line))
        .context(AppendSnafu { path })
}

fn overwrite(path: &Path, contents: &[u8]) -> Result<(), LogError> {
    let tmp = tmp_path(path);
    fs::write(&tmp, contents)
        .and_then(|()| fs::rename(&tmp, path))
        .context(WriteExitSnafu { path })?;
    debug!("Exit checkpoint written to {}", path.display());
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
