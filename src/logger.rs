//! The checkpointing logger.
//!
//! Ties a validated [`Config`] to one record reader, one set of checkpoint
//! logs and one run summary. A host program reads batches, decides per
//! record whether it succeeded, and records progress through this type.

use chrono::{DateTime, Utc};
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::checkpoint::{CheckpointLog, ExitMode, LastSeen, LogPaths, RunCounts};
use crate::codec::{Codec, DataKind, Record};
use crate::config::Config;
use crate::error::{ConfigError, LogError, RedirectError};
use crate::redirect;
use crate::shutdown::{interrupt_notice, render_diagnostics};
use crate::source::{ReadMode, RecordReader};
use crate::summary::RunSummary;

/// Resumable reader plus checkpoint logs for one prefix.
pub struct Logger {
    config: Config,
    codec: Codec,
    read_mode: ReadMode,
    reader: RecordReader,
    log: CheckpointLog,
    summary: RunSummary,
}

impl Logger {
    /// Validate `config` and create a logger. The clock starts now.
    ///
    /// Fails without creating any file if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let kind = config.validate()?;
        let codec = Codec::new(kind);
        let paths = config.log_paths();

        info!(
            "Checkpoint logs for '{}' ({}) in {}",
            config.prefix,
            kind,
            config.log_dir.display()
        );

        Ok(Self {
            codec,
            read_mode: config.read.mode,
            reader: RecordReader::new(codec, config.reader_config()),
            log: CheckpointLog::new(paths, codec),
            summary: RunSummary::new(),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    pub fn data_kind(&self) -> DataKind {
        self.codec.kind()
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn log_paths(&self) -> &LogPaths {
        self.log.paths()
    }

    /// Directory data file paths are retried against.
    pub fn base_path(&self) -> Option<&Path> {
        self.reader.config().base_path.as_deref()
    }

    /// Redirect stdout/stderr to the configured file.
    pub fn redirect_output(&self) -> Result<bool, RedirectError> {
        redirect::redirect_output(&self.config.stdout_path())
    }

    // ============ Reading ============

    pub fn read_mode(&self) -> ReadMode {
        self.read_mode
    }

    /// Mode used by [`Logger::read_failure_file`].
    pub fn set_read_mode(&mut self, mode: ReadMode) {
        self.read_mode = mode;
    }

    pub fn set_max_read(&mut self, max_read: usize) {
        self.reader.set_max_read(max_read);
    }

    pub fn set_read_length(&mut self, read_length: usize) {
        self.reader.set_read_length(read_length);
    }

    /// Read the next batch of a data file from its stored offset.
    pub fn read_data_file(&mut self, path: impl AsRef<Path>, mode: ReadMode) -> Vec<Record> {
        self.reader.read_next(path, mode)
    }

    /// Read a batch of a data file starting at an explicit offset.
    pub fn read_file_at(
        &mut self,
        path: impl AsRef<Path>,
        mode: ReadMode,
        offset: u64,
    ) -> Vec<Record> {
        self.reader.read(path, mode, offset)
    }

    /// Stored byte offset for a file.
    pub fn offset(&self, path: impl AsRef<Path>) -> u64 {
        self.reader.offset(path)
    }

    /// Read the next batch of the failure log for reprocessing.
    pub fn read_failure_file(&mut self) -> Vec<Record> {
        self.log.read_failure_file(&mut self.reader, self.read_mode)
    }

    /// Release every cached file handle.
    pub fn close(&mut self) {
        self.reader.close_all();
    }

    // ============ Checkpointing ============

    /// Append to the success log. Empty records return `Ok(false)`.
    pub fn record_success(&mut self, record: &Record) -> Result<bool, LogError> {
        self.log.record_success(record)
    }

    /// Append to the failure log. Empty records return `Ok(false)`.
    pub fn record_failure(&mut self, record: &Record) -> Result<bool, LogError> {
        self.log.record_failure(record)
    }

    /// Overwrite the exit checkpoint.
    pub fn record_exit(&mut self, record: &Record, mode: ExitMode) -> Result<(), LogError> {
        self.log.record_exit(record, mode)
    }

    /// Raw exit checkpoint, `None` if there is none.
    pub fn last_exit_data(&self) -> Result<Option<String>, LogError> {
        self.log.last_exit_data()
    }

    /// Decoded exit checkpoint, `None` if there is none.
    pub fn last_exit_record(&self) -> Result<Option<Record>, LogError> {
        self.log.last_exit_record()
    }

    pub fn counts(&self) -> RunCounts {
        self.log.counts()
    }

    pub fn count(&self) -> u64 {
        self.log.count()
    }

    pub fn success_count(&self) -> u64 {
        self.log.success_count()
    }

    pub fn failure_count(&self) -> u64 {
        self.log.failure_count()
    }

    pub fn last_seen(&self) -> &LastSeen {
        self.log.last_seen()
    }

    // ============ Summary and shutdown ============

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Fix the end time reported by the summary. Only the first call counts.
    pub fn set_end_time(&mut self, at: DateTime<Utc>) {
        self.summary.record_end(at);
    }

    /// Print the run summary once. `None` labels it `"<prefix> job"`.
    pub fn display_summary(&mut self, label: Option<&str>) -> bool {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.display_summary_to(&mut lock, label).unwrap_or_else(|e| {
            warn!("Failed to write run summary: {}", e);
            true
        })
    }

    /// Write the run summary to `out` once.
    pub fn display_summary_to<W: Write>(
        &mut self,
        out: &mut W,
        label: Option<&str>,
    ) -> io::Result<bool> {
        let label = match label {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => format!("{} job", self.config.prefix),
        };
        let counts = self.log.counts();
        self.summary.display_to(out, &label, counts)
    }

    /// Diagnostic dump of the last success, failure and exit values.
    pub fn diagnostics(&self) -> String {
        render_diagnostics(self.log.last_seen())
    }

    /// Shutdown path for an interrupted run: notice, diagnostics, summary.
    pub fn handle_interrupt_to<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        out.write_all(interrupt_notice().as_bytes())?;
        out.write_all(self.diagnostics().as_bytes())?;
        self.display_summary_to(out, None)?;
        self.close();
        Ok(())
    }

    /// [`Logger::handle_interrupt_to`] on stdout.
    pub fn handle_interrupt(&mut self) {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        if let Err(e) = self.handle_interrupt_to(&mut lock) {
            warn!("Failed to write interrupt report: {}", e);
        }
    }
}
