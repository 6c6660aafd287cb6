//! Logger configuration.
//!
//! Loads configuration from YAML files (with environment variable
//! expansion) or builds it in code, and validates it before any log file is
//! created.

mod vars;

pub use vars::expand;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::checkpoint::LogPaths;
use crate::codec::DataKind;
use crate::error::{
    ConfigError, EnvInterpolationSnafu, InvalidPrefixSnafu, MissingLogDirSnafu,
    ReadFileSnafu, ReadOnlyLogDirSnafu, YamlParseSnafu, ZeroMaxReadSnafu, ZeroReadLengthSnafu,
};
use crate::source::{DEFAULT_MAX_READ, DEFAULT_READ_LENGTH, ReadMode, RecordReaderConfig};

/// Main configuration structure for a checkpointed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding the checkpoint logs. Must exist and be writable.
    pub log_dir: PathBuf,

    /// File name prefix for the checkpoint logs.
    pub prefix: String,

    /// Record encoding: integer, structured or flat (default: integer).
    #[serde(default = "default_data_kind")]
    pub data_kind: String,

    /// Redirect target for stdout/stderr (default: `<log_dir>/<prefix>_std.log`).
    #[serde(default)]
    pub stdout_file: Option<PathBuf>,

    /// Whether to redirect stdout/stderr at startup (default: false).
    #[serde(default)]
    pub redirect: bool,

    /// Read tuning.
    #[serde(default)]
    pub read: ReadConfig,
}

/// Tunables for batch reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadConfig {
    /// Read by line or by fixed-size chunk (default: line).
    #[serde(default)]
    pub mode: ReadMode,

    /// Maximum records per batch (default: 1000).
    #[serde(default = "default_max_read")]
    pub max_read: usize,

    /// Bytes requested per physical read (default: 2048).
    #[serde(default = "default_read_length")]
    pub read_length: usize,

    /// Directory to retry data file paths against when they are not found.
    #[serde(default)]
    pub base_path: Option<PathBuf>,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            mode: ReadMode::default(),
            max_read: default_max_read(),
            read_length: default_read_length(),
            base_path: None,
        }
    }
}

fn default_data_kind() -> String {
    DataKind::default().to_string()
}

fn default_max_read() -> usize {
    DEFAULT_MAX_READ
}

fn default_read_length() -> usize {
    DEFAULT_READ_LENGTH
}

impl Config {
    /// Build a configuration with default read settings.
    pub fn new(
        log_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        data_kind: impl Into<String>,
    ) -> Self {
        Self {
            log_dir: log_dir.into(),
            prefix: prefix.into(),
            data_kind: data_kind.into(),
            stdout_file: None,
            redirect: false,
            read: ReadConfig::default(),
        }
    }

    /// Load configuration from a YAML file, expanding environment variables.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text, expanding environment variables.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let contents = expand(contents).map_err(|problems| {
            EnvInterpolationSnafu {
                message: problems.join("\n"),
            }
            .build()
        })?;
        serde_yaml::from_str(&contents).context(YamlParseSnafu)
    }

    /// Validate the configuration and return the parsed data kind.
    ///
    /// Touches nothing on disk.
    pub fn validate(&self) -> Result<DataKind, ConfigError> {
        let kind: DataKind = self.data_kind.parse()?;

        ensure!(
            !self.prefix.is_empty() && self.prefix != "/",
            InvalidPrefixSnafu {
                prefix: self.prefix.clone()
            }
        );

        let metadata = fs::metadata(&self.log_dir).ok().filter(|m| m.is_dir());
        let Some(metadata) = metadata else {
            return MissingLogDirSnafu {
                path: self.log_dir.clone(),
            }
            .fail();
        };
        ensure!(
            is_writable_dir(&self.log_dir, &metadata),
            ReadOnlyLogDirSnafu {
                path: self.log_dir.clone()
            }
        );

        ensure!(self.read.max_read > 0, ZeroMaxReadSnafu);
        ensure!(self.read.read_length > 0, ZeroReadLengthSnafu);

        Ok(kind)
    }

    /// Paths of the checkpoint logs.
    pub fn log_paths(&self) -> LogPaths {
        LogPaths::new(&self.log_dir, &self.prefix)
    }

    /// Redirect target, defaulting to `<log_dir>/<prefix>_std.log`.
    pub fn stdout_path(&self) -> PathBuf {
        self.stdout_file
            .clone()
            .unwrap_or_else(|| LogPaths::default_stdout(&self.log_dir, &self.prefix))
    }

    /// Reader settings derived from this configuration.
    pub fn reader_config(&self) -> RecordReaderConfig {
        RecordReaderConfig {
            max_read: self.read.max_read,
            read_length: self.read.read_length,
            base_path: self.read.base_path.clone(),
        }
    }
}

/// Whether the current process may create files in `path`.
#[cfg(unix)]
fn is_writable_dir(path: &Path, _metadata: &fs::Metadata) -> bool {
    use nix::unistd::{AccessFlags, access};

    access(path, AccessFlags::W_OK).is_ok()
}

/// Whether the current process may create files in `path`.
#[cfg(not(unix))]
fn is_writable_dir(_path: &Path, metadata: &fs::Metadata) -> bool {
    !metadata.permissions().readonly()
}
