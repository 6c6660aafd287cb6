//! Error types for waymark using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use snafu::prelude::*;
use std::path::PathBuf;

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
///
/// All of these are fatal: they are raised before any log file is created.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Log directory is missing or not a directory.
    #[snafu(display("Log directory does not exist: {}", path.display()))]
    MissingLogDir { path: PathBuf },

    /// Log directory cannot be written to.
    #[snafu(display("Log directory is not writable: {}", path.display()))]
    ReadOnlyLogDir { path: PathBuf },

    /// Prefix is empty or the bare root separator.
    #[snafu(display("Invalid log prefix: {prefix:?}"))]
    InvalidPrefix { prefix: String },

    /// Data kind is not one of integer, structured, flat.
    #[snafu(display("Unsupported data kind: {kind}"))]
    UnsupportedDataKind { kind: String },

    /// Read length must be at least one byte.
    #[snafu(display("Read length must be greater than zero"))]
    ZeroReadLength,

    /// Max read must allow at least one record per batch.
    #[snafu(display("Max read must be greater than zero"))]
    ZeroMaxRead,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },
}

// ============ Log Errors ============

/// Errors that can occur while writing or reading checkpoint logs.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LogError {
    /// Appending to the success or failure log failed.
    #[snafu(display("Failed to append to {}", path.display()))]
    Append {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Overwriting the exit log failed.
    #[snafu(display("Failed to write exit checkpoint {}", path.display()))]
    WriteExit {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Reading the exit log failed for a reason other than absence.
    #[snafu(display("Failed to read exit checkpoint {}", path.display()))]
    ReadExit {
        source: std::io::Error,
        path: PathBuf,
    },
}

// ============ Redirect Errors ============

/// Errors that can occur while redirecting standard output.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RedirectError {
    /// The redirect target could not be opened for appending.
    #[snafu(display("Can not open stdout file {}", path.display()))]
    OpenStdoutFile {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Duplicating the file descriptor onto stdout/stderr failed.
    #[snafu(display("Failed to redirect {stream} to {}", path.display()))]
    Dup {
        source: std::io::Error,
        stream: &'static str,
        path: PathBuf,
    },
}

// ============ Top-level Error ============

/// Top-level errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Checkpoint log error.
    #[snafu(display("Checkpoint log error"))]
    Log { source: LogError },

    /// Output redirection error.
    #[snafu(display("Output redirection error"))]
    Redirect { source: RedirectError },
}

impl From<ConfigError> for Error {
    fn from(source: ConfigError) -> Self {
        Error::Config { source }
    }
}

impl From<LogError> for Error {
    fn from(source: LogError) -> Self {
        Error::Log { source }
    }
}

impl From<RedirectError> for Error {
    fn from(source: RedirectError) -> Self {
        Error::Redirect { source }
    }
}
