//! Checkpoint log locations and in-memory run state.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::codec::Record;

/// Paths of the three checkpoint logs for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub success: PathBuf,
    pub failure: PathBuf,
    pub exit: PathBuf,
}

impl LogPaths {
    /// Derive `<prefix>_success.log`, `<prefix>_failure.log` and
    /// `<prefix>_exit.log` under `dir`.
    pub fn new(dir: &Path, prefix: &str) -> Self {
        Self {
            success: dir.join(format!("{prefix}_success.log")),
            failure: dir.join(format!("{prefix}_failure.log")),
            exit: dir.join(format!("{prefix}_exit.log")),
        }
    }

    /// Default redirect target for standard output, `<prefix>_std.log`.
    pub fn default_stdout(dir: &Path, prefix: &str) -> PathBuf {
        dir.join(format!("{prefix}_std.log"))
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub total: u64,
    pub success: u64,
    pub failure: u64,
}

/// The most recent values handed to the logger, kept for shutdown diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LastSeen {
    pub last_success: Option<Record>,
    pub last_failure: Option<Record>,
    pub last_exit: Option<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_paths() {
        let paths = LogPaths::new(Path::new("/var/log/jobs"), "demo");
        assert_eq!(paths.success, PathBuf::from("/var/log/jobs/demo_success.log"));
        assert_eq!(paths.failure, PathBuf::from("/var/log/jobs/demo_failure.log"));
        assert_eq!(paths.exit, PathBuf::from("/var/log/jobs/demo_exit.log"));
        assert_eq!(
            LogPaths::default_stdout(Path::new("/var/log/jobs"), "demo"),
            PathBuf::from("/var/log/jobs/demo_std.log")
        );
    }

    #[test]
    fn test_last_seen_serializes_records_plainly() {
        let last = LastSeen {
            last_success: Some(Record::Integer(4)),
            last_failure: None,
            last_exit: Some(Record::Flat(vec!["a".into(), "b".into()])),
        };

        let json = serde_json::to_string(&last).unwrap();
        assert_eq!(
            json,
            r#"{"last_success":4,"last_failure":null,"last_exit":["a","b"]}"#
        );
    }
}
