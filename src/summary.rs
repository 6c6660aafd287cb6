//! End-of-run summary.
//!
//! The summary can be requested from normal completion, the interrupt path
//! and process teardown; only the first request produces output.

use chrono::{DateTime, Local, Utc};
use std::io::{self, Write};
use tracing::{debug, warn};

use crate::checkpoint::RunCounts;

/// Elapsed wall-clock time split into whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Elapsed {
    fn from_seconds(total: i64) -> Self {
        let total = total.max(0);
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }
}

/// Start/end timestamps and the shown-once guard.
#[derive(Debug)]
pub struct RunSummary {
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    displayed: bool,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSummary {
    /// Start the clock now.
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ended_at: None,
            displayed: false,
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Set the end time. Only the first call has an effect.
    pub fn record_end(&mut self, at: DateTime<Utc>) {
        if self.ended_at.is_none() {
            self.ended_at = Some(at);
        }
    }

    /// The end time, set to now on first access if it was never recorded.
    pub fn end_time(&mut self) -> DateTime<Utc> {
        *self.ended_at.get_or_insert_with(Utc::now)
    }

    /// Time from start to `at`, never negative.
    pub fn elapsed(&self, at: DateTime<Utc>) -> Elapsed {
        Elapsed::from_seconds((at - self.started_at).num_seconds())
    }

    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    /// Render the report text.
    pub fn render(&self, label: &str, counts: RunCounts, ended_at: DateTime<Utc>) -> String {
        let elapsed = self.elapsed(ended_at);
        let format = "%Y-%m-%d %H:%M:%S";
        let mut out = String::new();

        out.push_str("\n\n");
        out.push_str(&format!("{:-^80}\n\n", format!(" {label} summary ")));
        out.push_str(&format!(" all     num : [ {:<10}]\n", counts.total));
        out.push_str(&format!(" success num : [\x1b[32m {:<10}\x1b[0m]\n", counts.success));
        out.push_str(&format!(" failure num : [\x1b[31m {:<10}\x1b[0m]\n", counts.failure));
        out.push_str(&format!(
            " started at  : {}\n",
            self.started_at.with_timezone(&Local).format(format)
        ));
        out.push_str(&format!(
            " ended at    : {}\n",
            ended_at.with_timezone(&Local).format(format)
        ));
        out.push_str(&format!(
            " elapsed     : {:<2}h {:<2}m {:<2}s\n",
            elapsed.hours, elapsed.minutes, elapsed.seconds
        ));
        out.push_str("\n\n");
        out
    }

    /// Write the report to `out` unless it was already shown.
    ///
    /// Returns whether this call produced the output.
    pub fn display_to<W: Write>(
        &mut self,
        out: &mut W,
        label: &str,
        counts: RunCounts,
    ) -> io::Result<bool> {
        if self.displayed {
            debug!("Summary already displayed");
            return Ok(false);
        }
        self.displayed = true;
        let ended_at = self.end_time();
        out.write_all(self.render(label, counts, ended_at).as_bytes())?;
        out.flush()?;
        Ok(true)
    }

    /// Print the report to stdout unless it was already shown.
    pub fn display(&mut self, label: &str, counts: RunCounts) -> bool {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.display_to(&mut lock, label, counts).unwrap_or_else(|e| {
            warn!("Failed to write run summary: {}", e);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_elapsed_breakdown() {
        let start = Utc::now();
        let summary = RunSummary::started_at(start);

        let elapsed = summary.elapsed(start + Duration::seconds(3 * 3600 + 25 * 60 + 9));
        assert_eq!(
            elapsed,
            Elapsed {
                hours: 3,
                minutes: 25,
                seconds: 9
            }
        );
    }

    #[test]
    fn test_elapsed_never_negative() {
        let start = Utc::now();
        let summary = RunSummary::started_at(start);

        let elapsed = summary.elapsed(start - Duration::seconds(30));
        assert_eq!(
            elapsed,
            Elapsed {
                hours: 0,
                minutes: 0,
                seconds: 0
            }
        );
    }

    #[test]
    fn test_record_end_sets_once() {
        let start = Utc::now();
        let mut summary = RunSummary::started_at(start);
        let first = start + Duration::seconds(10);

        summary.record_end(first);
        summary.record_end(start + Duration::seconds(99));

        assert_eq!(summary.end_time(), first);
    }

    #[test]
    fn test_end_time_is_lazy_and_stable() {
        let mut summary = RunSummary::new();
        let first = summary.end_time();
        assert_eq!(summary.end_time(), first);
        assert!(first >= summary.start_time());
    }

    #[test]
    fn test_display_is_idempotent() {
        let mut summary = RunSummary::new();
        let counts = RunCounts {
            total: 3,
            success: 2,
            failure: 1,
        };
        let mut out = Vec::new();

        assert!(summary.display_to(&mut out, "demo", counts).unwrap());
        for _ in 0..3 {
            assert!(!summary.display_to(&mut out, "demo", counts).unwrap());
        }

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("demo summary").count(), 1);
        assert!(text.contains(" all     num : [ 3 "));
        assert!(summary.is_displayed());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_error_is_reported_and_not_retried() {
        let mut summary = RunSummary::new();

        let err = summary
            .display_to(&mut BrokenPipe, "demo", RunCounts::default())
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(summary.is_displayed());

        let mut out = Vec::new();
        assert!(!summary.display_to(&mut out, "demo", RunCounts::default()).unwrap());
        assert!(out.is_empty());
    }
}
