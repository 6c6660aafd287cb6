//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in a checkpointed
//! run. Events implement the `InternalEvent` trait which emits the
//! corresponding metric.

use metrics::{counter, gauge};
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when records are decoded from a data file.
pub struct RecordsRead {
    pub count: u64,
}

impl InternalEvent for RecordsRead {
    fn emit(self) {
        trace!(count = self.count, "Records read");
        counter!("waymark_records_read_total").increment(self.count);
    }
}

/// Event emitted when bytes are consumed from a data file.
pub struct BytesRead {
    pub bytes: u64,
}

impl InternalEvent for BytesRead {
    fn emit(self) {
        trace!(bytes = self.bytes, "Bytes read");
        counter!("waymark_bytes_read_total").increment(self.bytes);
    }
}

/// Outcome of a logged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

/// Event emitted when a record is appended to the success or failure log.
pub struct RecordLogged {
    pub outcome: Outcome,
}

impl InternalEvent for RecordLogged {
    fn emit(self) {
        trace!(outcome = self.outcome.as_str(), "Record logged");
        counter!("waymark_records_logged_total", "outcome" => self.outcome.as_str()).increment(1);
    }
}

/// Event emitted when the exit checkpoint is overwritten.
pub struct ExitCheckpointWritten {
    /// Integer form of the checkpoint marker.
    pub marker: i64,
}

impl InternalEvent for ExitCheckpointWritten {
    fn emit(self) {
        trace!(marker = self.marker, "Exit checkpoint written");
        counter!("waymark_exit_checkpoints_total").increment(1);
        gauge!("waymark_exit_checkpoint_marker").set(self.marker as f64);
    }
}
