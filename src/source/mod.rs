//! Resumable reading of record files.
//!
//! Provides batch reads that pick up exactly where the previous read on the
//! same file stopped, including inside a partially read record.

pub mod reader;
pub mod state;

pub use reader::{DEFAULT_MAX_READ, DEFAULT_READ_LENGTH, ReadMode, RecordReader, RecordReaderConfig};
pub use state::OffsetStore;
