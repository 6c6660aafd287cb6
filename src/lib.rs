//! waymark: resumable record processing with checkpoint logs.
//!
//! This library reads data files in bounded batches that resume at the exact
//! byte where the previous batch stopped, and records per-record outcomes in
//! success, failure and exit logs so an interrupted job can pick up where it
//! left off.
//!
//! # Example
//!
//! ```ignore
//! use waymark::{Config, ExitMode, Logger, ReadMode};
//!
//! let mut logger = Logger::new(Config::new("/var/log/jobs", "nightly", "integer"))?;
//! loop {
//!     let batch = logger.read_data_file("ids.dat", ReadMode::Line);
//!     if batch.is_empty() {
//!         break;
//!     }
//!     for record in batch {
//!         logger.record_success(&record)?;
//!         logger.record_exit(&record, ExitMode::Marker)?;
//!     }
//! }
//! logger.display_summary(None);
//! ```

pub mod checkpoint;
pub mod codec;
pub mod config;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod redirect;
pub mod shutdown;
pub mod source;
pub mod summary;

// Re-export main types
pub use checkpoint::{CheckpointLog, ExitMode, LastSeen, LogPaths, RunCounts};
pub use codec::{Codec, DataKind, Record};
pub use config::Config;
pub use error::Error;
pub use logger::Logger;
pub use source::{OffsetStore, ReadMode, RecordReader, RecordReaderConfig};
pub use summary::{Elapsed, RunSummary};
