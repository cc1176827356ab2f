//! Parser module — turns raw access-log lines into structured records.
//!
//! `model.rs` holds the record type, `access_log.rs` the combined-format
//! pattern matching and the parse worker loop.

pub mod access_log;
pub mod model;

pub use access_log::{run_parse_worker, AccessLogParser};
pub use model::LogRecord;
