//! Model — the structured record produced from one access-log line.

use chrono::{DateTime, FixedOffset};

/// One parsed access-log line.
///
/// Built by the parser from a raw line that matched the combined format,
/// handed to exactly one publisher worker and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Request time anchored in the pipeline's fixed zone (UTC+8).
    pub timestamp: DateTime<FixedOffset>,
    /// Response size in bytes; 0 when the source field was unparsable.
    pub bytes_sent: i64,
    /// Path component of the request target, query and fragment dropped.
    pub path: String,
    pub method: String,
    pub scheme: String,
    pub status: String,
    /// Upstream response time in seconds; 0.0 for the `-` placeholder.
    pub upstream_time: f64,
    /// Total request time in seconds; 0.0 for the `-` placeholder.
    pub request_time: f64,
}
