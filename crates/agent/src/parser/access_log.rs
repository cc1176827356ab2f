//! Combined-format access log parsing and the parse worker loop.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{FixedOffset, NaiveDateTime};
use regex::Regex;
use tracing::warn;
use url::Url;

use crate::error::ParseError;
use crate::monitor::CounterHandle;
use crate::parser::model::LogRecord;

/// 13 capture groups: client, identity, remote user, bracketed timestamp,
/// scheme, quoted request, status, bytes, referrer, user-agent, upstream
/// addr, upstream time, request time.
const LINE_PATTERN: &str = r#"([\d,]+)\s+([^ \[]+)\s+([^ \[]+)\s+\[([^\]]+)\]\s+([a-z]+)\s+"([^"]+)"\s+(\d{3})\s+(\d+)\s+"([^"]+)"\s+"(.*?)"\s+"([\d.-]+)"\s+([\d.-]+)\s+([\d.-]+)"#;

const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Parser for the combined nginx access-log format.
///
/// Structural failures (pattern, timestamp, request tokens, target URL) are
/// recoverable [`ParseError`]s; numeric field failures silently default to
/// zero. That asymmetry is deliberate and load-bearing: operators see a
/// malformed line in the error counter, but a `-` placeholder time is still
/// a valid record.
pub struct AccessLogParser {
    pattern: Regex,
    zone: FixedOffset,
    target_base: Url,
}

impl AccessLogParser {
    pub fn new() -> Self {
        Self {
            // Both are compile-time constants; failure here is a programmer error.
            pattern: Regex::new(LINE_PATTERN).expect("access-log pattern compiles"),
            zone: FixedOffset::east_opt(8 * 3600).expect("UTC+8 is a valid offset"),
            // Dummy base so origin-form targets like `/foo?x=1` resolve.
            target_base: Url::parse("http://log.invalid/").expect("base URL parses"),
        }
    }

    /// Parse one raw line into a [`LogRecord`].
    pub fn parse(&self, raw: &[u8]) -> Result<LogRecord, ParseError> {
        let text = std::str::from_utf8(raw).map_err(|_| ParseError::NonUtf8)?;

        let caps = self
            .pattern
            .captures(text)
            .ok_or(ParseError::PatternMismatch)?;

        // Wall clock anchored in the fixed zone; the textual offset must be
        // well-formed but is not applied.
        let timestamp = NaiveDateTime::parse_from_str(&caps[4], TIMESTAMP_FORMAT)
            .ok()
            .and_then(|naive| naive.and_local_timezone(self.zone).single())
            .ok_or_else(|| ParseError::Timestamp(caps[4].to_string()))?;

        let request = &caps[6];
        let tokens: Vec<&str> = request.split(' ').collect();
        let &[method, target, _protocol] = tokens.as_slice() else {
            return Err(ParseError::RequestTokens(request.to_string()));
        };

        let target_url = Url::options()
            .base_url(Some(&self.target_base))
            .parse(target)
            .map_err(|source| ParseError::UrlParse {
                target: target.to_string(),
                source,
            })?;

        Ok(LogRecord {
            timestamp,
            // Numeric fields are lenient: unparsable values become zero with
            // no error counted and no log line.
            bytes_sent: caps[8].parse().unwrap_or_default(),
            path: target_url.path().to_string(),
            method: method.to_string(),
            scheme: caps[5].to_string(),
            status: caps[7].to_string(),
            upstream_time: caps[12].parse().unwrap_or_default(),
            request_time: caps[13].parse().unwrap_or_default(),
        })
    }
}

impl Default for AccessLogParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse worker: drains the raw-line queue, forwards records, skips and
/// counts unparsable lines.
///
/// Several workers share the same queue; once more than one runs, the
/// relative order of records from different lines is NOT guaranteed
/// downstream. FIFO holds only within a single worker's view of the queue.
pub async fn run_parse_worker(
    parser: Arc<AccessLogParser>,
    raw_rx: flume::Receiver<Bytes>,
    record_tx: flume::Sender<LogRecord>,
    counters: CounterHandle,
) {
    while let Ok(line) = raw_rx.recv_async().await {
        match parser.parse(&line) {
            Ok(record) => {
                // Blocks when the record queue is full: the second
                // backpressure point.
                if record_tx.send_async(record).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                counters.parse_error().await;
                warn!(error = %err, line = %String::from_utf8_lossy(&line), "skipping line");
            }
        }
    }
}
