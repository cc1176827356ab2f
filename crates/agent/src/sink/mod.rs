//! Sink module — the metrics-sink seam, the point model and the publish
//! worker loop. `influx.rs` holds the concrete InfluxDB writer.

pub mod influx;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::{FatalError, SinkError};
use crate::parser::LogRecord;

pub use influx::{InfluxDsn, InfluxSink, Precision};

/// Measurement name every published point carries.
pub const MEASUREMENT: &str = "nginx_log";

/// A numeric field value on a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

/// One time-series point derived from a [`LogRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: &'static str,
    pub tags: Vec<(&'static str, String)>,
    pub fields: Vec<(&'static str, FieldValue)>,
    pub timestamp: DateTime<FixedOffset>,
}

impl Point {
    /// Tag and field key spellings are the sink's established schema.
    pub fn from_record(record: &LogRecord) -> Self {
        Self {
            measurement: MEASUREMENT,
            tags: vec![
                ("Path", record.path.clone()),
                ("Method", record.method.clone()),
                ("Scheme", record.scheme.clone()),
                ("Status", record.status.clone()),
            ],
            fields: vec![
                ("UpstreamTime", FieldValue::Float(record.upstream_time)),
                ("RequestTime", FieldValue::Float(record.request_time)),
                ("BytesSend", FieldValue::Integer(record.bytes_sent)),
            ],
            timestamp: record.timestamp,
        }
    }
}

/// The external time-series store, reduced to its batched-write contract.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn write(&self, points: &[Point]) -> Result<(), SinkError>;
}

/// Publish worker: drains the record queue and writes points to its own
/// sink connection.
///
/// Batches are opportunistic: one blocking receive, then whatever is
/// already queued up to `batch_size`. A write failure is fatal; the error
/// is routed to the serve loop and the worker stops. Several workers share
/// the queue, so write order across workers is not guaranteed.
pub async fn run_publish_worker(
    sink: Arc<dyn MetricsSink>,
    record_rx: flume::Receiver<LogRecord>,
    batch_size: usize,
    fatal: mpsc::Sender<FatalError>,
) {
    while let Ok(first) = record_rx.recv_async().await {
        let mut points = Vec::with_capacity(batch_size);
        points.push(Point::from_record(&first));
        while points.len() < batch_size {
            match record_rx.try_recv() {
                Ok(record) => points.push(Point::from_record(&record)),
                Err(_) => break,
            }
        }

        match sink.write(&points).await {
            Ok(()) => info!(points = points.len(), "write success"),
            Err(err) => {
                error!(error = %err, "sink write failed");
                let _ = fatal.send(FatalError::SinkWrite(err)).await;
                return;
            }
        }
    }
}
