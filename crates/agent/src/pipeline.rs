//! Pipeline coordinator — owns the bounded stage queues, spawns the
//! workers, and funnels fatal errors to the serve loop.
//!
//! Both queues are bounded at `pipeline.queue_capacity`; those bounds are
//! the pipeline's only flow control. There is no graceful drain: `abort`
//! stops the workers with whatever is in flight still in the queues.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::conf::AgentConfig;
use crate::error::FatalError;
use crate::monitor::CounterHandle;
use crate::parser::{self, AccessLogParser, LogRecord};
use crate::sink::{self, MetricsSink};
use crate::source::FileSource;

/// Read-only view of the live queue lengths, for the monitor's gauges.
#[derive(Clone)]
pub struct QueueDepths {
    raw: flume::Receiver<Bytes>,
    records: flume::Receiver<LogRecord>,
}

impl QueueDepths {
    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    pub fn record_len(&self) -> usize {
        self.records.len()
    }
}

/// The running pipeline: worker handles plus the fatal-error receiver.
pub struct Pipeline {
    fatal_rx: mpsc::Receiver<FatalError>,
    workers: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Spawn one source task, the configured parser workers and one
    /// publish worker per provided sink.
    ///
    /// Record order across workers is not guaranteed once more than one
    /// parser or publisher runs; FIFO holds only per worker.
    pub fn spawn(
        config: &AgentConfig,
        sinks: Vec<Arc<dyn MetricsSink>>,
        counters: CounterHandle,
    ) -> (Self, QueueDepths) {
        let capacity = config.pipeline.queue_capacity;
        let (raw_tx, raw_rx) = flume::bounded::<Bytes>(capacity);
        let (record_tx, record_rx) = flume::bounded::<LogRecord>(capacity);
        let (fatal_tx, fatal_rx) = mpsc::channel(8);

        let mut workers = Vec::new();

        let source = FileSource::new(&config.source);
        workers.push(tokio::spawn(source.run(
            raw_tx,
            counters.clone(),
            fatal_tx.clone(),
        )));

        let log_parser = Arc::new(AccessLogParser::new());
        for _ in 0..config.pipeline.parser_workers {
            workers.push(tokio::spawn(parser::run_parse_worker(
                log_parser.clone(),
                raw_rx.clone(),
                record_tx.clone(),
                counters.clone(),
            )));
        }
        drop(record_tx);

        for sink in sinks {
            workers.push(tokio::spawn(sink::run_publish_worker(
                sink,
                record_rx.clone(),
                config.sink.batch_size,
                fatal_tx.clone(),
            )));
        }

        let depths = QueueDepths {
            raw: raw_rx,
            records: record_rx,
        };
        (Self { fatal_rx, workers }, depths)
    }

    /// Wait for the first fatal error. `None` means every worker exited
    /// without reporting one.
    pub async fn fatal(&mut self) -> Option<FatalError> {
        self.fatal_rx.recv().await
    }

    /// Stop all workers immediately. In-flight lines and queued records
    /// are dropped; there is no drain.
    pub fn abort(&self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::monitor::PipelineMetrics;
    use crate::sink::Point;
    use async_trait::async_trait;
    use chrono::{FixedOffset, TimeZone};
    use parking_lot::Mutex;
    use std::io::Write;
    use std::time::Duration;

    const SAMPLE_LINE: &str = "127.0.0.1 - - [10/Nov/2023:13:55:36 +0000] http \"GET /api/v1/users HTTP/1.1\" 200 512 \"-\" \"curl/7.68.0\" \"-\" 0.123 0.456";

    struct CollectingSink {
        points: Mutex<Vec<Point>>,
    }

    #[async_trait]
    impl MetricsSink for CollectingSink {
        async fn write(&self, points: &[Point]) -> Result<(), SinkError> {
            self.points.lock().extend_from_slice(points);
            Ok(())
        }
    }

    /// Accepts nothing: every write parks forever.
    struct StuckSink;

    #[async_trait]
    impl MetricsSink for StuckSink {
        async fn write(&self, _points: &[Point]) -> Result<(), SinkError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl MetricsSink for FailingSink {
        async fn write(&self, _points: &[Point]) -> Result<(), SinkError> {
            Err(SinkError::Rejected {
                status: 500,
                body: "boom".into(),
            })
        }
    }

    fn test_config(path: &std::path::Path, queue_capacity: usize) -> AgentConfig {
        let mut config = AgentConfig::default();
        config.source.path = path.to_string_lossy().into_owned();
        config.source.poll_interval_ms = 10;
        config.pipeline.queue_capacity = queue_capacity;
        config.pipeline.parser_workers = 1;
        config.sink.batch_size = 1;
        config
    }

    fn append_lines(path: &std::path::Path, lines: &[&str]) {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    fn start_monitor() -> (Arc<PipelineMetrics>, CounterHandle) {
        let metrics = Arc::new(PipelineMetrics::new());
        let handle = crate::monitor::spawn(metrics.clone(), Duration::from_secs(3600));
        (metrics, handle)
    }

    #[tokio::test]
    async fn tails_parses_and_publishes_end_to_end() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let sink = Arc::new(CollectingSink {
            points: Mutex::new(Vec::new()),
        });
        let (metrics, counters) = start_monitor();

        let (pipeline, _depths) =
            Pipeline::spawn(&test_config(file.path(), 200), vec![sink.clone()], counters);

        tokio::time::sleep(Duration::from_millis(50)).await;
        append_lines(file.path(), &[SAMPLE_LINE]);
        tokio::time::sleep(Duration::from_millis(300)).await;

        let points = sink.points.lock();
        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.measurement, "nginx_log");
        assert_eq!(point.tags[0].1, "/api/v1/users");
        assert_eq!(point.tags[1].1, "GET");
        assert_eq!(point.tags[2].1, "http");
        assert_eq!(point.tags[3].1, "200");
        assert_eq!(
            point.fields,
            vec![
                ("UpstreamTime", crate::sink::FieldValue::Float(0.123)),
                ("RequestTime", crate::sink::FieldValue::Float(0.456)),
                ("BytesSend", crate::sink::FieldValue::Integer(512)),
            ]
        );
        let zone = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(
            point.timestamp,
            zone.with_ymd_and_hms(2023, 11, 10, 13, 55, 36).unwrap()
        );
        assert_eq!(metrics.lines_handled(), 1);
        assert_eq!(metrics.parse_errors(), 0);
        pipeline.abort();
    }

    #[tokio::test]
    async fn garbage_lines_are_counted_and_skipped() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let sink = Arc::new(CollectingSink {
            points: Mutex::new(Vec::new()),
        });
        let (metrics, counters) = start_monitor();

        let (pipeline, _depths) =
            Pipeline::spawn(&test_config(file.path(), 200), vec![sink.clone()], counters);

        tokio::time::sleep(Duration::from_millis(50)).await;
        append_lines(file.path(), &["definitely not an access log", SAMPLE_LINE]);
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(sink.points.lock().len(), 1);
        assert_eq!(metrics.lines_handled(), 2);
        assert_eq!(metrics.parse_errors(), 1);
        pipeline.abort();
    }

    #[tokio::test]
    async fn slow_sink_saturates_the_queues_without_losing_records() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let (metrics, counters) = start_monitor();
        let capacity = 4;

        let (pipeline, depths) = Pipeline::spawn(
            &test_config(file.path(), capacity),
            vec![Arc::new(StuckSink)],
            counters,
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        let lines = vec![SAMPLE_LINE; 50];
        append_lines(file.path(), &lines);
        tokio::time::sleep(Duration::from_millis(500)).await;

        // The record queue sits at its bound and the stages upstream have
        // stalled; the source is far behind the 50 appended lines.
        assert_eq!(depths.record_len(), capacity);
        assert_eq!(depths.raw_len(), capacity);
        let handled = metrics.lines_handled();
        assert!(handled < 50, "source should have stalled, handled {handled}");
        pipeline.abort();
    }

    #[tokio::test]
    async fn sink_write_failure_surfaces_as_fatal() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let (_metrics, counters) = start_monitor();

        let (mut pipeline, _depths) = Pipeline::spawn(
            &test_config(file.path(), 200),
            vec![Arc::new(FailingSink)],
            counters,
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        append_lines(file.path(), &[SAMPLE_LINE]);

        let fatal = tokio::time::timeout(Duration::from_secs(5), pipeline.fatal())
            .await
            .expect("fatal error should arrive");
        assert!(matches!(fatal, Some(FatalError::SinkWrite(_))));
        pipeline.abort();
    }
}
