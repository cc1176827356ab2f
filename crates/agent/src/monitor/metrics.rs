//! Shared pipeline counters, the sampler window and the status snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

/// How many sampler readings the throughput window retains.
const SAMPLE_WINDOW: usize = 2;

/// Process-wide pipeline metrics.
///
/// Counters are written by the single aggregator task and read by the
/// status handler; `Relaxed` ordering is enough for observability data.
/// The snapshot is not transactional across fields.
#[derive(Debug)]
pub struct PipelineMetrics {
    lines_handled: AtomicU64,
    parse_errors: AtomicU64,
    samples: RwLock<Vec<u64>>,
    started: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            lines_handled: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            samples: RwLock::new(Vec::with_capacity(SAMPLE_WINDOW + 1)),
            started: Instant::now(),
        }
    }

    #[inline]
    pub fn record_line(&self) {
        self.lines_handled.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lines_handled(&self) -> u64 {
        self.lines_handled.load(Ordering::Relaxed)
    }

    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }

    /// Append a handled-line reading to the rolling window, discarding all
    /// but the [`SAMPLE_WINDOW`] most recent.
    pub fn record_sample(&self, lines_handled: u64) {
        let mut samples = self.samples.write();
        samples.push(lines_handled);
        if samples.len() > SAMPLE_WINDOW {
            samples.remove(0);
        }
    }

    /// Records per second over the last two sampler readings, or 0.0 while
    /// fewer than two samples exist.
    pub fn throughput(&self, sample_interval: Duration) -> f64 {
        let samples = self.samples.read();
        match samples.as_slice() {
            &[previous, latest] => {
                latest.saturating_sub(previous) as f64 / sample_interval.as_secs_f64()
            }
            _ => 0.0,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(
        &self,
        sample_interval: Duration,
        raw_queue_len: usize,
        record_queue_len: usize,
    ) -> SystemSnapshot {
        SystemSnapshot {
            handled_lines: self.lines_handled(),
            throughput: self.throughput(sample_interval),
            raw_queue_len,
            record_queue_len,
            run_time: format_duration(self.uptime()),
            errors: self.parse_errors(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// The monitor endpoint's response body. Key names are the established
/// wire contract of the `/monitor` route.
#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    #[serde(rename = "HandleLine")]
    pub handled_lines: u64,
    #[serde(rename = "tps")]
    pub throughput: f64,
    #[serde(rename = "readChanLen")]
    pub raw_queue_len: usize,
    #[serde(rename = "writeChanLen")]
    pub record_queue_len: usize,
    #[serde(rename = "runtime")]
    pub run_time: String,
    #[serde(rename = "errNum")]
    pub errors: u64,
}

/// Render a duration as `1h2m3s` style text.
fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
