//! Monitor module — counter event stream, aggregator and sampler tasks,
//! and the HTTP status route.
//!
//! Stages never touch the shared counters directly. They emit events
//! through a [`CounterHandle`]; a single aggregator task owns all counter
//! writes. The handle is constructed at boot and passed down, so the
//! pipeline stays testable without process-wide globals.

pub mod metrics;
pub mod route;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

pub use metrics::{PipelineMetrics, SystemSnapshot};

/// Buffer depth of the counter event stream.
const EVENT_BUFFER: usize = 20;

/// One countable pipeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterEvent {
    LineHandled,
    ParseError,
}

/// Cheap cloneable sender half of the counter event stream.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    tx: mpsc::Sender<CounterEvent>,
}

impl CounterHandle {
    /// A fresh handle plus the receiving end, for callers that run their
    /// own aggregation (tests, mainly).
    pub fn channel() -> (Self, mpsc::Receiver<CounterEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (Self { tx }, rx)
    }

    pub async fn line_handled(&self) {
        let _ = self.tx.send(CounterEvent::LineHandled).await;
    }

    pub async fn parse_error(&self) {
        let _ = self.tx.send(CounterEvent::ParseError).await;
    }
}

/// Spawn the aggregator and sampler tasks and hand back the counter handle
/// the stages emit into.
pub fn spawn(metrics: Arc<PipelineMetrics>, sample_interval: Duration) -> CounterHandle {
    let (handle, mut events) = CounterHandle::channel();

    let aggregator_metrics = metrics.clone();
    tokio::spawn(async move {
        // Sole writer of the counters.
        while let Some(event) = events.recv().await {
            match event {
                CounterEvent::LineHandled => aggregator_metrics.record_line(),
                CounterEvent::ParseError => aggregator_metrics.record_error(),
            }
        }
    });

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sample_interval);
        // The first tick fires immediately; samples start one interval in.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            metrics.record_sample(metrics.lines_handled());
        }
    });

    handle
}
