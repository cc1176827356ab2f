//! Shared read-side state handed to the monitor endpoint.

use std::sync::Arc;
use std::time::Duration;

use crate::conf::AgentConfig;
use crate::monitor::{PipelineMetrics, SystemSnapshot};
use crate::pipeline::QueueDepths;

pub struct AgentState {
    pub config: AgentConfig,
    pub metrics: Arc<PipelineMetrics>,
    pub depths: QueueDepths,
}

pub type SharedState = Arc<AgentState>;

impl AgentState {
    /// Best-effort view of the pipeline right now: counters, live queue
    /// depths, uptime and the two-sample throughput estimate.
    pub fn snapshot(&self) -> SystemSnapshot {
        self.metrics.snapshot(
            Duration::from_secs(self.config.monitor.sample_interval_secs),
            self.depths.raw_len(),
            self.depths.record_len(),
        )
    }
}
