//! Boot — logging init, config load, sink connections, pipeline wiring.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::{AgentConfig, Args};
use crate::monitor::{self, PipelineMetrics};
use crate::pipeline::Pipeline;
use crate::sink::{InfluxDsn, InfluxSink, MetricsSink};
use crate::state::{AgentState, SharedState};

/// Initialise the tracing / logging subsystem.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fluxtail_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load and validate configuration, connect one sink per publisher worker,
/// start the monitor tasks and spawn the pipeline.
pub async fn boot() -> Result<(SharedState, Pipeline)> {
    info!("Starting fluxtail agent v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = AgentConfig::load(&args).context("failed to load configuration")?;
    config
        .validate()
        .map_err(|reason| anyhow::anyhow!(reason))
        .context("configuration validation failed")?;

    let dsn: InfluxDsn = config.sink.dsn.parse().context("invalid sink DSN")?;
    let timeout = Duration::from_secs(config.sink.write_timeout_secs);
    // One connection per publisher worker. A connect failure here aborts
    // boot before any line is read.
    let sinks: Vec<Arc<dyn MetricsSink>> = (0..config.pipeline.publisher_workers)
        .map(|_| {
            InfluxSink::connect(&dsn, timeout)
                .map(|sink| Arc::new(sink) as Arc<dyn MetricsSink>)
        })
        .collect::<Result<_, _>>()
        .context("failed to connect metrics sink")?;

    let metrics = Arc::new(PipelineMetrics::new());
    let counters = monitor::spawn(
        metrics.clone(),
        Duration::from_secs(config.monitor.sample_interval_secs),
    );

    let (pipeline, depths) = Pipeline::spawn(&config, sinks, counters);
    info!(
        path = %config.source.path,
        parser_workers = config.pipeline.parser_workers,
        publisher_workers = config.pipeline.publisher_workers,
        "pipeline started"
    );

    let state = Arc::new(AgentState {
        config,
        metrics,
        depths,
    });
    Ok((state, pipeline))
}
