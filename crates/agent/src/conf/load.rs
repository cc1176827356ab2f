//! Load — layered configuration loading.
//!
//! Priority: CLI flags > environment variables > config file > defaults.

use std::path::Path;

use anyhow::{Context, Result};

use super::cli::Args;
use super::model::AgentConfig;

const DEFAULT_CONFIG_FILE: &str = "/etc/fluxtail/agent.toml";

impl AgentConfig {
    pub fn load(args: &Args) -> Result<Self> {
        let config_path = args
            .config
            .clone()
            .or_else(|| std::env::var("AGENT_CONFIG_FILE").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("loading configuration from {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!(
                "config file not found at {}, using defaults and environment",
                config_path
            );
            Self::default()
        };

        config.apply_env();

        if let Some(path) = &args.path {
            config.source.path = path.clone();
        }
        if let Some(dsn) = &args.influx_dsn {
            config.sink.dsn = dsn.clone();
        }

        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse config file {path}"))
    }

    /// Environment overrides for the settings operators most often change
    /// per deployment.
    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("AGENT_LOG_PATH") {
            self.source.path = path;
        }
        if let Ok(dsn) = std::env::var("AGENT_INFLUX_DSN") {
            self.sink.dsn = dsn;
        }
        if let Ok(addr) = std::env::var("AGENT_MONITOR_ADDRESS") {
            self.monitor.bind_address = addr;
        }
        if let Ok(Ok(workers)) = std::env::var("AGENT_PARSER_WORKERS").map(|v| v.parse()) {
            self.pipeline.parser_workers = workers;
        }
        if let Ok(Ok(workers)) = std::env::var("AGENT_PUBLISHER_WORKERS").map(|v| v.parse()) {
            self.pipeline.publisher_workers = workers;
        }
        if let Ok(Ok(capacity)) = std::env::var("AGENT_QUEUE_CAPACITY").map(|v| v.parse()) {
            self.pipeline.queue_capacity = capacity;
        }
    }
}
