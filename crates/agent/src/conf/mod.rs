//! Conf module: configuration model, layered loading, and CLI flags.

pub mod cli;
pub mod load;
pub mod model;

pub use cli::Args;
pub use model::{AgentConfig, MonitorConfig, PipelineConfig, SinkConfig, SourceConfig};
