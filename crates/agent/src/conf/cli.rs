//! CLI — startup flags, each an optional override of the loaded config.

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(
    name = "fluxtail-agent",
    version,
    about = "Tails an access log and ships parsed records to a time-series store"
)]
pub struct Args {
    /// Path of the log file to tail
    #[arg(long)]
    pub path: Option<String>,

    /// Sink DSN: addr@username@password@database@precision
    #[arg(long = "influx-dsn")]
    pub influx_dsn: Option<String>,

    /// Config file path (overrides AGENT_CONFIG_FILE)
    #[arg(long)]
    pub config: Option<String>,
}
