//! Serve — the monitor HTTP server plus the fatal-error select loop.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::monitor::route;
use crate::pipeline::Pipeline;
use crate::state::SharedState;

/// Serve the monitor endpoint until a fatal pipeline error or ctrl-c.
///
/// A fatal error aborts the remaining workers and returns `Err`, which
/// maps to a non-zero exit status in `main`. Shutdown is abrupt either
/// way; queued lines are not drained.
pub async fn serve(state: SharedState, mut pipeline: Pipeline) -> Result<()> {
    let addr: SocketAddr = state
        .config
        .monitor
        .bind_address
        .parse()
        .context("invalid monitor bind address")?;

    let app = route::router(state.clone());
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind monitor endpoint on {addr}"))?;
    info!("monitor endpoint listening on http://{}/monitor", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            pipeline.abort();
            result.context("monitor server failed")
        }
        fatal = pipeline.fatal() => {
            pipeline.abort();
            match fatal {
                Some(err) => {
                    error!(error = %err, "fatal pipeline error, shutting down");
                    Err(err.into())
                }
                None => {
                    warn!("all pipeline workers exited");
                    Ok(())
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
            pipeline.abort();
            Ok(())
        }
    }
}
