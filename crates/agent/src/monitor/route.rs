//! The HTTP status endpoint.

use std::time::Duration;

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::monitor::SystemSnapshot;
use crate::state::SharedState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/monitor", get(monitor))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// GET /monitor — the full metrics snapshot as JSON.
async fn monitor(State(state): State<SharedState>) -> Json<SystemSnapshot> {
    Json(state.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::AgentConfig;
    use crate::monitor::{CounterHandle, PipelineMetrics};
    use crate::pipeline::Pipeline;
    use crate::state::AgentState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn monitor_returns_the_snapshot_keys() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = AgentConfig::default();
        config.source.path = file.path().to_string_lossy().into_owned();

        let metrics = Arc::new(PipelineMetrics::new());
        metrics.record_line();
        metrics.record_sample(100);
        metrics.record_sample(150);

        let (counters, _events) = CounterHandle::channel();
        let (pipeline, depths) = Pipeline::spawn(&config, Vec::new(), counters);
        let state = Arc::new(AgentState {
            config,
            metrics,
            depths,
        });

        let response = router(state)
            .oneshot(Request::builder().uri("/monitor").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["HandleLine"], 1);
        assert_eq!(json["tps"], 10.0);
        assert_eq!(json["readChanLen"], 0);
        assert_eq!(json["writeChanLen"], 0);
        assert_eq!(json["errNum"], 0);
        assert!(json["runtime"].as_str().unwrap().ends_with('s'));

        pipeline.abort();
    }
}
