//! HTTP routes
//!
//! Endpoints:
//! - GET /api/project_response - Latest inference result, verbatim
//! - GET /health - Health check
//! - GET /ready - Readiness check (includes broker status)
//! - GET /metrics - Prometheus metrics

use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::BridgeState;

/// Build the gateway router
pub fn router(state: Arc<BridgeState>) -> Router {
    Router::new()
        .route("/api/project_response", get(project_response_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(crate::metrics::metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Current Result Store contents as `text/plain`, without any framing
async fn project_response_handler(State(state): State<Arc<BridgeState>>) -> String {
    state.result().await
}

/// Health check
async fn health_handler() -> &'static str {
    "OK"
}

/// Readiness check (includes broker status)
async fn ready_handler(State(state): State<Arc<BridgeState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "broker_connected": state.is_broker_connected(),
        "uptime_secs": state.uptime_secs(),
    }))
}
