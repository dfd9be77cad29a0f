//! Prometheus metrics for gateway observability
//!
//! Exposes metrics at /metrics endpoint for scraping by Prometheus.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;

use crate::topics::Topic;

/// Global Prometheus handle
static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Metric names
pub const BROKER_MESSAGES_TOTAL: &str = "buoy_broker_messages_total";
pub const BROKER_MESSAGES_DROPPED: &str = "buoy_broker_messages_dropped_total";
pub const BROKER_CONNECTED: &str = "buoy_broker_connected";
pub const PAYLOAD_ERRORS: &str = "buoy_payload_errors_total";
pub const IMAGE_WRITE_FAILURES: &str = "buoy_image_write_failures_total";
pub const INFERENCE_REQUESTS: &str = "buoy_inference_requests_total";
pub const INFERENCE_FAILURES: &str = "buoy_inference_failures_total";
pub const INFERENCE_LATENCY: &str = "buoy_inference_latency_seconds";

/// Initialize the metrics system
pub fn init_metrics() -> Result<(), BuildError> {
    if METRICS_HANDLE.get().is_some() {
        tracing::warn!("Metrics already initialized");
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    if METRICS_HANDLE.set(handle).is_err() {
        tracing::warn!("Metrics already initialized");
        return Ok(());
    }

    describe_counter!(BROKER_MESSAGES_TOTAL, "Messages received from the broker per topic");
    describe_counter!(
        BROKER_MESSAGES_DROPPED,
        "Messages dropped because the worker queue was full"
    );
    describe_gauge!(BROKER_CONNECTED, "1 while the broker connection is acknowledged");
    describe_counter!(PAYLOAD_ERRORS, "Broker messages rejected as malformed");
    describe_counter!(IMAGE_WRITE_FAILURES, "Camera frames that could not be stored");
    describe_counter!(INFERENCE_REQUESTS, "Inference rounds started per variant");
    describe_counter!(INFERENCE_FAILURES, "Inference rounds that degraded or failed");
    describe_histogram!(INFERENCE_LATENCY, "Inference round latency in seconds");

    tracing::info!("Metrics system initialized");
    Ok(())
}

/// Handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    METRICS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

// ============================================================================
// Broker Metrics
// ============================================================================

/// Record a message received on a subscribed topic
pub fn record_message_received(topic: Topic) {
    counter!(BROKER_MESSAGES_TOTAL, "topic" => topic.as_str()).increment(1);
}

/// Record a message dropped before reaching the worker
pub fn record_message_dropped(topic: Topic) {
    counter!(BROKER_MESSAGES_DROPPED, "topic" => topic.as_str()).increment(1);
}

/// Record a malformed broker message
pub fn record_payload_error() {
    counter!(PAYLOAD_ERRORS).increment(1);
}

pub fn set_broker_connected(connected: bool) {
    gauge!(BROKER_CONNECTED).set(if connected { 1.0 } else { 0.0 });
}

// ============================================================================
// Inference Metrics
// ============================================================================

pub fn record_image_write_failure() {
    counter!(IMAGE_WRITE_FAILURES).increment(1);
}

/// Record the start of an inference round
pub fn record_inference_request(variant: &'static str) {
    counter!(INFERENCE_REQUESTS, "variant" => variant).increment(1);
}

/// Record a degraded (sentinel) or failed inference round
pub fn record_inference_failure(variant: &'static str, reason: &'static str) {
    counter!(INFERENCE_FAILURES, "variant" => variant, "reason" => reason).increment(1);
}

pub fn record_inference_latency(variant: &'static str, duration: Duration) {
    histogram!(INFERENCE_LATENCY, "variant" => variant).record(duration.as_secs_f64());
}
