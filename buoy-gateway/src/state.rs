//! Shared state of the buoy gateway.
//!
//! One [`BridgeState`] is created at startup and shared behind an `Arc` by the
//! broker task, the inference worker and the HTTP handlers. It holds the last
//! known orientation and the Result Store: the single latest inference
//! result served by `GET /api/project_response`.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::topics::Orientation;

/// Shared application state for the gateway.
#[derive(Debug)]
pub struct BridgeState {
    /// Last orientation whose inference round completed
    orientation: RwLock<Orientation>,

    /// Latest inference result; starts empty
    result: RwLock<String>,

    /// Whether the broker connection is currently acknowledged
    broker_connected: AtomicBool,

    /// Service start time for uptime calculations
    started_at: chrono::DateTime<chrono::Utc>,
}

impl Default for BridgeState {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeState {
    pub fn new() -> Self {
        Self {
            orientation: RwLock::new(Orientation::default()),
            result: RwLock::new(String::new()),
            broker_connected: AtomicBool::new(false),
            started_at: chrono::Utc::now(),
        }
    }

    /// Snapshot of the last known orientation.
    pub async fn orientation(&self) -> Orientation {
        *self.orientation.read().await
    }

    /// Last known Z-axis rotation, used as context for camera frames.
    pub async fn last_z(&self) -> f64 {
        self.orientation.read().await.z
    }

    pub async fn record_orientation(&self, orientation: Orientation) {
        *self.orientation.write().await = orientation;
        tracing::debug!(%orientation, "Orientation state updated");
    }

    /// Snapshot of the Result Store.
    pub async fn result(&self) -> String {
        self.result.read().await.clone()
    }

    /// Overwrite the Result Store.
    pub async fn set_result(&self, result: impl Into<String>) {
        *self.result.write().await = result.into();
    }

    pub fn set_broker_connected(&self, connected: bool) {
        self.broker_connected.store(connected, Ordering::SeqCst);
        crate::metrics::set_broker_connected(connected);
    }

    pub fn is_broker_connected(&self) -> bool {
        self.broker_connected.load(Ordering::SeqCst)
    }

    /// Get service uptime in seconds.
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}
