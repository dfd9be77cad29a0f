//! Buoy Gateway
//!
//! Bridges a buoy's camera and tilt sensor, publishing over MQTT, with a
//! multimodal inference service, and serves the latest result over HTTP:
//! - Camera frames on `PICTURE` are stored to disk and analysed for trash and
//!   marine life positions
//! - Tilt readings (`X,Y,Z`) on `bssm/seonguk/project` are classified into a
//!   wave direction
//! - `GET /api/project_response` returns whatever the last inference produced
//!
//! Data flow: broker task → bounded queue → inference worker → Result Store →
//! HTTP handler (pull, on demand).

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod metrics;
pub mod mqtt;
pub mod state;
pub mod topics;
pub mod worker;

pub use bridge::{InferenceBridge, INVALID_RESPONSE};
pub use config::BridgeConfig;
pub use error::{BridgeError, ConfigError, PayloadError};
pub use state::BridgeState;
pub use topics::{InboundMessage, Orientation, Topic, TopicRouter};

/// Initialize tracing with standard configuration
pub fn init_tracing(service_name: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter(service_name))
        .init();
}

/// Initialize tracing with JSON output (for production)
pub fn init_tracing_json(service_name: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter(service_name))
        .json()
        .init();
}

fn default_filter(service_name: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "{service_name}=info,vision_bridge=info,tower_http=debug"
        ))
    })
}
