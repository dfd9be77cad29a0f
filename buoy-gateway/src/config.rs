//! Gateway configuration from environment variables.
//!
//! Every setting except the inference credential has a default. Unparsable
//! values fall back to the default with a warning; the credential is
//! mandatory and its absence aborts startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use vision_bridge::{ClientConfig, RetryPolicy, DEFAULT_API_BASE};

use crate::error::ConfigError;
use crate::topics::{Topic, DEFAULT_ORIENTATION_TOPIC, DEFAULT_PICTURE_TOPIC};

/// Credential for the inference service
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_MAX_TOKENS: u32 = 300;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 8_000;

const DEFAULT_BROKER_HOST: &str = "broker.mqtt-dashboard.com";
const DEFAULT_BROKER_PORT: u16 = 1883;
const DEFAULT_KEEP_ALIVE_SECS: u64 = 60;
/// Camera frames are far larger than the client's 10 KiB default
const DEFAULT_MAX_PACKET_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_IMAGE_PATH: &str = "received_image.jpg";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Settings for the outbound inference calls
#[derive(Clone, Debug)]
pub struct InferenceSettings {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl InferenceSettings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_key.clone())
            .with_api_base(self.api_base.clone())
            .with_timeout(self.timeout)
            .with_retry(RetryPolicy {
                max_attempts: self.max_attempts,
                initial_backoff: self.initial_backoff,
                max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
            })
    }
}

/// Settings for the broker connection
#[derive(Clone, Debug)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    pub max_packet_bytes: usize,
    pub picture_topic: String,
    pub orientation_topic: String,
}

impl MqttSettings {
    /// Topic-to-kind routes the broker client subscribes to
    pub fn routes(&self) -> Vec<(String, Topic)> {
        vec![
            (self.picture_topic.clone(), Topic::Picture),
            (self.orientation_topic.clone(), Topic::Orientation),
        ]
    }
}

/// Complete gateway configuration
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub inference: InferenceSettings,
    pub mqtt: MqttSettings,
    /// Where the latest camera frame is stored
    pub image_path: PathBuf,
    /// HTTP listen address
    pub bind_addr: String,
    /// Capacity of the broker-to-worker queue
    pub worker_queue_capacity: usize,
}

impl BridgeConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing { key: API_KEY_VAR })?;

        let max_attempts = parse_or(&lookup, "INFERENCE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "INFERENCE_MAX_ATTEMPTS",
                reason: "must be at least 1".to_string(),
            });
        }

        let worker_queue_capacity =
            parse_or(&lookup, "WORKER_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY);
        if worker_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "WORKER_QUEUE_CAPACITY",
                reason: "must be at least 1".to_string(),
            });
        }

        let inference = InferenceSettings {
            api_key,
            api_base: lookup("OPENAI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: parse_or(&lookup, "OPENAI_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "INFERENCE_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )),
            max_attempts,
            initial_backoff: Duration::from_millis(parse_or(
                &lookup,
                "INFERENCE_BACKOFF_MS",
                DEFAULT_BACKOFF_MS,
            )),
        };

        let mqtt = MqttSettings {
            host: lookup("MQTT_BROKER_HOST").unwrap_or_else(|| DEFAULT_BROKER_HOST.to_string()),
            port: parse_or(&lookup, "MQTT_BROKER_PORT", DEFAULT_BROKER_PORT),
            client_id: lookup("MQTT_CLIENT_ID")
                .unwrap_or_else(|| format!("buoy-gateway-{}", uuid::Uuid::new_v4().simple())),
            keep_alive: Duration::from_secs(parse_or(
                &lookup,
                "MQTT_KEEP_ALIVE_SECS",
                DEFAULT_KEEP_ALIVE_SECS,
            )),
            max_packet_bytes: parse_or(&lookup, "MQTT_MAX_PACKET_BYTES", DEFAULT_MAX_PACKET_BYTES),
            picture_topic: lookup("MQTT_PICTURE_TOPIC")
                .unwrap_or_else(|| DEFAULT_PICTURE_TOPIC.to_string()),
            orientation_topic: lookup("MQTT_ORIENTATION_TOPIC")
                .unwrap_or_else(|| DEFAULT_ORIENTATION_TOPIC.to_string()),
        };

        if mqtt.picture_topic == mqtt.orientation_topic {
            return Err(ConfigError::Invalid {
                key: "MQTT_ORIENTATION_TOPIC",
                reason: "must differ from MQTT_PICTURE_TOPIC".to_string(),
            });
        }

        Ok(Self {
            inference,
            mqtt,
            image_path: lookup("IMAGE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_IMAGE_PATH), PathBuf::from),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            worker_queue_capacity,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring unparsable setting, using default");
            default
        }),
        None => default,
    }
}
