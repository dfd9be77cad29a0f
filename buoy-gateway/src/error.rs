//! Error types for the buoy gateway.

use std::path::PathBuf;
use thiserror::Error;
use vision_bridge::InferenceError;

/// Startup configuration problems. Always fatal.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required environment variable {key} is not set")]
    Missing { key: &'static str },

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// A broker message that could not be turned into an [`InboundMessage`].
///
/// [`InboundMessage`]: crate::topics::InboundMessage
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Message on unsubscribed topic '{0}'")]
    UnknownTopic(String),

    #[error("Orientation payload is not valid UTF-8")]
    NotUtf8,

    #[error("Expected 3 comma-separated values, found {found}")]
    FieldCount { found: usize },

    #[error("Axis {axis} is not a number: '{value}'")]
    InvalidNumber { axis: char, value: String },
}

/// Failures of a single inference round that leave shared state untouched.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to read stored image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Inference(#[from] InferenceError),
}
