//! Broker topics and typed inbound messages
//!
//! The broker delivers `(topic, payload)` pairs. [`TopicRouter`] resolves the
//! topic string against the subscriptions it was built with, once, and turns
//! the payload into an [`InboundMessage`] variant. Nothing downstream looks at
//! topic strings again.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PayloadError;

/// Default topic carrying JPEG frames
pub const DEFAULT_PICTURE_TOPIC: &str = "PICTURE";

/// Default topic carrying `X,Y,Z` tilt readings
pub const DEFAULT_ORIENTATION_TOPIC: &str = "bssm/seonguk/project";

/// Kind of data a subscribed topic carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Picture,
    Orientation,
}

impl Topic {
    /// Label used in logs and metrics
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Picture => "picture",
            Self::Orientation => "orientation",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-axis tilt/rotation reading
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Orientation {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Parse a raw broker payload
    pub fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        std::str::from_utf8(payload)
            .map_err(|_| PayloadError::NotUtf8)?
            .parse()
    }
}

impl FromStr for Orientation {
    type Err = PayloadError;

    /// Parses `"X,Y,Z"`. Whitespace around each value is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, z] = fields.as_slice() else {
            return Err(PayloadError::FieldCount {
                found: fields.len(),
            });
        };

        Ok(Self {
            x: parse_axis('X', x)?,
            y: parse_axis('Y', y)?,
            z: parse_axis('Z', z)?,
        })
    }
}

fn parse_axis(axis: char, value: &str) -> Result<f64, PayloadError> {
    value.parse().map_err(|_| PayloadError::InvalidNumber {
        axis,
        value: value.to_string(),
    })
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X={}, Y={}, Z={}", self.x, self.y, self.z)
    }
}

/// A decoded broker message, ready for the inference worker
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Raw JPEG frame
    Picture(Bytes),
    /// Parsed tilt reading
    Orientation(Orientation),
}

impl InboundMessage {
    pub const fn topic(&self) -> Topic {
        match self {
            Self::Picture(_) => Topic::Picture,
            Self::Orientation(_) => Topic::Orientation,
        }
    }
}

/// Dispatch table from broker topic names to [`Topic`] kinds
#[derive(Debug, Clone)]
pub struct TopicRouter {
    routes: HashMap<String, Topic>,
}

impl Default for TopicRouter {
    fn default() -> Self {
        Self::new([
            (DEFAULT_PICTURE_TOPIC.to_string(), Topic::Picture),
            (DEFAULT_ORIENTATION_TOPIC.to_string(), Topic::Orientation),
        ])
    }
}

impl TopicRouter {
    pub fn new(routes: impl IntoIterator<Item = (String, Topic)>) -> Self {
        Self {
            routes: routes.into_iter().collect(),
        }
    }

    /// Topic names to subscribe to, in a stable order
    pub fn subscriptions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn resolve(&self, topic: &str) -> Option<Topic> {
        self.routes.get(topic).copied()
    }

    /// Decode a broker publish into a typed message
    pub fn route(&self, topic: &str, payload: Bytes) -> Result<InboundMessage, PayloadError> {
        match self.resolve(topic) {
            Some(Topic::Picture) => Ok(InboundMessage::Picture(payload)),
            Some(Topic::Orientation) => {
                Orientation::from_payload(&payload).map(InboundMessage::Orientation)
            }
            None => Err(PayloadError::UnknownTopic(topic.to_string())),
        }
    }
}
