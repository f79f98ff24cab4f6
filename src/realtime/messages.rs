//! Wire frames and typed inbound messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors on the real-time channel surface.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("real-time client is not running")]
    NotRunning,
}

/// `{ "type": ..., "channel": ..., "data": ... }` in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Frame {
    pub fn new(kind: impl Into<String>, channel: Option<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            channel,
            data,
        }
    }

    pub fn subscribe(channel: &str) -> Self {
        Self::new("subscribe", Some(channel.to_string()), Value::Null)
    }

    pub fn unsubscribe(channel: &str) -> Self {
        Self::new("unsubscribe", Some(channel.to_string()), Value::Null)
    }

    pub fn encode(&self) -> Result<String, RealtimeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, RealtimeError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Inbound message kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Server acknowledged a subscription.
    Subscribed { channel: Option<String> },
    /// Server acknowledged an unsubscription.
    Unsubscribed { channel: Option<String> },
    Pong,
    /// Server-reported error.
    ServerError { message: String },
    /// Application event routed by its type tag.
    Event {
        kind: String,
        channel: Option<String>,
        payload: Value,
    },
}

impl From<Frame> for Inbound {
    fn from(frame: Frame) -> Self {
        match frame.kind.as_str() {
            "subscribed" => Inbound::Subscribed { channel: frame.channel },
            "unsubscribed" => Inbound::Unsubscribed { channel: frame.channel },
            "pong" => Inbound::Pong,
            "error" => Inbound::ServerError {
                message: match &frame.data {
                    Value::String(s) => s.clone(),
                    Value::Object(map) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| frame.data.to_string()),
                    other => other.to_string(),
                },
            },
            _ => Inbound::Event {
                kind: frame.kind,
                channel: frame.channel,
                payload: frame.data,
            },
        }
    }
}
