//! Wire frames.
//!
//! Frames are JSON text messages. The client only ever sends pings and
//! registrations; the server pushes publishes keyed by topic address.

use serde::{Deserialize, Serialize};

/// Frames sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Keepalive.
    Ping,
    /// Declare interest in a topic address.
    Register { address: String },
}

impl ClientFrame {
    pub fn register(address: impl Into<String>) -> Self {
        ClientFrame::Register {
            address: address.into(),
        }
    }

    /// Encode as a JSON text frame.
    pub fn to_text(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A frame received from the server, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub body: serde_json::Value,
}

/// What an inbound frame means to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A publish on a topic address.
    Publish {
        address: String,
        body: serde_json::Value,
    },
    /// Server answered a ping.
    Pong,
    /// Server rejected something we sent.
    Error { message: String },
    /// Neither an address nor a known control type.
    Unaddressed,
}

impl ServerFrame {
    /// Parse a JSON text frame.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn classify(self) -> Inbound {
        match (self.kind.as_deref(), self.address) {
            (Some("err"), _) => Inbound::Error {
                message: match self.body {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => "unspecified".to_string(),
                    other => other.to_string(),
                },
            },
            (_, Some(address)) => Inbound::Publish {
                address,
                body: self.body,
            },
            (Some("pong"), None) => Inbound::Pong,
            _ => Inbound::Unaddressed,
        }
    }
}

/// Error decoding or encoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}
