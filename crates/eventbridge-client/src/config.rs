//! Connection settings.

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Period between keepalive pings while connected.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(5000);

/// Wait before each reconnect attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Websocket endpoint of the event-bus bridge.
const BRIDGE_PATH: &str = "/eventbus/websocket";

/// Where the remote bus lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 7000,
            tls: false,
        }
    }
}

impl BridgeConfig {
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
        }
    }

    /// The websocket URL for this bridge.
    pub fn url(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{scheme}://{}:{}{BRIDGE_PATH}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.host.trim().is_empty() {
            return Err(BridgeError::InvalidConfig("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(BridgeError::InvalidConfig("port must be non-zero".into()));
        }
        Ok(())
    }
}
