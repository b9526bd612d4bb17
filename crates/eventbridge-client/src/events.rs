//! Tunnel events for observers.
//!
//! Transport and dispatch failures never reach the caller of `start`/`stop`.
//! They land here instead, next to the connection transitions, so a host can
//! watch the tunnel heal without being interrupted by it.

use crate::error::DispatchError;
use eventbridge_core::{Address, ConnectionState};
use std::time::Duration;
use tokio::sync::broadcast;

/// Something observable happened on the tunnel.
#[derive(Debug, Clone)]
pub enum TunnelEvent {
    StateChanged(ConnectionState),
    Registered(Address),
    HeartbeatSent,
    ReconnectScheduled { delay: Duration },
    TransportFailed { reason: String },
    DispatchFailed { error: DispatchError },
}

/// Broadcast channel for [`TunnelEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TunnelEvent>,
}

impl EventBus {
    /// Capacity is shared across receivers and clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fire-and-forget; dropped when nobody is subscribed.
    pub fn publish(&self, event: TunnelEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TunnelEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
