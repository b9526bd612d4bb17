//! Core types for the event-bus bridge.
//!
//! This crate provides the protocol primitives: topic addresses, wire frames
//! and payload records. It does no I/O; the client crate owns the tunnel.

mod address;
mod frame;
mod payload;

pub use address::{Address, UnknownAddress};
pub use frame::{ClientFrame, FrameError, Inbound, ServerFrame};
pub use payload::{
    ArtifactMetricResult, ArtifactMetrics, ArtifactTraceResult, IntegrationInfo, Payload,
    PayloadKind, SourceArtifact, Trace,
};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection and none being opened.
    #[default]
    Disconnected,
    /// First open in progress.
    Connecting,
    /// Live; heartbeats run and publishes are dispatched.
    Connected,
    /// Lost or never reached; a retry is pending or in progress.
    Reconnecting,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Whether the caller wants the tunnel up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientLifecycle {
    Active,
    #[default]
    Stopped,
}
