//! Client side of the event-bus bridge.
//!
//! Keeps one websocket open to the remote bus, registers the artifact topics
//! on it, pings it every [`HEARTBEAT_INTERVAL`], and reconnects after
//! [`RECONNECT_DELAY`] whenever it drops. Inbound publishes are decoded and
//! handed to a [`LocalSink`].
//!
//! ```no_run
//! use eventbridge_client::{BridgeClient, BridgeConfig, BroadcastSink};
//!
//! # async fn run() -> Result<(), eventbridge_client::BridgeError> {
//! let sink = BroadcastSink::new(64);
//! let mut deliveries = sink.subscribe();
//! let client = BridgeClient::from_config(&BridgeConfig::new("localhost", 7000, false), sink)?;
//! client.start().await;
//! while let Ok(delivery) = deliveries.recv().await {
//!     println!("{}: {:?}", delivery.address, delivery.payload);
//! }
//! client.stop().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod connection;
mod dispatcher;
mod error;
mod events;
mod heartbeat;
mod registry;
mod sink;
mod transport;

pub use client::BridgeClient;
pub use config::{BridgeConfig, HEARTBEAT_INTERVAL, RECONNECT_DELAY};
pub use dispatcher::{Dispatcher, Route, RoutingTable};
pub use error::{BridgeError, DispatchError, TransportError};
pub use events::{EventBus, TunnelEvent};
pub use heartbeat::Heartbeat;
pub use registry::{SubscriptionEntry, SubscriptionRegistry};
pub use sink::{BroadcastSink, Delivery, LocalSink};
pub use transport::{Connection, FrameSink, FrameStream, Transport, WsTransport};

pub use eventbridge_core::{Address, ClientLifecycle, ConnectionState, Payload, PayloadKind};

#[cfg(test)]
mod tests;
