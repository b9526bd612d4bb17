//! Local delivery of decoded payloads.

use eventbridge_core::{Address, Payload};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Host-side consumer of decoded payloads, keyed by topic address.
pub trait LocalSink: Send + Sync + 'static {
    fn publish(&self, address: Address, payload: Payload);
}

impl<S: LocalSink + ?Sized> LocalSink for Arc<S> {
    fn publish(&self, address: Address, payload: Payload) {
        (**self).publish(address, payload)
    }
}

/// One decoded payload handed to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub address: Address,
    pub payload: Payload,
}

/// In-process fan-out sink over [`tokio::sync::broadcast`].
///
/// Publishing never blocks. Deliveries sent while nobody listens are dropped,
/// and a slow receiver sees `Lagged` and skips ahead.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<Delivery>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Delivery> {
        self.tx.subscribe()
    }
}

impl LocalSink for BroadcastSink {
    fn publish(&self, address: Address, payload: Payload) {
        let _ = self.tx.send(Delivery { address, payload });
    }
}
