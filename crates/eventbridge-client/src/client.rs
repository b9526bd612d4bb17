//! Public handle to the tunnel.

use crate::config::{BridgeConfig, HEARTBEAT_INTERVAL};
use crate::connection::ConnectionManager;
use crate::dispatcher::{Dispatcher, RoutingTable};
use crate::error::BridgeError;
use crate::events::{EventBus, TunnelEvent};
use crate::heartbeat::Heartbeat;
use crate::registry::SubscriptionRegistry;
use crate::sink::LocalSink;
use crate::transport::{Transport, WsTransport};
use eventbridge_core::{ClientLifecycle, ConnectionState};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One started lifecycle: the control task and the token that ends it.
struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// A self-healing subscription tunnel to a remote event bus.
///
/// Callers see two things: subscriptions are active, or the client is
/// stopped. Transport failures are handled internally and show up only on
/// [`BridgeClient::subscribe_events`].
pub struct BridgeClient<T, S> {
    transport: Arc<T>,
    sink: Arc<S>,
    registry: SubscriptionRegistry,
    routes: RoutingTable,
    events: EventBus,
    state: watch::Sender<ConnectionState>,
    lifecycle: watch::Sender<ClientLifecycle>,
    session: Mutex<Option<Session>>,
}

impl<S: LocalSink> BridgeClient<WsTransport, S> {
    /// Client for the websocket bridge described by `config`.
    pub fn from_config(config: &BridgeConfig, sink: S) -> Result<Self, BridgeError> {
        config.validate()?;
        Ok(Self::new(WsTransport::new(config.url()), sink))
    }
}

impl<T: Transport, S: LocalSink> BridgeClient<T, S> {
    pub fn new(transport: T, sink: S) -> Self {
        Self {
            transport: Arc::new(transport),
            sink: Arc::new(sink),
            registry: SubscriptionRegistry::default(),
            routes: RoutingTable::default(),
            events: EventBus::default(),
            state: watch::Sender::new(ConnectionState::Disconnected),
            lifecycle: watch::Sender::new(ClientLifecycle::Stopped),
            session: Mutex::new(None),
        }
    }

    /// Replace the registrations sent on every connect.
    pub fn with_registry(mut self, registry: SubscriptionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Start the tunnel. A no-op while already active.
    pub async fn start(&self) {
        let mut session = self.session.lock().await;
        if session.is_some() {
            debug!("Bridge already active");
            return;
        }

        info!("Starting bridge subscriptions");
        let cancel = CancellationToken::new();
        let manager = ConnectionManager::new(
            self.transport.clone(),
            self.registry.clone(),
            Dispatcher::new(self.routes.clone(), self.sink.clone()),
            Heartbeat::new(HEARTBEAT_INTERVAL),
            self.events.clone(),
            self.state.clone(),
            cancel.clone(),
        );
        let task = tokio::spawn(manager.run());

        self.lifecycle.send_replace(ClientLifecycle::Active);
        *session = Some(Session { cancel, task });
    }

    /// Stop the tunnel and wait until it is quiet.
    ///
    /// Pending reconnect and heartbeat timers are dropped and the live
    /// connection is closed before this returns.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        let Some(Session { cancel, task }) = session.take() else {
            return;
        };

        self.lifecycle.send_replace(ClientLifecycle::Stopped);
        cancel.cancel();
        if let Err(e) = task.await {
            warn!(error = %e, "Bridge task ended abnormally");
            self.state.send_replace(ConnectionState::Disconnected);
        }
        info!("Bridge stopped");
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn lifecycle(&self) -> ClientLifecycle {
        *self.lifecycle.borrow()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TunnelEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }
}

impl<T, S> Drop for BridgeClient<T, S> {
    fn drop(&mut self) {
        // Best effort; the task closes the socket on its own.
        if let Some(session) = self.session.get_mut().take() {
            session.cancel.cancel();
        }
    }
}
