//! The tunnel's control loop.
//!
//! One task owns the connection. Everything that can happen to it (an open
//! finishing, a frame arriving, the socket dropping, a timer firing, the
//! caller stopping) is turned into an [`Event`] by a single `select!` and
//! handled to completion before the next one is taken. State is only ever
//! written from [`ConnectionManager::handle`].
//!
//! Lifecycle:
//! 1. Open; on success send a ping, arm the heartbeat and register every
//!    registry address in order.
//! 2. Dispatch inbound frames while `Connected`.
//! 3. On open failure or loss, disarm the heartbeat and schedule one
//!    reconnect after [`RECONNECT_DELAY`].
//! 4. On cancel, drop pending timers and close the socket.

use crate::config::RECONNECT_DELAY;
use crate::dispatcher::Dispatcher;
use crate::error::TransportError;
use crate::events::{EventBus, TunnelEvent};
use crate::heartbeat::Heartbeat;
use crate::registry::SubscriptionRegistry;
use crate::sink::LocalSink;
use crate::transport::{Connection, Transport};
use eventbridge_core::{ClientFrame, ConnectionState};
use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type OpenFuture = BoxFuture<'static, Result<Connection, TransportError>>;

/// Internal events consumed by the control loop.
enum Event {
    Stop,
    Opened(Connection),
    OpenFailed(TransportError),
    Frame(String),
    Closed(Option<TransportError>),
    Tick,
    ReconnectDue,
}

pub(crate) struct ConnectionManager<T, S> {
    transport: Arc<T>,
    registry: SubscriptionRegistry,
    dispatcher: Dispatcher<S>,
    heartbeat: Heartbeat,
    events: EventBus,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    conn: Option<Connection>,
    opening: Option<OpenFuture>,
    /// Pending reconnect. At most one exists at any time.
    reconnect: Option<Pin<Box<Sleep>>>,
}

impl<T: Transport, S: LocalSink> ConnectionManager<T, S> {
    pub(crate) fn new(
        transport: Arc<T>,
        registry: SubscriptionRegistry,
        dispatcher: Dispatcher<S>,
        heartbeat: Heartbeat,
        events: EventBus,
        state: watch::Sender<ConnectionState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            registry,
            dispatcher,
            heartbeat,
            events,
            state,
            cancel,
            conn: None,
            opening: None,
            reconnect: None,
        }
    }

    pub(crate) async fn run(mut self) {
        self.set_state(ConnectionState::Connecting);
        self.open();

        loop {
            let event = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => Event::Stop,

                result = wait_open(&mut self.opening) => match result {
                    Ok(conn) => Event::Opened(conn),
                    Err(e) => Event::OpenFailed(e),
                },

                _ = wait_timer(&mut self.reconnect) => Event::ReconnectDue,

                frame = next_frame(&mut self.conn) => match frame {
                    Some(Ok(text)) => Event::Frame(text),
                    Some(Err(e)) => Event::Closed(Some(e)),
                    None => Event::Closed(None),
                },

                _ = self.heartbeat.tick() => Event::Tick,
            };

            if !self.handle(event).await {
                break;
            }
        }

        self.shutdown().await;
    }

    /// Apply one event. Returns `false` once the loop should exit.
    async fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Stop => return false,
            Event::Opened(conn) => {
                self.opening = None;
                self.on_open(conn).await;
            }
            Event::OpenFailed(e) => {
                self.opening = None;
                warn!(error = %e, "Failed to open bridge connection");
                self.events.publish(TunnelEvent::TransportFailed {
                    reason: e.to_string(),
                });
                self.schedule_reconnect();
            }
            Event::Frame(text) => self.on_frame(&text),
            Event::Closed(reason) => self.connection_lost(reason),
            Event::Tick => self.on_tick().await,
            Event::ReconnectDue => {
                self.reconnect = None;
                if self.cancel.is_cancelled() {
                    return false;
                }
                if let Some(mut stale) = self.conn.take() {
                    let _ = stale.sink.close().await;
                }
                info!("Reconnecting to bridge");
                self.open();
            }
        }
        true
    }

    fn open(&mut self) {
        let transport = self.transport.clone();
        self.opening = Some(Box::pin(async move { transport.connect().await }));
    }

    async fn on_open(&mut self, conn: Connection) {
        self.conn = Some(conn);
        self.set_state(ConnectionState::Connected);

        if let Err(e) = self.send(&ClientFrame::Ping).await {
            self.connection_lost(Some(e));
            return;
        }
        self.heartbeat.start();

        let registrations: Vec<_> = self.registry.register_frames().collect();
        for (address, frame) in registrations {
            if let Err(e) = self.send(&frame).await {
                self.connection_lost(Some(e));
                return;
            }
            debug!(%address, "Registered");
            self.events.publish(TunnelEvent::Registered(address));
        }
    }

    fn on_frame(&mut self, text: &str) {
        if !self.current_state().is_connected() {
            return;
        }
        match self.dispatcher.dispatch(text) {
            Ok(Some(address)) => debug!(%address, "Delivered"),
            Ok(None) => {}
            Err(error) => {
                warn!(%error, "Dropped inbound frame");
                self.events.publish(TunnelEvent::DispatchFailed { error });
            }
        }
    }

    async fn on_tick(&mut self) {
        if !self.heartbeat.should_emit(self.current_state()) {
            self.heartbeat.stop();
            return;
        }
        match self.send(&ClientFrame::Ping).await {
            Ok(()) => {
                debug!("Heartbeat sent");
                self.events.publish(TunnelEvent::HeartbeatSent);
            }
            Err(e) => self.connection_lost(Some(e)),
        }
    }

    async fn send(&mut self, frame: &ClientFrame) -> Result<(), TransportError> {
        let text = frame.to_text()?;
        let conn = self.conn.as_mut().ok_or(TransportError::Closed)?;
        conn.sink.send(text).await
    }

    fn connection_lost(&mut self, reason: Option<TransportError>) {
        self.conn = None;
        self.heartbeat.stop();
        let reason = reason.map_or_else(|| "stream ended".to_string(), |e| e.to_string());
        warn!(%reason, "Bridge connection lost");
        self.events.publish(TunnelEvent::TransportFailed { reason });
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        if self.reconnect.is_some() {
            debug!("Reconnect already pending");
            return;
        }
        self.set_state(ConnectionState::Reconnecting);
        self.reconnect = Some(Box::pin(tokio::time::sleep(RECONNECT_DELAY)));
        info!(delay_ms = RECONNECT_DELAY.as_millis() as u64, "Reconnect scheduled");
        self.events.publish(TunnelEvent::ReconnectScheduled {
            delay: RECONNECT_DELAY,
        });
    }

    async fn shutdown(&mut self) {
        self.reconnect = None;
        self.opening = None;
        self.heartbeat.stop();
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.sink.close().await {
                debug!(error = %e, "Error closing bridge connection");
            }
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            info!(from = ?prev, to = ?next, "Bridge state changed");
            self.events.publish(TunnelEvent::StateChanged(next));
        }
    }
}

async fn wait_open(opening: &mut Option<OpenFuture>) -> Result<Connection, TransportError> {
    match opening.as_mut() {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn wait_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(conn: &mut Option<Connection>) -> Option<Result<String, TransportError>> {
    match conn.as_mut() {
        Some(conn) => conn.stream.next().await,
        None => std::future::pending().await,
    }
}
