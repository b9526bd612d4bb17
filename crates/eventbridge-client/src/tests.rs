//! Control-loop tests over an in-memory transport.
//!
//! Time is paused, so the 5 s heartbeat and reconnect timers fire as soon as
//! the runtime goes idle and elapsed time can be asserted exactly.

use crate::{
    Address, BridgeClient, BroadcastSink, ClientLifecycle, Connection, ConnectionState,
    Delivery, HEARTBEAT_INTERVAL, Payload, RECONNECT_DELAY, Transport, TransportError,
    TunnelEvent,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

const PING: &str = r#"{"type":"ping"}"#;

const REGISTRATIONS: [&str; 4] = [
    r#"{"type":"register","address":"artifact-config-updated"}"#,
    r#"{"type":"register","address":"artifact-status-updated"}"#,
    r#"{"type":"register","address":"artifact-metric-updated"}"#,
    r#"{"type":"register","address":"artifact-trace-updated"}"#,
];

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Accept,
    Refuse,
}

/// Server end of one accepted connection. Dropping it drops the connection.
struct ServerSide {
    outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<Result<String, TransportError>>,
}

impl ServerSide {
    async fn next(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    fn push(&self, text: &str) {
        self.inbound.send(Ok(text.to_string())).unwrap();
    }

    async fn expect_handshake(&mut self) {
        assert_eq!(self.next().await.as_deref(), Some(PING));
        for expected in REGISTRATIONS {
            assert_eq!(self.next().await.as_deref(), Some(expected));
        }
    }
}

struct MockTransport {
    script: Arc<Mutex<VecDeque<Outcome>>>,
    attempts: Arc<AtomicUsize>,
    accepted: mpsc::UnboundedSender<ServerSide>,
}

impl Transport for MockTransport {
    async fn connect(&self) -> Result<Connection, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Accept);
        if let Outcome::Refuse = outcome {
            return Err(TransportError::Closed);
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Result<String, TransportError>>();

        let sink = futures_util::sink::unfold(out_tx, |tx, text: String| async move {
            tx.send(text).map_err(|_| TransportError::Closed)?;
            Ok::<_, TransportError>(tx)
        });
        let stream = futures_util::stream::unfold(in_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        let _ = self.accepted.send(ServerSide {
            outbound: out_rx,
            inbound: in_tx,
        });
        Ok(Connection::new(sink, stream))
    }
}

struct Harness {
    client: BridgeClient<MockTransport, BroadcastSink>,
    accepted: mpsc::UnboundedReceiver<ServerSide>,
    attempts: Arc<AtomicUsize>,
    deliveries: broadcast::Receiver<Delivery>,
    events: broadcast::Receiver<TunnelEvent>,
}

impl Harness {
    fn new(script: impl IntoIterator<Item = Outcome>) -> Self {
        let (accepted_tx, accepted) = mpsc::unbounded_channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        let transport = MockTransport {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            attempts: attempts.clone(),
            accepted: accepted_tx,
        };
        let sink = BroadcastSink::new(64);
        let deliveries = sink.subscribe();
        let client = BridgeClient::new(transport, sink);
        let events = client.subscribe_events();
        Self {
            client,
            accepted,
            attempts,
            deliveries,
            events,
        }
    }

    async fn accept(&mut self) -> ServerSide {
        self.accepted.recv().await.unwrap()
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn drain_events(&mut self) -> Vec<TunnelEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = self.events.try_recv() {
            out.push(ev);
        }
        out
    }

    async fn wait_for_state(&self, want: ConnectionState) {
        let mut rx = self.client.watch_state();
        rx.wait_for(|s| *s == want).await.unwrap();
    }
}

fn metric_frame(name: &str) -> String {
    format!(
        r#"{{"address":"artifact-metric-updated","body":{{"app_uuid":"app","artifact_qualified_name":"{name}","artifact_metrics":[]}}}}"#
    )
}

#[tokio::test(start_paused = true)]
async fn connect_registers_then_pings_periodically() {
    let mut h = Harness::new([]);
    h.client.start().await;

    let mut server = h.accept().await;
    server.expect_handshake().await;
    assert_eq!(h.client.state(), ConnectionState::Connected);

    let t0 = Instant::now();
    assert_eq!(server.next().await.as_deref(), Some(PING));
    assert_eq!(t0.elapsed(), HEARTBEAT_INTERVAL);
    assert_eq!(server.next().await.as_deref(), Some(PING));
    assert_eq!(t0.elapsed(), HEARTBEAT_INTERVAL * 2);

    h.client.stop().await;
}

#[tokio::test(start_paused = true)]
async fn dropped_connection_reconnects_and_reregisters() {
    let mut h = Harness::new([]);
    h.client.start().await;

    let mut server = h.accept().await;
    server.expect_handshake().await;
    drop(server);

    let t0 = Instant::now();
    h.wait_for_state(ConnectionState::Reconnecting).await;

    let mut server = h.accept().await;
    assert_eq!(t0.elapsed(), RECONNECT_DELAY);
    server.expect_handshake().await;
    assert_eq!(h.client.state(), ConnectionState::Connected);

    let t1 = Instant::now();
    assert_eq!(server.next().await.as_deref(), Some(PING));
    assert_eq!(t1.elapsed(), HEARTBEAT_INTERVAL);
    assert_eq!(h.attempts(), 2);

    let registered = h
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, TunnelEvent::Registered(_)))
        .count();
    assert_eq!(registered, 8);

    h.client.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_while_connected_silences_heartbeat() {
    let mut h = Harness::new([]);
    h.client.start().await;

    let mut server = h.accept().await;
    server.expect_handshake().await;

    h.client.stop().await;
    assert_eq!(h.client.state(), ConnectionState::Disconnected);
    assert_eq!(h.client.lifecycle(), ClientLifecycle::Stopped);

    // The sink was dropped on close; nothing else was ever sent.
    assert_eq!(server.next().await, None);

    tokio::time::sleep(HEARTBEAT_INTERVAL * 4).await;
    assert_eq!(h.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_while_reconnecting_cancels_pending_attempt() {
    let mut h = Harness::new([Outcome::Refuse]);
    h.client.start().await;
    h.wait_for_state(ConnectionState::Reconnecting).await;
    assert_eq!(h.attempts(), 1);

    h.client.stop().await;
    assert_eq!(h.client.state(), ConnectionState::Disconnected);

    tokio::time::sleep(RECONNECT_DELAY * 10).await;
    assert_eq!(h.attempts(), 1);
    assert!(h.accepted.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn repeated_failures_keep_one_reconnect_outstanding() {
    let mut h = Harness::new([Outcome::Refuse, Outcome::Refuse, Outcome::Refuse]);
    let t0 = Instant::now();
    h.client.start().await;

    let mut server = h.accept().await;
    assert_eq!(t0.elapsed(), RECONNECT_DELAY * 3);
    assert_eq!(h.attempts(), 4);
    server.expect_handshake().await;

    let scheduled = h
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, TunnelEvent::ReconnectScheduled { .. }))
        .count();
    assert_eq!(scheduled, 3);

    h.client.stop().await;
}

#[tokio::test(start_paused = true)]
async fn metric_publish_reaches_sink_once() {
    let mut h = Harness::new([]);
    h.client.start().await;
    let mut server = h.accept().await;
    server.expect_handshake().await;

    server.push(&metric_frame("Foo.bar()"));
    let delivery = h.deliveries.recv().await.unwrap();
    assert_eq!(delivery.address, Address::ArtifactMetricUpdated);
    assert!(matches!(
        delivery.payload,
        Payload::ArtifactMetric(ref r) if r.artifact_qualified_name == "Foo.bar()"
    ));
    assert!(h.deliveries.try_recv().is_err());

    h.client.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_address_is_reported_and_tunnel_stays_up() {
    let mut h = Harness::new([]);
    h.client.start().await;
    let mut server = h.accept().await;
    server.expect_handshake().await;

    server.push(r#"{"address":"unknown-topic","body":{}}"#);
    server.push(r#"{"address":"artifact-trace-updated","body":{"traces":7}}"#);
    server.push(&metric_frame("after"));

    let delivery = h.deliveries.recv().await.unwrap();
    assert_eq!(delivery.address, Address::ArtifactMetricUpdated);
    assert_eq!(h.client.state(), ConnectionState::Connected);
    assert_eq!(h.attempts(), 1);

    let failures = h
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, TunnelEvent::DispatchFailed { .. }))
        .count();
    assert_eq!(failures, 2);

    // Still the same connection: the next heartbeat arrives on it.
    assert_eq!(server.next().await.as_deref(), Some(PING));

    h.client.stop().await;
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent_and_restartable() {
    let mut h = Harness::new([]);
    h.client.start().await;
    h.client.start().await;
    assert_eq!(h.client.lifecycle(), ClientLifecycle::Active);

    let mut server = h.accept().await;
    server.expect_handshake().await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(h.attempts(), 1);

    h.client.stop().await;
    h.client.stop().await;

    h.client.start().await;
    let mut server = h.accept().await;
    server.expect_handshake().await;
    assert_eq!(h.attempts(), 2);
    assert_eq!(h.client.state(), ConnectionState::Connected);

    h.client.stop().await;
}
