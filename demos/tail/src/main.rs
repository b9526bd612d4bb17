//! Tail the event-bus bridge.
//!
//! Opens the tunnel, logs every decoded payload and tunnel event, and stops
//! cleanly on Ctrl-C.
//!
//!   cargo run -p eventbridge-tail -- --host localhost --port 7000
//!   cargo run -p eventbridge-tail -- --config bridge.toml --tls

use anyhow::Context;
use clap::Parser;
use eventbridge_client::{BridgeClient, BridgeConfig, BroadcastSink, TunnelEvent};
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "eventbridge-tail", about = "Tail payloads from an event-bus bridge")]
struct Args {
    /// TOML file with `host`, `port` and `tls`.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, env = "EVENTBRIDGE_HOST")]
    host: Option<String>,

    #[arg(long, env = "EVENTBRIDGE_PORT")]
    port: Option<u16>,

    #[arg(long, env = "EVENTBRIDGE_TLS")]
    tls: bool,
}

impl Args {
    fn bridge_config(&self) -> anyhow::Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
            }
            None => BridgeConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        config.tls |= self.tls;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("eventbridge_tail=info".parse()?)
                .add_directive("eventbridge_client=info".parse()?),
        )
        .init();

    let config = Args::parse().bridge_config()?;
    tracing::info!("Tailing {}", config.url());

    let sink = BroadcastSink::new(256);
    let mut deliveries = sink.subscribe();
    let client = BridgeClient::from_config(&config, sink)?;
    let mut events = client.subscribe_events();
    client.start().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            delivery = deliveries.recv() => match delivery {
                Ok(d) => tracing::info!(address = %d.address, "{:?}", d.payload),
                Err(RecvError::Lagged(n)) => tracing::warn!("Skipped {} deliveries", n),
                Err(RecvError::Closed) => break,
            },

            event = events.recv() => match event {
                Ok(TunnelEvent::DispatchFailed { error }) => tracing::warn!("Dispatch failed: {}", error),
                Ok(TunnelEvent::HeartbeatSent) => {}
                Ok(other) => tracing::debug!("{:?}", other),
                Err(RecvError::Lagged(n)) => tracing::warn!("Skipped {} tunnel events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    client.stop().await;
    Ok(())
}
