//! Keepalive timer.

use eventbridge_core::ConnectionState;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Periodic ping timer for the live connection.
///
/// Armed once per connected interval. The owner checks [`Heartbeat::should_emit`]
/// on every tick, so leaving `Connected` silences it even before `stop`.
#[derive(Debug)]
pub struct Heartbeat {
    period: Duration,
    interval: Option<Interval>,
}

impl Heartbeat {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Arm the timer. The first tick lands one period from now.
    pub fn start(&mut self) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn should_emit(&self, state: ConnectionState) -> bool {
        self.is_running() && state.is_connected()
    }

    /// Wait for the next tick. Never resolves while stopped.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let mut heartbeat = Heartbeat::new(Duration::from_secs(5));
        heartbeat.start();
        let started = Instant::now();
        heartbeat.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        heartbeat.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_never_ticks() {
        let mut heartbeat = Heartbeat::new(Duration::from_secs(5));
        heartbeat.start();
        heartbeat.stop();
        let res = tokio::time::timeout(Duration::from_secs(60), heartbeat.tick()).await;
        assert!(res.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn emits_only_while_connected() {
        let mut heartbeat = Heartbeat::new(Duration::from_secs(5));
        assert!(!heartbeat.should_emit(ConnectionState::Connected));

        heartbeat.start();
        assert!(heartbeat.should_emit(ConnectionState::Connected));
        assert!(!heartbeat.should_emit(ConnectionState::Reconnecting));
        assert!(!heartbeat.should_emit(ConnectionState::Disconnected));
    }
}
