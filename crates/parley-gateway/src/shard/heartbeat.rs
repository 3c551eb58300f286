//! Heartbeat bookkeeping
//!
//! The shard owns the timer; this tracks acknowledgements and latency.

use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// What to do when a heartbeat is due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    Send,
    /// The previous beat was never acknowledged
    Zombie,
}

#[derive(Debug)]
pub struct Heartbeater {
    interval: Duration,
    acked: bool,
    last_sent: Option<Instant>,
    latency: Option<Duration>,
}

impl Heartbeater {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            acked: true,
            last_sent: None,
            latency: None,
        }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Delay before the first beat: `interval * jitter`, jitter in `[0, 1)`
    pub fn first_delay(&self) -> Duration {
        self.interval.mul_f64(rand::thread_rng().gen_range(0.0..1.0))
    }

    /// Called when the timer fires
    pub fn due(&self) -> Beat {
        if self.acked {
            Beat::Send
        } else {
            Beat::Zombie
        }
    }

    /// Record a beat going out; server-requested beats count too
    pub fn sent(&mut self, now: Instant) {
        self.acked = false;
        self.last_sent = Some(now);
    }

    pub fn acked(&mut self, now: Instant) {
        self.acked = true;
        if let Some(sent) = self.last_sent {
            self.latency = Some(now.saturating_duration_since(sent));
        }
    }

    #[inline]
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }
}
