//! Randomized exponential backoff for reconnect loops
//!
//! Each call to [`ExponentialBackoff::delay`] doubles the upper bound of the
//! random delay until `max_exponent` is reached. If the previous call was long
//! enough ago the connection is considered healthy again and the exponent
//! starts over.

use rand::Rng;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max_exponent: u32,
    integral: bool,
    exponent: u32,
    reset_after: Duration,
    last_invocation: Instant,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 10, false)
    }
}

impl ExponentialBackoff {
    /// `integral` rounds delays down to whole multiples of `base`
    pub fn new(base: Duration, max_exponent: u32, integral: bool) -> Self {
        Self {
            base,
            max_exponent,
            integral,
            exponent: 0,
            reset_after: base * 2u32.saturating_pow(max_exponent + 1),
            last_invocation: Instant::now(),
        }
    }

    /// Next delay to wait before retrying
    pub fn delay(&mut self) -> Duration {
        self.delay_at(Instant::now())
    }

    fn delay_at(&mut self, now: Instant) -> Duration {
        let interval = now.saturating_duration_since(self.last_invocation);
        self.last_invocation = now;

        if interval > self.reset_after {
            self.exponent = 0;
        }
        self.exponent = (self.exponent + 1).min(self.max_exponent);

        let upper = self.base * 2u32.saturating_pow(self.exponent);
        let mut rng = rand::thread_rng();
        if self.integral {
            let steps = 2u32.saturating_pow(self.exponent);
            self.base * rng.gen_range(0..steps)
        } else {
            upper.mul_f64(rng.gen_range(0.0..1.0))
        }
    }

    /// Current exponent, for logging
    #[inline]
    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    /// Start over after a healthy connection
    pub fn reset(&mut self) {
        self.exponent = 0;
    }
}
