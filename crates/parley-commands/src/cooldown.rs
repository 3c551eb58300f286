//! Per-command cooldowns
//!
//! Each bucket key gets a token bucket holding up to `rate` uses. One use
//! refills every `per / rate`, so a full bucket is back after `per`.

use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use parley_core::Message;
use std::num::NonZeroU32;
use std::time::Duration;

/// What a cooldown is shared by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BucketType {
    /// One bucket for everyone
    #[default]
    Default,
    User,
    /// Per guild; DMs are bucketed per channel
    Guild,
    Channel,
    /// Per user within a guild
    Member,
}

impl BucketType {
    fn key(self, message: &Message) -> (u64, u64) {
        let author = message.author.id.get();
        let channel = message.channel_id.get();
        match self {
            Self::Default => (0, 0),
            Self::User => (author, 0),
            Self::Guild => (message.guild_id.map_or(channel, |g| g.get()), 0),
            Self::Channel => (channel, 0),
            Self::Member => (message.guild_id.map_or(0, |g| g.get()), author),
        }
    }
}

type KeyedLimiter = RateLimiter<(u64, u64), DefaultKeyedStateStore<(u64, u64)>, DefaultClock>;

pub struct Cooldown {
    rate: u32,
    per: Duration,
    bucket: BucketType,
    limiter: Option<KeyedLimiter>,
}

impl Cooldown {
    /// Bursts of up to `rate` uses, refilled one at a time every `per / rate`;
    /// a zero rate or period disables the cooldown
    pub fn new(rate: u32, per: Duration, bucket: BucketType) -> Self {
        let limiter = NonZeroU32::new(rate).and_then(|burst| {
            let quota = Quota::with_period(per / rate)?.allow_burst(burst);
            Some(RateLimiter::keyed(quota))
        });
        Self {
            rate,
            per,
            bucket,
            limiter,
        }
    }

    #[inline]
    pub fn rate(&self) -> u32 {
        self.rate
    }

    #[inline]
    pub fn per(&self) -> Duration {
        self.per
    }

    #[inline]
    pub fn bucket(&self) -> BucketType {
        self.bucket
    }

    /// Take a use for the message's bucket
    ///
    /// Returns how long to wait when the bucket is empty.
    pub fn update_rate_limit(&self, message: &Message) -> Option<Duration> {
        let limiter = self.limiter.as_ref()?;
        limiter
            .check_key(&self.bucket.key(message))
            .err()
            .map(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }
}

impl std::fmt::Debug for Cooldown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cooldown")
            .field("rate", &self.rate)
            .field("per", &self.per)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}
