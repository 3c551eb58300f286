//! Per-bucket rate limiting
//!
//! Requests on the same bucket are serialized through an async lock. When
//! the server reports an exhausted bucket the lock stays held until the
//! bucket resets, so queued requests wait instead of hitting a 429. A global
//! 429 closes a gate that every request waits on.

use dashmap::DashMap;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::route::Route;

/// Rate limit headers of a response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitHeaders {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset_after: Option<Duration>,
    pub bucket: Option<String>,
    pub global: bool,
    pub scope: Option<String>,
}

impl RateLimitHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        Self {
            limit: get("x-ratelimit-limit").and_then(|v| v.parse().ok()),
            remaining: get("x-ratelimit-remaining").and_then(|v| v.parse().ok()),
            reset_after: get("x-ratelimit-reset-after")
                .and_then(|v| v.parse::<f64>().ok())
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            bucket: get("x-ratelimit-bucket").map(str::to_string),
            global: get("x-ratelimit-global").is_some_and(|v| v.eq_ignore_ascii_case("true")),
            scope: get("x-ratelimit-scope").map(str::to_string),
        }
    }

    /// Whether the bucket has no requests left
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Body of a 429 response
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RateLimitedBody {
    /// Seconds
    pub retry_after: f64,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub message: String,
}

impl RateLimitedBody {
    pub fn retry_after(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_after).unwrap_or(Duration::from_secs(1))
    }
}

/// Shared rate limit state for one HTTP client
#[derive(Debug, Default)]
pub struct Ratelimiter {
    /// Bucket key -> lock
    locks: DashMap<String, Arc<AsyncMutex<()>>>,
    /// Route key -> server bucket hash
    bucket_hashes: DashMap<String, String>,
    /// Global gate
    global_until: Mutex<Option<Instant>>,
}

impl Ratelimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key the route's requests are serialized under
    pub fn bucket_for(&self, route: &Route) -> String {
        match self.bucket_hashes.get(&route.route_key()) {
            Some(hash) => format!("{}:{}", hash.value(), route.major_parameters()),
            None => route.bucket_key(),
        }
    }

    /// Wait for the route's bucket and the global gate
    pub async fn acquire(&self, route: &Route) -> OwnedMutexGuard<()> {
        let key = self.bucket_for(route);
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        self.wait_global().await;
        guard
    }

    /// Sleep until the global gate opens
    pub async fn wait_global(&self) {
        loop {
            let until = *self.global_until.lock();
            match until {
                Some(until) if until > Instant::now() => tokio::time::sleep_until(until).await,
                _ => return,
            }
        }
    }

    /// Close the global gate for `retry_after`
    pub fn set_global(&self, retry_after: Duration) {
        let until = Instant::now() + retry_after;
        let mut current = self.global_until.lock();
        if current.map_or(true, |c| c < until) {
            *current = Some(until);
        }
        warn!(retry_after_ms = retry_after.as_millis() as u64, "global rate limit hit");
    }

    #[inline]
    pub fn is_globally_limited(&self) -> bool {
        self.global_until.lock().is_some_and(|until| until > Instant::now())
    }

    /// Record the server's bucket hash for a route
    ///
    /// The lock the route was using is carried over to the new key, so
    /// requests queued on it and requests keyed by the hash share one lock.
    pub fn update(&self, route: &Route, headers: &RateLimitHeaders) {
        if let Some(bucket) = &headers.bucket {
            let route_key = route.route_key();
            let changed = self
                .bucket_hashes
                .get(&route_key)
                .map_or(true, |known| known.value() != bucket);
            if changed {
                debug!(route = %route_key, bucket = %bucket, "learned rate limit bucket");
                let previous = self.bucket_for(route);
                let lock = self.locks.get(&previous).map(|lock| Arc::clone(lock.value()));
                self.bucket_hashes.insert(route_key, bucket.clone());
                if let Some(lock) = lock {
                    self.locks.entry(self.bucket_for(route)).or_insert(lock);
                }
            }
        }
    }

    /// Release a bucket guard, holding it for `reset_after` if exhausted
    pub fn release(&self, guard: OwnedMutexGuard<()>, route: &Route, headers: &RateLimitHeaders) {
        match headers.reset_after {
            Some(delay) if headers.is_exhausted() && !delay.is_zero() => {
                debug!(
                    route = %route,
                    bucket = %self.bucket_for(route),
                    delay_ms = delay.as_millis() as u64,
                    "bucket exhausted, holding lock"
                );
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    drop(guard);
                });
            }
            _ => drop(guard),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_parse_headers() {
        let parsed = RateLimitHeaders::from_headers(&headers(&[
            ("x-ratelimit-limit", "5"),
            ("x-ratelimit-remaining", "0"),
            ("x-ratelimit-reset-after", "1.5"),
            ("x-ratelimit-bucket", "abcd1234"),
        ]));
        assert_eq!(parsed.limit, Some(5));
        assert!(parsed.is_exhausted());
        assert_eq!(parsed.reset_after, Some(Duration::from_millis(1500)));
        assert_eq!(parsed.bucket.as_deref(), Some("abcd1234"));
        assert!(!parsed.global);
    }

    #[test]
    fn test_bucket_hash_remaps_key() {
        let limiter = Ratelimiter::new();
        let route = Route::get("/channels/{channel_id}/messages").with("channel_id", 1);
        assert_eq!(limiter.bucket_for(&route), route.bucket_key());

        limiter.update(
            &route,
            &RateLimitHeaders {
                bucket: Some("hash".to_string()),
                ..RateLimitHeaders::default()
            },
        );
        assert_eq!(limiter.bucket_for(&route), "hash:1");

        let other_channel = Route::get("/channels/{channel_id}/messages").with("channel_id", 2);
        assert_eq!(limiter.bucket_for(&other_channel), "hash:2");
    }

    #[test]
    fn test_rate_limited_body() {
        let body: RateLimitedBody =
            serde_json::from_str(r#"{"message": "You are being rate limited.", "retry_after": 0.25, "global": true}"#)
                .unwrap();
        assert!(body.global);
        assert_eq!(body.retry_after(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_same_bucket_is_serialized() {
        let limiter = Arc::new(Ratelimiter::new());
        let route = Route::get("/users/@me");

        let guard = limiter.acquire(&route).await;
        let waiter = {
            let limiter = limiter.clone();
            let route = route.clone();
            tokio::spawn(async move {
                let _guard = limiter.acquire(&route).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_exhausted_bucket_holds_lock() {
        let limiter = Ratelimiter::new();
        let route = Route::get("/users/@me");
        let exhausted = RateLimitHeaders {
            remaining: Some(0),
            reset_after: Some(Duration::from_millis(100)),
            ..RateLimitHeaders::default()
        };

        let guard = limiter.acquire(&route).await;
        let start = Instant::now();
        limiter.release(guard, &route, &exhausted);
        let _guard = limiter.acquire(&route).await;
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_learned_bucket_keeps_exhausted_hold() {
        let limiter = Ratelimiter::new();
        let route = Route::get("/channels/{channel_id}/messages").with("channel_id", 1);
        let exhausted = RateLimitHeaders {
            remaining: Some(0),
            reset_after: Some(Duration::from_millis(300)),
            bucket: Some("hash".to_string()),
            ..RateLimitHeaders::default()
        };

        let guard = limiter.acquire(&route).await;
        let start = Instant::now();
        limiter.update(&route, &exhausted);
        limiter.release(guard, &route, &exhausted);

        assert_eq!(limiter.bucket_for(&route), "hash:1");
        let _guard = limiter.acquire(&route).await;
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_global_gate() {
        let limiter = Ratelimiter::new();
        limiter.set_global(Duration::from_millis(50));
        assert!(limiter.is_globally_limited());
        let start = Instant::now();
        limiter.wait_global().await;
        assert!(start.elapsed() >= Duration::from_millis(45));
        assert!(!limiter.is_globally_limited());
    }
}
