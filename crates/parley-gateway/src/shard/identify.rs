//! Identify spacing shared by all shards of a client
//!
//! Shards in the same bucket (`shard_id % max_concurrency`) identify one at a
//! time, at least [`IDENTIFY_INTERVAL`] apart.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const IDENTIFY_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct IdentifyQueue {
    max_concurrency: u64,
    interval: Duration,
    buckets: DashMap<u64, Arc<Mutex<Option<Instant>>>>,
}

impl IdentifyQueue {
    pub fn new(max_concurrency: u64) -> Self {
        Self::with_interval(max_concurrency, IDENTIFY_INTERVAL)
    }

    pub fn with_interval(max_concurrency: u64, interval: Duration) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            interval,
            buckets: DashMap::new(),
        }
    }

    #[inline]
    pub fn bucket(&self, shard_id: u64) -> u64 {
        shard_id % self.max_concurrency
    }

    /// Wait for this shard's turn to identify
    pub async fn wait(&self, shard_id: u64) {
        let bucket = self.bucket(shard_id);
        let lock = self
            .buckets
            .entry(bucket)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut last = lock.lock().await;
        if let Some(at) = *last {
            let ready = at + self.interval;
            if ready > Instant::now() {
                debug!(shard_id, bucket, wait_ms = (ready - Instant::now()).as_millis() as u64, "waiting to identify");
                tokio::time::sleep_until(ready).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for IdentifyQueue {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_bucket_is_spaced() {
        let queue = IdentifyQueue::with_interval(1, Duration::from_millis(60));
        let start = Instant::now();
        queue.wait(0).await;
        queue.wait(1).await;
        assert!(start.elapsed() >= Duration::from_millis(55));
    }

    #[tokio::test]
    async fn test_separate_buckets_do_not_wait() {
        let queue = IdentifyQueue::with_interval(2, Duration::from_secs(10));
        let start = Instant::now();
        queue.wait(0).await;
        queue.wait(1).await;
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(queue.bucket(3), 1);
    }
}
