//! Runs every shard of a client
//!
//! All shards share one event channel and one identify queue.

use dashmap::DashMap;
use parking_lot::Mutex;
use parley_core::Snowflake;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::shard::{IdentifyQueue, Shard, ShardConfig, ShardEvent, ShardMessenger};

/// Shard that receives events for a guild
#[inline]
pub fn shard_for_guild(guild_id: Snowflake, shard_count: u64) -> u64 {
    (guild_id.get() >> 22) % shard_count.max(1)
}

#[derive(Debug)]
pub struct ShardManager {
    base: ShardConfig,
    shard_count: u64,
    identify: Arc<IdentifyQueue>,
    events: mpsc::UnboundedSender<ShardEvent>,
    messengers: DashMap<u64, ShardMessenger>,
    tasks: Mutex<Vec<(u64, JoinHandle<GatewayResult<()>>)>>,
}

impl ShardManager {
    /// Manager for `shard_count` shards, and the receiver of their events
    pub fn new(
        base: ShardConfig,
        shard_count: u64,
        max_concurrency: u64,
    ) -> (Self, mpsc::UnboundedReceiver<ShardEvent>) {
        Self::with_identify_queue(base, shard_count, Arc::new(IdentifyQueue::new(max_concurrency)))
    }

    pub fn with_identify_queue(
        base: ShardConfig,
        shard_count: u64,
        identify: Arc<IdentifyQueue>,
    ) -> (Self, mpsc::UnboundedReceiver<ShardEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Self {
            base,
            shard_count: shard_count.max(1),
            identify,
            events: tx,
            messengers: DashMap::new(),
            tasks: Mutex::new(Vec::new()),
        };
        (manager, rx)
    }

    #[inline]
    pub fn shard_count(&self) -> u64 {
        self.shard_count
    }

    /// Spawn every shard
    pub fn start(&self) -> GatewayResult<()> {
        info!(shard_count = self.shard_count, "starting shards");
        for shard_id in 0..self.shard_count {
            self.start_shard(shard_id)?;
        }
        Ok(())
    }

    /// Spawn one shard; a running shard with the same id is shut down first
    pub fn start_shard(&self, shard_id: u64) -> GatewayResult<ShardMessenger> {
        if shard_id >= self.shard_count {
            return Err(GatewayError::InvalidShard {
                shard_id,
                shard_count: self.shard_count,
            });
        }

        let config = self.base.clone().shard(shard_id, self.shard_count);
        let (shard, messenger) = Shard::new(config, self.events.clone(), Arc::clone(&self.identify));
        if let Some(previous) = self.messengers.insert(shard_id, messenger.clone()) {
            let _ = previous.shutdown();
        }

        let handle = tokio::spawn(shard.run());
        self.tasks.lock().push((shard_id, handle));
        Ok(messenger)
    }

    pub fn messenger(&self, shard_id: u64) -> Option<ShardMessenger> {
        self.messengers.get(&shard_id).map(|m| m.value().clone())
    }

    /// Messenger of the shard that owns `guild_id`
    pub fn messenger_for_guild(&self, guild_id: Snowflake) -> Option<ShardMessenger> {
        self.messenger(self.shard_for_guild(guild_id))
    }

    #[inline]
    pub fn shard_for_guild(&self, guild_id: Snowflake) -> u64 {
        shard_for_guild(guild_id, self.shard_count)
    }

    /// Heartbeat latency per shard, ordered by shard id
    pub fn latencies(&self) -> Vec<(u64, Option<Duration>)> {
        let mut latencies: Vec<_> = self
            .messengers
            .iter()
            .map(|entry| (*entry.key(), entry.value().latency()))
            .collect();
        latencies.sort_unstable_by_key(|(id, _)| *id);
        latencies
    }

    /// Mean latency of the shards that have one
    pub fn average_latency(&self) -> Option<Duration> {
        let known: Vec<Duration> = self.latencies().into_iter().filter_map(|(_, l)| l).collect();
        if known.is_empty() {
            return None;
        }
        Some(known.iter().sum::<Duration>() / known.len() as u32)
    }

    pub fn shutdown_all(&self) {
        info!("shutting down all shards");
        for entry in &self.messengers {
            // Already stopped shards have dropped their receiver
            let _ = entry.value().shutdown();
        }
    }

    /// Wait for every shard task to finish; returns the first fatal error
    pub async fn join(&self) -> GatewayResult<()> {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let mut result = Ok(());
        for (shard_id, handle) in tasks {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(shard_id, error = %err, "shard stopped with an error");
                    if result.is_ok() {
                        result = Err(err);
                    }
                }
                Err(err) => warn!(shard_id, error = %err, "shard task panicked"),
            }
        }
        result
    }
}
