use parley_common::ClientConfig;
use parley_core::Guild;
use std::ops::Deref;
use std::sync::Arc;

use super::ConnectionState;

/// Connection state shared by every shard of an auto-sharded client
///
/// `Ready` is emitted once every shard has finished its startup; each shard
/// first reports its own `ShardReady`.
#[derive(Debug, Clone)]
pub struct AutoShardedConnectionState {
    state: Arc<ConnectionState>,
    shard_count: u64,
}

impl AutoShardedConnectionState {
    pub fn new(config: &ClientConfig, shard_count: u64) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            state: Arc::new(ConnectionState::with_shard_count(config, shard_count)),
            shard_count,
        }
    }

    /// Wrap a state that a client switched to sharded mode
    pub(crate) fn from_state(state: Arc<ConnectionState>, shard_count: u64) -> Self {
        Self {
            state,
            shard_count: shard_count.max(1),
        }
    }

    /// Shared handle to the underlying state
    pub fn state(&self) -> Arc<ConnectionState> {
        Arc::clone(&self.state)
    }

    #[inline]
    pub fn shard_count(&self) -> u64 {
        self.shard_count
    }

    /// Cached guilds whose events go to `shard_id`
    pub fn guilds_for_shard(&self, shard_id: u64) -> Vec<Guild> {
        self.state
            .guilds()
            .into_iter()
            .filter(|g| g.shard_id(self.shard_count) == shard_id)
            .collect()
    }
}

impl Deref for AutoShardedConnectionState {
    type Target = ConnectionState;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use parley_core::Snowflake;
    use serde_json::json;

    fn ready(shard: u64, guild_ids: &[u64]) -> serde_json::Value {
        let guilds: Vec<_> = guild_ids
            .iter()
            .map(|id| json!({"id": id.to_string(), "name": "g", "owner_id": "1"}))
            .collect();
        json!({
            "user": {"id": "1", "username": "me"},
            "session_id": format!("s{shard}"),
            "shard": [shard, 2],
            "guilds": guilds,
        })
    }

    // Guild ids routed to shard 0 and shard 1 of 2
    const SHARD0_GUILD: u64 = 0;
    const SHARD1_GUILD: u64 = 1 << 22;

    #[test]
    fn test_ready_once_all_shards_report() {
        let state = AutoShardedConnectionState::new(&ClientConfig::new("token"), 2);

        let events = state.parse_ready(0, ready(0, &[SHARD0_GUILD])).unwrap();
        assert!(matches!(events.as_slice(), [Event::ShardReady { shard_id: 0 }]));
        assert!(!state.is_ready());
        assert!(state.is_shard_ready(0));

        let events = state.parse_ready(1, ready(1, &[SHARD1_GUILD])).unwrap();
        assert!(matches!(
            events.as_slice(),
            [Event::ShardReady { shard_id: 1 }, Event::Ready]
        ));
        assert!(state.is_ready());
        assert_eq!(state.ready_shards(), vec![0, 1]);
    }

    #[test]
    fn test_ready_keeps_other_shards_guilds() {
        let state = AutoShardedConnectionState::new(&ClientConfig::new("token"), 2);
        state.parse_ready(0, ready(0, &[SHARD0_GUILD])).unwrap();
        state.parse_ready(1, ready(1, &[SHARD1_GUILD])).unwrap();

        // Shard 1 reconnects with a fresh session
        state.parse_ready(1, ready(1, &[])).unwrap();
        assert!(state.guild(Snowflake::new(SHARD0_GUILD)).is_some());
        assert!(state.guild(Snowflake::new(SHARD1_GUILD)).is_none());
        assert_eq!(state.guilds_for_shard(0).len(), 1);
        assert!(state.guilds_for_shard(1).is_empty());
    }

    #[test]
    fn test_shard_routing() {
        let state = AutoShardedConnectionState::new(&ClientConfig::new("token"), 2);
        assert_eq!(state.shard_count(), 2);
        assert_eq!(state.shard_for_guild(Snowflake::new(SHARD1_GUILD)), 1);
        assert_eq!(state.shard_for_guild(Snowflake::new(SHARD0_GUILD)), 0);
    }
}
