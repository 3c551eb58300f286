//! Handle passed to every event handler

use parley_core::{Member, Snowflake};
use parley_gateway::{GuildSubscriptionsPayload, PresenceUpdatePayload, RequestGuildMembersPayload, ShardMessenger};
use parley_http::Http;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::state::{ConnectionState, CHUNK_TIMEOUT};

/// REST client, cache, and the shard that received the event
#[derive(Debug, Clone)]
pub struct Context {
    pub http: Http,
    pub cache: Arc<ConnectionState>,
    pub shard: ShardMessenger,
}

impl Context {
    pub fn new(http: Http, cache: Arc<ConnectionState>, shard: ShardMessenger) -> Self {
        Self { http, cache, shard }
    }

    #[inline]
    pub fn shard_id(&self) -> u64 {
        self.shard.shard_id()
    }

    /// Change the presence on every shard
    pub fn set_presence(&self, presence: &PresenceUpdatePayload) -> ClientResult<()> {
        let mut messengers = self.cache.messengers();
        if messengers.is_empty() {
            messengers.push(self.shard.clone());
        }
        for messenger in messengers {
            messenger.update_presence(presence)?;
        }
        debug!(status = ?presence.status, "presence updated");
        Ok(())
    }

    /// Request members of a guild and wait for every chunk
    pub async fn request_members(&self, request: RequestGuildMembersPayload) -> ClientResult<Vec<Member>> {
        self.cache.request_members(request, CHUNK_TIMEOUT).await
    }

    /// Members whose username starts with `query`
    pub async fn query_members(&self, guild_id: Snowflake, query: &str, limit: u32) -> ClientResult<Vec<Member>> {
        self.request_members(RequestGuildMembersPayload::query(guild_id, query, limit))
            .await
    }

    /// Subscribe to typing, activity, and member list updates of a guild
    ///
    /// User accounts only receive these after subscribing.
    pub fn subscribe_guild(&self, subscription: &GuildSubscriptionsPayload) -> ClientResult<()> {
        let messenger = self
            .cache
            .messenger_for_guild(subscription.guild_id)
            .ok_or(ClientError::NotReady)?;
        messenger.subscribe_guild(subscription)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parley_common::{ClientConfig, HttpConfig};
    use parley_core::OnlineStatus;
    use parley_gateway::shard::IdentifyQueue;
    use parley_gateway::{Shard, ShardConfig};

    /// Context over a shard that is never run
    pub(crate) fn detached_context(cache: Arc<ConnectionState>) -> (Context, Shard) {
        let (events, _) = tokio::sync::mpsc::unbounded_channel();
        let (shard, messenger) = Shard::new(
            ShardConfig::new("token", true, "ws://127.0.0.1:9"),
            events,
            Arc::new(IdentifyQueue::default()),
        );
        let http = Http::new("token", true, HttpConfig::default()).unwrap();
        (Context::new(http, cache, messenger), shard)
    }

    #[test]
    fn test_set_presence_without_registered_shards() {
        let cache = Arc::new(ConnectionState::new(&ClientConfig::new("token")));
        let (ctx, _shard) = detached_context(cache);
        assert_eq!(ctx.shard_id(), 0);
        ctx.set_presence(&PresenceUpdatePayload::new(OnlineStatus::Idle))
            .unwrap();
    }

    #[test]
    fn test_set_presence_on_stopped_shard() {
        let cache = Arc::new(ConnectionState::new(&ClientConfig::new("token")));
        let (ctx, shard) = detached_context(cache);
        drop(shard);
        let err = ctx
            .set_presence(&PresenceUpdatePayload::new(OnlineStatus::Online))
            .unwrap_err();
        assert!(matches!(err, ClientError::Gateway(_)));
    }

    #[test]
    fn test_subscribe_before_connect() {
        let cache = Arc::new(ConnectionState::new(&ClientConfig::new("token")));
        let (ctx, _shard) = detached_context(cache);
        let err = ctx
            .subscribe_guild(&GuildSubscriptionsPayload::new(Snowflake::new(1)))
            .unwrap_err();
        assert!(matches!(err, ClientError::NotReady));
    }
}
