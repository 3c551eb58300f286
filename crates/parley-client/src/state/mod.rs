//! In-memory object graph kept in sync with the gateway
//!
//! [`ConnectionState`] turns every dispatch into cache mutations and the
//! [`Event`]s describing them. Guild-scoped dispatches for guilds the cache
//! does not know are dropped.
//!
//! Bot sessions receive their guilds after READY. While a shard starts up,
//! arriving guilds are queued; once no guild has arrived for
//! `guild_ready_timeout`, [`ConnectionState::finish_startup`] chunks the large
//! ones and emits the queued guild events followed by `Ready`.

mod chunk;
mod messages;
mod parsers;
mod sharded;

pub use chunk::{ChunkRegistry, ChunkWaiter};
pub use messages::MessageCache;
pub use sharded::AutoShardedConnectionState;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use parley_common::{CacheConfig, ClientConfig};
use parley_core::{
    Channel, CurrentUser, Guild, GuildExperiment, Intents, Member, Message, Permissions,
    Relationship, Snowflake, User, UserExperiment,
};
use parley_gateway::events::FriendPresence;
use parley_gateway::protocol::RequestGuildMembersPayload;
use parley_gateway::{shard_for_guild, GatewayEventType, ShardEvent, ShardMessenger};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::event::Event;

/// How long a member request may take before it fails
pub const CHUNK_TIMEOUT: Duration = Duration::from_secs(60);

/// Guilds received while a shard starts up
#[derive(Debug)]
struct Startup {
    /// Guild id, and whether the guild was unavailable before
    guilds: Vec<(Snowflake, bool)>,
    last_guild: Instant,
}

#[derive(Debug, Default)]
struct Readiness {
    /// Set for sharded clients
    shard_count: Option<u64>,
    ready_shards: HashSet<u64>,
    announced: bool,
}

pub struct ConnectionState {
    config: CacheConfig,
    intents: Intents,
    bot: AtomicBool,

    user: RwLock<Option<CurrentUser>>,
    users: DashMap<Snowflake, User>,
    guilds: DashMap<Snowflake, Guild>,
    /// Guild channel id -> guild id
    channel_guilds: DashMap<Snowflake, Snowflake>,
    private_channels: DashMap<Snowflake, Channel>,
    relationships: DashMap<Snowflake, Relationship>,
    friend_presences: DashMap<Snowflake, FriendPresence>,
    experiments: RwLock<Vec<UserExperiment>>,
    guild_experiments: RwLock<Vec<GuildExperiment>>,
    messages: Mutex<MessageCache>,

    chunks: ChunkRegistry,
    messengers: DashMap<u64, ShardMessenger>,
    startup: Mutex<HashMap<u64, Startup>>,
    readiness: Mutex<Readiness>,
    ready_tx: watch::Sender<bool>,
}

impl ConnectionState {
    pub fn new(config: &ClientConfig) -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            config: config.cache.clone(),
            intents: config.gateway.intents,
            bot: AtomicBool::new(config.bot),
            user: RwLock::new(None),
            users: DashMap::new(),
            guilds: DashMap::new(),
            channel_guilds: DashMap::new(),
            private_channels: DashMap::new(),
            relationships: DashMap::new(),
            friend_presences: DashMap::new(),
            experiments: RwLock::new(Vec::new()),
            guild_experiments: RwLock::new(Vec::new()),
            messages: Mutex::new(MessageCache::new(config.cache.max_messages)),
            chunks: ChunkRegistry::default(),
            messengers: DashMap::new(),
            startup: Mutex::new(HashMap::new()),
            readiness: Mutex::new(Readiness::default()),
            ready_tx,
        }
    }

    /// State that tracks readiness per shard
    pub(crate) fn with_shard_count(config: &ClientConfig, shard_count: u64) -> Self {
        let state = Self::new(config);
        state.set_shard_count(shard_count);
        state
    }

    /// Switch to per-shard readiness, before any shard connects
    pub(crate) fn set_shard_count(&self, shard_count: u64) {
        let mut readiness = self.readiness.lock();
        readiness.shard_count = Some(shard_count.max(1));
        readiness.ready_shards.clear();
        readiness.announced = false;
    }

    /// Shard count of a sharded client
    pub fn shard_count(&self) -> Option<u64> {
        self.readiness.lock().shard_count
    }

    #[inline]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    #[inline]
    pub fn is_bot(&self) -> bool {
        self.bot.load(Ordering::Relaxed)
    }

    pub fn chunks(&self) -> &ChunkRegistry {
        &self.chunks
    }

    // === Shards ===

    pub fn set_messenger(&self, messenger: ShardMessenger) {
        self.messengers.insert(messenger.shard_id(), messenger);
    }

    pub fn messenger(&self, shard_id: u64) -> Option<ShardMessenger> {
        self.messengers.get(&shard_id).map(|m| m.value().clone())
    }

    /// Every registered shard, ordered by id
    pub fn messengers(&self) -> Vec<ShardMessenger> {
        let mut messengers: Vec<_> = self.messengers.iter().map(|m| m.value().clone()).collect();
        messengers.sort_unstable_by_key(ShardMessenger::shard_id);
        messengers
    }

    /// Shard that receives a guild's events
    pub fn shard_for_guild(&self, guild_id: Snowflake) -> u64 {
        match self.readiness.lock().shard_count {
            Some(count) => shard_for_guild(guild_id, count),
            None => 0,
        }
    }

    pub fn messenger_for_guild(&self, guild_id: Snowflake) -> Option<ShardMessenger> {
        self.messenger(self.shard_for_guild(guild_id))
    }

    /// Turn a shard event into client events
    pub fn handle(&self, event: ShardEvent) -> Vec<Event> {
        match event {
            ShardEvent::Connected { shard_id } => vec![Event::Connect { shard_id }],
            ShardEvent::Resumed { shard_id } => vec![Event::Resumed { shard_id }],
            ShardEvent::Disconnected {
                shard_id,
                code,
                reconnecting,
            } => vec![Event::Disconnect {
                shard_id,
                code,
                reconnecting,
            }],
            ShardEvent::Dispatch {
                shard_id, event, data, ..
            } => self.parse(shard_id, &event, data),
        }
    }

    // === Readiness ===

    #[inline]
    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    pub fn subscribe_ready(&self) -> watch::Receiver<bool> {
        self.ready_tx.subscribe()
    }

    pub fn is_shard_ready(&self, shard_id: u64) -> bool {
        self.readiness.lock().ready_shards.contains(&shard_id)
    }

    pub fn ready_shards(&self) -> Vec<u64> {
        let mut shards: Vec<u64> = self.readiness.lock().ready_shards.iter().copied().collect();
        shards.sort_unstable();
        shards
    }

    /// Events for a shard that finished starting up
    fn shard_ready(&self, shard_id: u64) -> Vec<Event> {
        let mut readiness = self.readiness.lock();
        readiness.ready_shards.insert(shard_id);

        let Some(shard_count) = readiness.shard_count else {
            drop(readiness);
            self.ready_tx.send_replace(true);
            info!("cache ready");
            return vec![Event::Ready];
        };

        let mut events = vec![Event::ShardReady { shard_id }];
        info!(shard_id, "shard ready");
        if !readiness.announced && readiness.ready_shards.len() as u64 >= shard_count {
            readiness.announced = true;
            drop(readiness);
            self.ready_tx.send_replace(true);
            info!(shard_count, "all shards ready");
            events.push(Event::Ready);
        }
        events
    }

    /// Whether a shard is waiting for its guilds
    pub fn is_starting(&self, shard_id: u64) -> bool {
        self.startup.lock().contains_key(&shard_id)
    }

    fn begin_startup(&self, shard_id: u64) {
        self.startup.lock().insert(
            shard_id,
            Startup {
                guilds: Vec::new(),
                last_guild: Instant::now(),
            },
        );
    }

    /// Queue a guild if its shard is starting; false otherwise
    fn queue_startup_guild(&self, shard_id: u64, guild_id: Snowflake, was_unavailable: bool) -> bool {
        match self.startup.lock().get_mut(&shard_id) {
            Some(startup) => {
                startup.guilds.push((guild_id, was_unavailable));
                startup.last_guild = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Wait for the shard's guilds to stop arriving, chunk the large ones,
    /// and return the queued guild events followed by the ready events
    pub async fn finish_startup(&self, shard_id: u64) -> Vec<Event> {
        let quiet = self.config.guild_ready_timeout();
        loop {
            let deadline = match self.startup.lock().get(&shard_id) {
                Some(startup) => startup.last_guild + quiet,
                None => return Vec::new(),
            };
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep_until(deadline).await;
        }

        let Some(startup) = self.startup.lock().remove(&shard_id) else {
            return Vec::new();
        };
        debug!(shard_id, guilds = startup.guilds.len(), "guild stream finished");

        let to_chunk: Vec<Snowflake> = startup
            .guilds
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| self.needs_chunking(*id))
            .collect();
        let results = futures::future::join_all(
            to_chunk.iter().map(|id| self.chunk_guild(*id, CHUNK_TIMEOUT)),
        )
        .await;
        for (guild_id, result) in to_chunk.iter().zip(results) {
            if let Err(err) = result {
                warn!(%guild_id, error = %err, "failed to chunk guild during startup");
            }
        }

        let mut events = Vec::with_capacity(startup.guilds.len() + 2);
        for (guild_id, was_unavailable) in startup.guilds {
            if let Some(guild) = self.guild(guild_id) {
                events.push(if was_unavailable {
                    Event::GuildAvailable(guild)
                } else {
                    Event::GuildJoin(guild)
                });
            }
        }
        events.extend(self.shard_ready(shard_id));
        events
    }

    // === Member chunking ===

    fn needs_chunking(&self, guild_id: Snowflake) -> bool {
        self.is_bot()
            && self.config.chunk_guilds_at_startup
            && self.intents.can_chunk()
            && self
                .guilds
                .get(&guild_id)
                .is_some_and(|g| g.large && !g.is_chunked())
    }

    fn member_request(&self, guild_id: Snowflake) -> RequestGuildMembersPayload {
        RequestGuildMembersPayload::all(guild_id, self.intents.contains(Intents::GUILD_PRESENCES))
    }

    /// Request every member of a guild and wait for the last chunk
    pub async fn chunk_guild(&self, guild_id: Snowflake, timeout: Duration) -> ClientResult<Vec<Member>> {
        self.request_members(self.member_request(guild_id), timeout).await
    }

    /// Send an op 8 request and collect its chunks
    pub async fn request_members(
        &self,
        request: RequestGuildMembersPayload,
        timeout: Duration,
    ) -> ClientResult<Vec<Member>> {
        let messenger = self
            .messenger_for_guild(request.guild_id)
            .ok_or(ClientError::NotReady)?;
        let waiter = self.chunks.register(request.guild_id);
        let request = request.with_nonce(waiter.nonce());
        if let Err(err) = messenger.request_guild_members(&request) {
            self.chunks.cancel(waiter.nonce());
            return Err(err.into());
        }
        waiter.wait(&self.chunks, timeout).await
    }

    /// Fire-and-forget chunk request; members merge into the cache as they arrive
    fn request_chunk(&self, guild_id: Snowflake) {
        let Some(messenger) = self.messenger_for_guild(guild_id) else {
            return;
        };
        if let Err(err) = messenger.request_guild_members(&self.member_request(guild_id)) {
            debug!(%guild_id, error = %err, "could not request members");
        }
    }

    // === Queries ===

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.user.read().clone()
    }

    pub fn user_id(&self) -> Option<Snowflake> {
        self.user.read().as_ref().map(|u| u.user.id)
    }

    pub fn user(&self, user_id: Snowflake) -> Option<User> {
        self.users.get(&user_id).map(|u| u.clone())
    }

    /// Users whose username matches, ignoring case
    pub fn user_named(&self, name: &str) -> Option<User> {
        self.users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(name) || u.tag() == name)
            .map(|u| u.clone())
    }

    pub fn guild(&self, guild_id: Snowflake) -> Option<Guild> {
        self.guilds.get(&guild_id).map(|g| g.clone())
    }

    /// Run `f` against a cached guild without cloning it
    pub fn with_guild<R>(&self, guild_id: Snowflake, f: impl FnOnce(&Guild) -> R) -> Option<R> {
        self.guilds.get(&guild_id).map(|g| f(&g))
    }

    pub fn guilds(&self) -> Vec<Guild> {
        self.guilds.iter().map(|g| g.clone()).collect()
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    pub fn channel(&self, channel_id: Snowflake) -> Option<Channel> {
        if let Some(channel) = self.private_channels.get(&channel_id) {
            return Some(channel.clone());
        }
        let guild_id = *self.channel_guilds.get(&channel_id)?;
        self.guilds
            .get(&guild_id)
            .and_then(|g| g.channels.get(&channel_id).cloned())
    }

    pub fn private_channel(&self, channel_id: Snowflake) -> Option<Channel> {
        self.private_channels.get(&channel_id).map(|c| c.clone())
    }

    /// DM channel with a user
    pub fn private_channel_with(&self, user_id: Snowflake) -> Option<Channel> {
        self.private_channels
            .iter()
            .find(|c| c.recipient().is_some_and(|u| u.id == user_id))
            .map(|c| c.clone())
    }

    pub fn private_channels(&self) -> Vec<Channel> {
        self.private_channels.iter().map(|c| c.clone()).collect()
    }

    pub fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.guilds
            .get(&guild_id)
            .and_then(|g| g.members.get(&user_id).cloned())
    }

    pub fn message(&self, message_id: Snowflake) -> Option<Message> {
        self.messages.lock().get(message_id).cloned()
    }

    /// Cached messages, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().iter().cloned().collect()
    }

    pub fn relationships(&self) -> Vec<Relationship> {
        self.relationships.iter().map(|r| r.clone()).collect()
    }

    pub fn relationship(&self, user_id: Snowflake) -> Option<Relationship> {
        self.relationships.get(&user_id).map(|r| r.clone())
    }

    pub fn friend_presence(&self, user_id: Snowflake) -> Option<FriendPresence> {
        self.friend_presences.get(&user_id).map(|p| p.clone())
    }

    pub fn experiments(&self) -> Vec<UserExperiment> {
        self.experiments.read().clone()
    }

    pub fn guild_experiments(&self) -> Vec<GuildExperiment> {
        self.guild_experiments.read().clone()
    }

    /// Permissions of the current user in a guild channel
    pub fn permissions_in(&self, guild_id: Snowflake, channel_id: Snowflake) -> Option<Permissions> {
        let user_id = self.user_id()?;
        let guild = self.guilds.get(&guild_id)?;
        let member = guild.members.get(&user_id)?;
        let channel = guild.channels.get(&channel_id)?;
        Some(guild.permissions_for(member, channel))
    }

    /// Drop everything cached, e.g. before a fresh READY
    pub fn clear(&self) {
        *self.user.write() = None;
        self.users.clear();
        self.guilds.clear();
        self.channel_guilds.clear();
        self.private_channels.clear();
        self.relationships.clear();
        self.friend_presences.clear();
        self.experiments.write().clear();
        self.guild_experiments.write().clear();
        self.messages.lock().clear();
    }

    // === Cache mutation helpers ===

    fn store_user(&self, user: &User) {
        self.users.insert(user.id, user.clone());
    }

    /// Insert or replace a guild with its channel index and users
    fn store_guild(&self, mut guild: Guild) {
        guild.fill_guild_ids();
        for channel_id in guild.channels.keys() {
            self.channel_guilds.insert(*channel_id, guild.id);
        }
        for member in guild.members.values() {
            self.store_user(&member.user);
        }
        self.guilds.insert(guild.id, guild);
    }

    fn remove_guild(&self, guild_id: Snowflake) -> Option<Guild> {
        let (_, guild) = self.guilds.remove(&guild_id)?;
        for channel_id in guild.channels.keys() {
            self.channel_guilds.remove(channel_id);
        }
        self.messages.lock().remove_guild(guild_id);
        Some(guild)
    }

    /// Run `f` on a cached guild; unknown guilds are logged and skipped
    fn update_guild<R>(&self, guild_id: Snowflake, event: &str, f: impl FnOnce(&mut Guild) -> R) -> Option<R> {
        match self.guilds.get_mut(&guild_id) {
            Some(mut guild) => Some(f(&mut guild)),
            None => {
                debug!(%guild_id, event, "dropping event for unknown guild");
                None
            }
        }
    }

    fn parse(&self, shard_id: u64, event: &GatewayEventType, data: Value) -> Vec<Event> {
        match self.parse_dispatch(shard_id, event, data) {
            Ok(events) => events,
            Err(err) => {
                warn!(shard_id, %event, error = %err, "failed to parse dispatch");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionState")
            .field("user", &self.user_id())
            .field("guilds", &self.guilds.len())
            .field("private_channels", &self.private_channels.len())
            .field("messages", &self.messages.lock().len())
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}
