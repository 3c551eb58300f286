//! Typed data of the dispatches the cache understands
//!
//! Most events carry a platform model directly; these structs cover the ones
//! that wrap or reference models.

use chrono::{DateTime, Utc};
use parley_core::{
    Activity, Channel, CurrentUser, Emoji, Guild, GuildExperiment, Member, OnlineStatus,
    PartialEmoji, PartialMember, Presence, Relationship, RelationshipType, Role, Snowflake, User,
    UserExperiment,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// === Connection Events ===

/// READY
///
/// Bots receive every guild as unavailable; user accounts receive them whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    #[serde(default)]
    pub v: u8,
    pub user: CurrentUser,
    #[serde(default)]
    pub guilds: Vec<Guild>,
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
    #[serde(default)]
    pub shard: Option<[u64; 2]>,
    #[serde(default)]
    pub private_channels: Vec<Channel>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Users referenced by id elsewhere in the payload (user accounts)
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub experiments: Vec<UserExperiment>,
    #[serde(default)]
    pub guild_experiments: Vec<GuildExperiment>,
}

/// Presence of a friend in READY_SUPPLEMENTAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendPresence {
    pub user_id: Snowflake,
    #[serde(default)]
    pub status: OnlineStatus,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedPresences {
    #[serde(default)]
    pub friends: Vec<FriendPresence>,
}

/// READY_SUPPLEMENTAL, user accounts only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadySupplementalEvent {
    #[serde(default)]
    pub merged_presences: MergedPresences,
}

// === Guild Events ===

/// GUILD_MEMBER_UPDATE
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildMemberUpdateEvent {
    pub guild_id: Snowflake,
    pub user: User,
    #[serde(flatten)]
    pub member: PartialMember,
}

/// GUILD_MEMBER_REMOVE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMemberRemoveEvent {
    pub guild_id: Snowflake,
    pub user: User,
}

/// GUILD_MEMBERS_CHUNK
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMembersChunkEvent {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub members: Vec<Member>,
    pub chunk_index: u32,
    pub chunk_count: u32,
    #[serde(default)]
    pub not_found: Vec<Snowflake>,
    #[serde(default)]
    pub presences: Vec<Presence>,
    #[serde(default)]
    pub nonce: Option<String>,
}

impl GuildMembersChunkEvent {
    /// Whether this is the final chunk of its request
    #[inline]
    pub fn is_last(&self) -> bool {
        self.chunk_index + 1 >= self.chunk_count
    }
}

/// GUILD_ROLE_CREATE / GUILD_ROLE_UPDATE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRoleEvent {
    pub guild_id: Snowflake,
    pub role: Role,
}

/// GUILD_ROLE_DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRoleDeleteEvent {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
}

/// GUILD_BAN_ADD / GUILD_BAN_REMOVE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildBanEvent {
    pub guild_id: Snowflake,
    pub user: User,
}

/// GUILD_EMOJIS_UPDATE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildEmojisUpdateEvent {
    pub guild_id: Snowflake,
    pub emojis: Vec<Emoji>,
}

// === Channel Events ===

/// CHANNEL_PINS_UPDATE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPinsUpdateEvent {
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub last_pin_timestamp: Option<DateTime<Utc>>,
}

// === Message Events ===

/// MESSAGE_UPDATE
///
/// Only the changed fields are guaranteed; the rest of `data` is kept for
/// patching a cached message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageUpdateEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub data: Value,
}

#[derive(Deserialize)]
struct MessageIds {
    id: Snowflake,
    channel_id: Snowflake,
    #[serde(default)]
    guild_id: Option<Snowflake>,
}

impl MessageUpdateEvent {
    pub fn from_value(data: Value) -> Result<Self, serde_json::Error> {
        let ids = MessageIds::deserialize(&data)?;
        Ok(Self {
            id: ids.id,
            channel_id: ids.channel_id,
            guild_id: ids.guild_id,
            data,
        })
    }
}

/// MESSAGE_DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_DELETE_BULK
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeleteBulkEvent {
    pub ids: Vec<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_REACTION_ADD / MESSAGE_REACTION_REMOVE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReactionEvent {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub emoji: PartialEmoji,
    /// Only on adds in guilds
    #[serde(default)]
    pub member: Option<Member>,
}

/// MESSAGE_REACTION_REMOVE_ALL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReactionRemoveAllEvent {
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_REACTION_REMOVE_EMOJI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReactionRemoveEmojiEvent {
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub emoji: PartialEmoji,
}

// === User Events ===

/// TYPING_START
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingStartEvent {
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix seconds
    pub timestamp: i64,
    #[serde(default)]
    pub member: Option<Member>,
}

impl TypingStartEvent {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// RELATIONSHIP_REMOVE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRemoveEvent {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: RelationshipType,
}

/// INVITE_CREATE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCreateEvent {
    pub channel_id: Snowflake,
    pub code: String,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub inviter: Option<User>,
    #[serde(default)]
    pub max_age: u32,
    #[serde(default)]
    pub max_uses: u32,
    #[serde(default)]
    pub temporary: bool,
    #[serde(default)]
    pub uses: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// INVITE_DELETE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteDeleteEvent {
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub code: String,
}

/// `guild_id` of a raw dispatch, if it has one
pub fn guild_id_of(data: &Value) -> Option<Snowflake> {
    data.get("guild_id")
        .and_then(|v| Snowflake::deserialize(v).ok())
}
