//! Events produced by the connection state
//!
//! `Raw*` variants are emitted for every matching dispatch; their cached
//! counterparts only when the affected object was in the cache.

use chrono::{DateTime, Utc};
use parley_core::{
    Channel, Emoji, Guild, Member, Message, PartialEmoji, Presence, Reaction, Relationship, Role,
    Snowflake, User,
};
use parley_gateway::events::{
    InviteCreateEvent, InviteDeleteEvent, MessageDeleteBulkEvent, MessageDeleteEvent,
    MessageReactionEvent, MessageReactionRemoveAllEvent, MessageReactionRemoveEmojiEvent,
    MessageUpdateEvent, TypingStartEvent,
};
use serde_json::Value;

#[derive(Debug, Clone)]
pub enum Event {
    // === Lifecycle ===
    Connect { shard_id: u64 },
    Disconnect {
        shard_id: u64,
        code: Option<u16>,
        reconnecting: bool,
    },
    Resumed { shard_id: u64 },
    /// One shard finished its startup
    ShardReady { shard_id: u64 },
    /// The cache is populated
    Ready,

    // === Guilds ===
    GuildAvailable(Guild),
    GuildUnavailable(Snowflake),
    GuildJoin(Guild),
    GuildRemove(Guild),
    GuildUpdate { old: Guild, new: Guild },
    GuildEmojisUpdate {
        guild_id: Snowflake,
        old: Vec<Emoji>,
        new: Vec<Emoji>,
    },
    MemberJoin(Member),
    MemberRemove { guild_id: Snowflake, user: User },
    MemberUpdate { old: Member, new: Member },
    MemberBan { guild_id: Snowflake, user: User },
    MemberUnban { guild_id: Snowflake, user: User },
    RoleCreate { guild_id: Snowflake, role: Role },
    RoleUpdate {
        guild_id: Snowflake,
        old: Role,
        new: Role,
    },
    RoleDelete { guild_id: Snowflake, role: Role },

    // === Channels ===
    ChannelCreate(Channel),
    ChannelUpdate { old: Channel, new: Channel },
    ChannelDelete(Channel),
    ChannelPinsUpdate {
        channel_id: Snowflake,
        guild_id: Option<Snowflake>,
        last_pin: Option<DateTime<Utc>>,
    },

    // === Messages ===
    MessageCreate(Message),
    RawMessageUpdate(MessageUpdateEvent),
    MessageUpdate { old: Message, new: Message },
    RawMessageDelete(MessageDeleteEvent),
    MessageDelete(Message),
    RawBulkMessageDelete(MessageDeleteBulkEvent),
    BulkMessageDelete(Vec<Message>),
    RawReactionAdd(MessageReactionEvent),
    ReactionAdd {
        message: Message,
        emoji: PartialEmoji,
        user_id: Snowflake,
    },
    RawReactionRemove(MessageReactionEvent),
    ReactionRemove {
        message: Message,
        emoji: PartialEmoji,
        user_id: Snowflake,
    },
    RawReactionClear(MessageReactionRemoveAllEvent),
    ReactionClear {
        message: Message,
        reactions: Vec<Reaction>,
    },
    RawReactionClearEmoji(MessageReactionRemoveEmojiEvent),
    ReactionClearEmoji { message: Message, reaction: Reaction },

    // === Users ===
    PresenceUpdate {
        guild_id: Option<Snowflake>,
        old: Option<Presence>,
        new: Presence,
    },
    Typing(TypingStartEvent),
    UserUpdate { old: User, new: User },
    RelationshipAdd(Relationship),
    RelationshipRemove(Relationship),
    InviteCreate(InviteCreateEvent),
    InviteDelete(InviteDeleteEvent),

    /// Dispatch the cache does not understand
    Unknown { name: String, data: Value },
}

impl Event {
    /// Name for logging
    pub fn name(&self) -> &str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::Resumed { .. } => "resumed",
            Self::ShardReady { .. } => "shard_ready",
            Self::Ready => "ready",
            Self::GuildAvailable(_) => "guild_available",
            Self::GuildUnavailable(_) => "guild_unavailable",
            Self::GuildJoin(_) => "guild_join",
            Self::GuildRemove(_) => "guild_remove",
            Self::GuildUpdate { .. } => "guild_update",
            Self::GuildEmojisUpdate { .. } => "guild_emojis_update",
            Self::MemberJoin(_) => "member_join",
            Self::MemberRemove { .. } => "member_remove",
            Self::MemberUpdate { .. } => "member_update",
            Self::MemberBan { .. } => "member_ban",
            Self::MemberUnban { .. } => "member_unban",
            Self::RoleCreate { .. } => "guild_role_create",
            Self::RoleUpdate { .. } => "guild_role_update",
            Self::RoleDelete { .. } => "guild_role_delete",
            Self::ChannelCreate(_) => "channel_create",
            Self::ChannelUpdate { .. } => "channel_update",
            Self::ChannelDelete(_) => "channel_delete",
            Self::ChannelPinsUpdate { .. } => "channel_pins_update",
            Self::MessageCreate(_) => "message",
            Self::RawMessageUpdate(_) => "raw_message_edit",
            Self::MessageUpdate { .. } => "message_edit",
            Self::RawMessageDelete(_) => "raw_message_delete",
            Self::MessageDelete(_) => "message_delete",
            Self::RawBulkMessageDelete(_) => "raw_bulk_message_delete",
            Self::BulkMessageDelete(_) => "bulk_message_delete",
            Self::RawReactionAdd(_) => "raw_reaction_add",
            Self::ReactionAdd { .. } => "reaction_add",
            Self::RawReactionRemove(_) => "raw_reaction_remove",
            Self::ReactionRemove { .. } => "reaction_remove",
            Self::RawReactionClear(_) => "raw_reaction_clear",
            Self::ReactionClear { .. } => "reaction_clear",
            Self::RawReactionClearEmoji(_) => "raw_reaction_clear_emoji",
            Self::ReactionClearEmoji { .. } => "reaction_clear_emoji",
            Self::PresenceUpdate { .. } => "presence_update",
            Self::Typing(_) => "typing",
            Self::UserUpdate { .. } => "user_update",
            Self::RelationshipAdd(_) => "relationship_add",
            Self::RelationshipRemove(_) => "relationship_remove",
            Self::InviteCreate(_) => "invite_create",
            Self::InviteDelete(_) => "invite_delete",
            Self::Unknown { name, .. } => name,
        }
    }

    /// Guild the event belongs to, when it carries one directly
    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::GuildAvailable(guild) | Self::GuildJoin(guild) | Self::GuildRemove(guild) => Some(guild.id),
            Self::GuildUnavailable(id) => Some(*id),
            Self::GuildUpdate { new, .. } => Some(new.id),
            Self::GuildEmojisUpdate { guild_id, .. }
            | Self::MemberRemove { guild_id, .. }
            | Self::MemberBan { guild_id, .. }
            | Self::MemberUnban { guild_id, .. }
            | Self::RoleCreate { guild_id, .. }
            | Self::RoleUpdate { guild_id, .. }
            | Self::RoleDelete { guild_id, .. } => Some(*guild_id),
            Self::MemberJoin(member) | Self::MemberUpdate { new: member, .. } => member.guild_id,
            Self::ChannelCreate(channel) | Self::ChannelDelete(channel) | Self::ChannelUpdate { new: channel, .. } => {
                channel.guild_id
            }
            Self::ChannelPinsUpdate { guild_id, .. } | Self::PresenceUpdate { guild_id, .. } => *guild_id,
            Self::MessageCreate(message) | Self::MessageDelete(message) | Self::MessageUpdate { new: message, .. } => {
                message.guild_id
            }
            Self::Typing(typing) => typing.guild_id,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Event::Ready.name(), "ready");
        assert_eq!(Event::Connect { shard_id: 0 }.name(), "connect");
        let unknown = Event::Unknown {
            name: "CALL_CREATE".to_string(),
            data: Value::Null,
        };
        assert_eq!(unknown.name(), "CALL_CREATE");
    }

    #[test]
    fn test_guild_id() {
        let guild = Guild::new(Snowflake::new(9), "g", Snowflake::new(1));
        assert_eq!(Event::GuildJoin(guild).guild_id(), Some(Snowflake::new(9)));
        assert_eq!(Event::Ready.guild_id(), None);
    }
}
