//! Dispatch names and their typed payloads

mod event_types;
mod payloads;

pub use event_types::GatewayEventType;
pub use payloads::{
    guild_id_of, ChannelPinsUpdateEvent, FriendPresence, GuildBanEvent, GuildEmojisUpdateEvent,
    GuildMemberRemoveEvent, GuildMemberUpdateEvent, GuildMembersChunkEvent, GuildRoleDeleteEvent,
    GuildRoleEvent, InviteCreateEvent, InviteDeleteEvent, MergedPresences, MessageDeleteBulkEvent,
    MessageDeleteEvent, MessageReactionEvent, MessageReactionRemoveAllEvent,
    MessageReactionRemoveEmojiEvent, MessageUpdateEvent, ReadyEvent, ReadySupplementalEvent,
    RelationshipRemoveEvent, TypingStartEvent,
};
