//! Event handler traits
//!
//! Every method has an empty default body, so implementors only override the
//! events they care about. `on_event` runs first for every event, before the
//! specific method.

use async_trait::async_trait;
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
use parley_gateway::GatewayEventType;
use serde_json::Value;

use crate::context::Context;
use crate::event::Event;

/// Receives decoded events
///
/// Each event runs on its own task, so calls are not ordered with respect to
/// each other. In particular the startup `on_guild_available` and `on_ready`
/// calls of a bot can land after events that arrived later on the socket.
#[allow(unused_variables)]
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Every event, before its specific method
    async fn on_event(&self, ctx: Context, event: &Event) {}

    // === Lifecycle ===

    async fn on_connect(&self, ctx: Context) {}
    async fn on_disconnect(&self, ctx: Context, code: Option<u16>, reconnecting: bool) {}
    async fn on_resumed(&self, ctx: Context) {}
    async fn on_shard_ready(&self, ctx: Context, shard_id: u64) {}
    /// The cache is populated
    async fn on_ready(&self, ctx: Context) {}

    // === Guilds ===

    async fn on_guild_available(&self, ctx: Context, guild: Guild) {}
    async fn on_guild_unavailable(&self, ctx: Context, guild_id: Snowflake) {}
    async fn on_guild_join(&self, ctx: Context, guild: Guild) {}
    async fn on_guild_remove(&self, ctx: Context, guild: Guild) {}
    async fn on_guild_update(&self, ctx: Context, old: Guild, new: Guild) {}
    async fn on_guild_emojis_update(&self, ctx: Context, guild_id: Snowflake, old: Vec<Emoji>, new: Vec<Emoji>) {}
    async fn on_member_join(&self, ctx: Context, member: Member) {}
    async fn on_member_remove(&self, ctx: Context, guild_id: Snowflake, user: User) {}
    async fn on_member_update(&self, ctx: Context, old: Member, new: Member) {}
    async fn on_member_ban(&self, ctx: Context, guild_id: Snowflake, user: User) {}
    async fn on_member_unban(&self, ctx: Context, guild_id: Snowflake, user: User) {}
    async fn on_role_create(&self, ctx: Context, guild_id: Snowflake, role: Role) {}
    async fn on_role_update(&self, ctx: Context, guild_id: Snowflake, old: Role, new: Role) {}
    async fn on_role_delete(&self, ctx: Context, guild_id: Snowflake, role: Role) {}

    // === Channels ===

    async fn on_channel_create(&self, ctx: Context, channel: Channel) {}
    async fn on_channel_update(&self, ctx: Context, old: Channel, new: Channel) {}
    async fn on_channel_delete(&self, ctx: Context, channel: Channel) {}
    async fn on_channel_pins_update(
        &self,
        ctx: Context,
        channel_id: Snowflake,
        guild_id: Option<Snowflake>,
        last_pin: Option<DateTime<Utc>>,
    ) {
    }

    // === Messages ===

    async fn on_message(&self, ctx: Context, message: Message) {}
    async fn on_raw_message_edit(&self, ctx: Context, event: MessageUpdateEvent) {}
    async fn on_message_edit(&self, ctx: Context, old: Message, new: Message) {}
    async fn on_raw_message_delete(&self, ctx: Context, event: MessageDeleteEvent) {}
    async fn on_message_delete(&self, ctx: Context, message: Message) {}
    async fn on_raw_bulk_message_delete(&self, ctx: Context, event: MessageDeleteBulkEvent) {}
    async fn on_bulk_message_delete(&self, ctx: Context, messages: Vec<Message>) {}
    async fn on_raw_reaction_add(&self, ctx: Context, event: MessageReactionEvent) {}
    async fn on_reaction_add(&self, ctx: Context, message: Message, emoji: PartialEmoji, user_id: Snowflake) {}
    async fn on_raw_reaction_remove(&self, ctx: Context, event: MessageReactionEvent) {}
    async fn on_reaction_remove(&self, ctx: Context, message: Message, emoji: PartialEmoji, user_id: Snowflake) {}
    async fn on_raw_reaction_clear(&self, ctx: Context, event: MessageReactionRemoveAllEvent) {}
    async fn on_reaction_clear(&self, ctx: Context, message: Message, reactions: Vec<Reaction>) {}
    async fn on_raw_reaction_clear_emoji(&self, ctx: Context, event: MessageReactionRemoveEmojiEvent) {}
    async fn on_reaction_clear_emoji(&self, ctx: Context, message: Message, reaction: Reaction) {}

    // === Users ===

    async fn on_presence_update(&self, ctx: Context, guild_id: Option<Snowflake>, old: Option<Presence>, new: Presence) {}
    async fn on_typing(&self, ctx: Context, event: TypingStartEvent) {}
    async fn on_user_update(&self, ctx: Context, old: User, new: User) {}
    async fn on_relationship_add(&self, ctx: Context, relationship: Relationship) {}
    async fn on_relationship_remove(&self, ctx: Context, relationship: Relationship) {}
    async fn on_invite_create(&self, ctx: Context, event: InviteCreateEvent) {}
    async fn on_invite_delete(&self, ctx: Context, event: InviteDeleteEvent) {}

    /// Dispatches the cache does not understand
    async fn on_unknown(&self, ctx: Context, name: String, data: Value) {}
}

/// Receives every dispatch before it is parsed
#[async_trait]
pub trait RawEventHandler: Send + Sync + 'static {
    async fn on_raw(&self, ctx: Context, event: GatewayEventType, data: Value);
}
