//! Routes events to handlers, one task per event

use futures::FutureExt;
use parley_gateway::GatewayEventType;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, trace};

use crate::context::Context;
use crate::event::Event;
use crate::handler::{EventHandler, RawEventHandler};

/// Run `on_event` and the event's own method on a new task
///
/// A panicking handler is logged and does not affect other events.
pub fn spawn_event(handler: Arc<dyn EventHandler>, ctx: Context, event: Event) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = event.name().to_string();
        trace!(event = %name, shard_id = ctx.shard_id(), "dispatching");
        let run = async {
            handler.on_event(ctx.clone(), &event).await;
            route(handler.as_ref(), ctx, event).await;
        };
        if let Err(panic) = AssertUnwindSafe(run).catch_unwind().await {
            error!(event = %name, panic = panic_message(&*panic), "event handler panicked");
        }
    })
}

/// Run a raw handler on a new task
pub fn spawn_raw(
    handler: Arc<dyn RawEventHandler>,
    ctx: Context,
    event: GatewayEventType,
    data: Value,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = event.to_string();
        let run = handler.on_raw(ctx, event, data);
        if let Err(panic) = AssertUnwindSafe(run).catch_unwind().await {
            error!(event = %name, panic = panic_message(&*panic), "raw event handler panicked");
        }
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Call the handler method matching `event`
pub async fn route(handler: &dyn EventHandler, ctx: Context, event: Event) {
    match event {
        Event::Connect { .. } => handler.on_connect(ctx).await,
        Event::Disconnect { code, reconnecting, .. } => handler.on_disconnect(ctx, code, reconnecting).await,
        Event::Resumed { .. } => handler.on_resumed(ctx).await,
        Event::ShardReady { shard_id } => handler.on_shard_ready(ctx, shard_id).await,
        Event::Ready => handler.on_ready(ctx).await,

        Event::GuildAvailable(guild) => handler.on_guild_available(ctx, guild).await,
        Event::GuildUnavailable(guild_id) => handler.on_guild_unavailable(ctx, guild_id).await,
        Event::GuildJoin(guild) => handler.on_guild_join(ctx, guild).await,
        Event::GuildRemove(guild) => handler.on_guild_remove(ctx, guild).await,
        Event::GuildUpdate { old, new } => handler.on_guild_update(ctx, old, new).await,
        Event::GuildEmojisUpdate { guild_id, old, new } => {
            handler.on_guild_emojis_update(ctx, guild_id, old, new).await;
        }
        Event::MemberJoin(member) => handler.on_member_join(ctx, member).await,
        Event::MemberRemove { guild_id, user } => handler.on_member_remove(ctx, guild_id, user).await,
        Event::MemberUpdate { old, new } => handler.on_member_update(ctx, old, new).await,
        Event::MemberBan { guild_id, user } => handler.on_member_ban(ctx, guild_id, user).await,
        Event::MemberUnban { guild_id, user } => handler.on_member_unban(ctx, guild_id, user).await,
        Event::RoleCreate { guild_id, role } => handler.on_role_create(ctx, guild_id, role).await,
        Event::RoleUpdate { guild_id, old, new } => handler.on_role_update(ctx, guild_id, old, new).await,
        Event::RoleDelete { guild_id, role } => handler.on_role_delete(ctx, guild_id, role).await,

        Event::ChannelCreate(channel) => handler.on_channel_create(ctx, channel).await,
        Event::ChannelUpdate { old, new } => handler.on_channel_update(ctx, old, new).await,
        Event::ChannelDelete(channel) => handler.on_channel_delete(ctx, channel).await,
        Event::ChannelPinsUpdate {
            channel_id,
            guild_id,
            last_pin,
        } => handler.on_channel_pins_update(ctx, channel_id, guild_id, last_pin).await,

        Event::MessageCreate(message) => handler.on_message(ctx, message).await,
        Event::RawMessageUpdate(raw) => handler.on_raw_message_edit(ctx, raw).await,
        Event::MessageUpdate { old, new } => handler.on_message_edit(ctx, old, new).await,
        Event::RawMessageDelete(raw) => handler.on_raw_message_delete(ctx, raw).await,
        Event::MessageDelete(message) => handler.on_message_delete(ctx, message).await,
        Event::RawBulkMessageDelete(raw) => handler.on_raw_bulk_message_delete(ctx, raw).await,
        Event::BulkMessageDelete(messages) => handler.on_bulk_message_delete(ctx, messages).await,
        Event::RawReactionAdd(raw) => handler.on_raw_reaction_add(ctx, raw).await,
        Event::ReactionAdd {
            message,
            emoji,
            user_id,
        } => handler.on_reaction_add(ctx, message, emoji, user_id).await,
        Event::RawReactionRemove(raw) => handler.on_raw_reaction_remove(ctx, raw).await,
        Event::ReactionRemove {
            message,
            emoji,
            user_id,
        } => handler.on_reaction_remove(ctx, message, emoji, user_id).await,
        Event::RawReactionClear(raw) => handler.on_raw_reaction_clear(ctx, raw).await,
        Event::ReactionClear { message, reactions } => handler.on_reaction_clear(ctx, message, reactions).await,
        Event::RawReactionClearEmoji(raw) => handler.on_raw_reaction_clear_emoji(ctx, raw).await,
        Event::ReactionClearEmoji { message, reaction } => {
            handler.on_reaction_clear_emoji(ctx, message, reaction).await;
        }

        Event::PresenceUpdate { guild_id, old, new } => handler.on_presence_update(ctx, guild_id, old, new).await,
        Event::Typing(typing) => handler.on_typing(ctx, typing).await,
        Event::UserUpdate { old, new } => handler.on_user_update(ctx, old, new).await,
        Event::RelationshipAdd(relationship) => handler.on_relationship_add(ctx, relationship).await,
        Event::RelationshipRemove(relationship) => handler.on_relationship_remove(ctx, relationship).await,
        Event::InviteCreate(invite) => handler.on_invite_create(ctx, invite).await,
        Event::InviteDelete(invite) => handler.on_invite_delete(ctx, invite).await,

        Event::Unknown { name, data } => handler.on_unknown(ctx, name, data).await,
    }
}
