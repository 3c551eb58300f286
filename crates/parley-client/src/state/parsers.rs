//! One parser per dispatch name

use parley_core::{
    Channel, CurrentUser, Guild, Member, Message, PartialMember, Presence, Relationship, Role,
    UnavailableGuild,
};
use parley_gateway::events::{
    ChannelPinsUpdateEvent, FriendPresence, GuildBanEvent, GuildEmojisUpdateEvent, GuildMemberRemoveEvent,
    GuildMemberUpdateEvent, GuildMembersChunkEvent, GuildRoleDeleteEvent, GuildRoleEvent,
    InviteCreateEvent, InviteDeleteEvent, MessageDeleteBulkEvent, MessageDeleteEvent,
    MessageReactionEvent, MessageReactionRemoveAllEvent, MessageReactionRemoveEmojiEvent,
    MessageUpdateEvent, ReadyEvent, ReadySupplementalEvent, RelationshipRemoveEvent,
    TypingStartEvent,
};
use parley_gateway::GatewayEventType;
use serde_json::Value;
use tracing::{debug, info};

use super::ConnectionState;
use crate::event::Event;

type ParseResult = Result<Vec<Event>, serde_json::Error>;

impl ConnectionState {
    pub(super) fn parse_dispatch(&self, shard_id: u64, event: &GatewayEventType, data: Value) -> ParseResult {
        use GatewayEventType as E;

        match event {
            E::Ready => self.parse_ready(shard_id, data),
            E::ReadySupplemental => self.parse_ready_supplemental(data),
            // Reported through the shard's own Resumed event
            E::Resumed => Ok(Vec::new()),

            E::GuildCreate => self.parse_guild_create(shard_id, data),
            E::GuildUpdate => self.parse_guild_update(data),
            E::GuildDelete => self.parse_guild_delete(data),
            E::GuildMemberAdd => self.parse_guild_member_add(data),
            E::GuildMemberUpdate => self.parse_guild_member_update(data),
            E::GuildMemberRemove => self.parse_guild_member_remove(data),
            E::GuildMembersChunk => self.parse_guild_members_chunk(data),
            E::GuildRoleCreate => self.parse_guild_role_create(data),
            E::GuildRoleUpdate => self.parse_guild_role_update(data),
            E::GuildRoleDelete => self.parse_guild_role_delete(data),
            E::GuildBanAdd => self.parse_guild_ban(data, true),
            E::GuildBanRemove => self.parse_guild_ban(data, false),
            E::GuildEmojisUpdate => self.parse_guild_emojis_update(data),

            E::ChannelCreate => self.parse_channel_create(data),
            E::ChannelUpdate => self.parse_channel_update(data),
            E::ChannelDelete => self.parse_channel_delete(data),
            E::ChannelPinsUpdate => self.parse_channel_pins_update(data),

            E::MessageCreate => self.parse_message_create(data),
            E::MessageUpdate => self.parse_message_update(data),
            E::MessageDelete => self.parse_message_delete(data),
            E::MessageDeleteBulk => self.parse_message_delete_bulk(data),
            E::MessageReactionAdd => self.parse_message_reaction_add(data),
            E::MessageReactionRemove => self.parse_message_reaction_remove(data),
            E::MessageReactionRemoveAll => self.parse_message_reaction_remove_all(data),
            E::MessageReactionRemoveEmoji => self.parse_message_reaction_remove_emoji(data),

            E::PresenceUpdate => self.parse_presence_update(data),
            E::TypingStart => self.parse_typing_start(data),
            E::UserUpdate => self.parse_user_update(data),
            E::RelationshipAdd => self.parse_relationship_add(data),
            E::RelationshipRemove => self.parse_relationship_remove(data),
            E::InviteCreate => Ok(vec![Event::InviteCreate(serde_json::from_value::<InviteCreateEvent>(data)?)]),
            E::InviteDelete => Ok(vec![Event::InviteDelete(serde_json::from_value::<InviteDeleteEvent>(data)?)]),

            E::Unknown(name) => {
                debug!(shard_id, event = %name, "unknown dispatch");
                Ok(vec![Event::Unknown {
                    name: name.clone(),
                    data,
                }])
            }
        }
    }

    // === Connection ===

    /// READY: rebuild the cache from the session snapshot
    pub fn parse_ready(&self, shard_id: u64, data: Value) -> ParseResult {
        let ready: ReadyEvent = serde_json::from_value(data)?;
        let bot = ready.user.user.bot;
        self.bot.store(bot, std::sync::atomic::Ordering::Relaxed);

        let sharded = self.readiness.lock().shard_count;
        match sharded {
            // Other shards keep their guilds
            Some(count) => {
                let stale: Vec<_> = self
                    .guilds
                    .iter()
                    .filter(|g| parley_gateway::shard_for_guild(g.id, count) == shard_id)
                    .map(|g| g.id)
                    .collect();
                for guild_id in stale {
                    self.remove_guild(guild_id);
                }
            }
            None => self.clear(),
        }

        self.store_user(&ready.user.user);
        *self.user.write() = Some(ready.user);
        for user in &ready.users {
            self.store_user(user);
        }
        for guild in ready.guilds {
            self.store_guild(guild);
        }
        for channel in ready.private_channels {
            for user in &channel.recipients {
                self.store_user(user);
            }
            self.private_channels.insert(channel.id, channel);
        }
        for relationship in ready.relationships {
            self.store_user(&relationship.user);
            self.relationships.insert(relationship.id, relationship);
        }
        if !ready.experiments.is_empty() || !ready.guild_experiments.is_empty() {
            *self.experiments.write() = ready.experiments;
            *self.guild_experiments.write() = ready.guild_experiments;
        }

        info!(shard_id, bot, guilds = self.guilds.len(), "received READY");

        // Bots receive their guilds as GUILD_CREATEs after READY
        if bot {
            self.begin_startup(shard_id);
            return Ok(Vec::new());
        }
        Ok(self.shard_ready(shard_id))
    }

    pub fn parse_ready_supplemental(&self, data: Value) -> ParseResult {
        let supplemental: ReadySupplementalEvent = serde_json::from_value(data)?;
        for presence in supplemental.merged_presences.friends {
            self.friend_presences.insert(presence.user_id, presence);
        }
        Ok(Vec::new())
    }

    // === Guilds ===

    pub fn parse_guild_create(&self, shard_id: u64, data: Value) -> ParseResult {
        let guild: Guild = serde_json::from_value(data)?;
        let guild_id = guild.id;

        if guild.unavailable {
            return Ok(self.mark_unavailable(guild_id).into_iter().collect());
        }

        let was_unavailable = self.guilds.get(&guild_id).is_some_and(|g| g.unavailable);
        self.store_guild(guild);

        if self.queue_startup_guild(shard_id, guild_id, was_unavailable) {
            return Ok(Vec::new());
        }

        if self.needs_chunking(guild_id) {
            self.request_chunk(guild_id);
        }
        let Some(guild) = self.guild(guild_id) else {
            return Ok(Vec::new());
        };
        Ok(vec![if was_unavailable {
            Event::GuildAvailable(guild)
        } else {
            Event::GuildJoin(guild)
        }])
    }

    fn mark_unavailable(&self, guild_id: parley_core::Snowflake) -> Option<Event> {
        let mut guild = self.guilds.get_mut(&guild_id)?;
        if guild.unavailable {
            return None;
        }
        guild.unavailable = true;
        Some(Event::GuildUnavailable(guild_id))
    }

    pub fn parse_guild_update(&self, data: Value) -> ParseResult {
        let update: Guild = serde_json::from_value(data)?;
        let guild_id = update.id;
        let events = self.update_guild(guild_id, "GUILD_UPDATE", |guild| {
            let old = guild.clone();
            guild.apply_update(update);
            guild.fill_guild_ids();
            Event::GuildUpdate {
                old,
                new: guild.clone(),
            }
        });
        Ok(events.into_iter().collect())
    }

    pub fn parse_guild_delete(&self, data: Value) -> ParseResult {
        let deleted: UnavailableGuild = serde_json::from_value(data)?;
        if deleted.unavailable {
            return Ok(self.mark_unavailable(deleted.id).into_iter().collect());
        }
        match self.remove_guild(deleted.id) {
            Some(guild) => Ok(vec![Event::GuildRemove(guild)]),
            None => {
                debug!(guild_id = %deleted.id, "GUILD_DELETE for unknown guild");
                Ok(Vec::new())
            }
        }
    }

    pub fn parse_guild_member_add(&self, data: Value) -> ParseResult {
        let member: Member = serde_json::from_value(data)?;
        let Some(guild_id) = member.guild_id else {
            debug!("GUILD_MEMBER_ADD without guild_id");
            return Ok(Vec::new());
        };
        self.store_user(&member.user);

        let event = self.update_guild(guild_id, "GUILD_MEMBER_ADD", |guild| {
            guild.members.insert(member.id(), member.clone());
            guild.member_count += 1;
            Event::MemberJoin(member)
        });
        Ok(event.into_iter().collect())
    }

    pub fn parse_guild_member_update(&self, data: Value) -> ParseResult {
        let update: GuildMemberUpdateEvent = serde_json::from_value(data)?;
        let user = update.user;
        let old_user = self.user(user.id);
        self.store_user(&user);

        let partial = PartialMember {
            user: Some(user.clone()),
            ..update.member
        };
        let member_event = self.update_guild(update.guild_id, "GUILD_MEMBER_UPDATE", |guild| {
            match guild.members.get_mut(&user.id) {
                Some(member) => {
                    let old = member.clone();
                    member.apply_update(&partial);
                    Some(Event::MemberUpdate {
                        old,
                        new: member.clone(),
                    })
                }
                None => {
                    // Not chunked yet; keep what the update tells us
                    let member = partial.clone().into_member(user.clone(), guild.id);
                    guild.members.insert(user.id, member);
                    None
                }
            }
        });

        let mut events = Vec::new();
        if let Some(old) = old_user.filter(|old| *old != user) {
            events.push(Event::UserUpdate { old, new: user });
        }
        events.extend(member_event.flatten());
        Ok(events)
    }

    pub fn parse_guild_member_remove(&self, data: Value) -> ParseResult {
        let removed: GuildMemberRemoveEvent = serde_json::from_value(data)?;
        let event = self.update_guild(removed.guild_id, "GUILD_MEMBER_REMOVE", |guild| {
            guild.members.remove(&removed.user.id);
            guild.presences.remove(&removed.user.id);
            guild.member_count = guild.member_count.saturating_sub(1);
            Event::MemberRemove {
                guild_id: removed.guild_id,
                user: removed.user,
            }
        });
        Ok(event.into_iter().collect())
    }

    pub fn parse_guild_members_chunk(&self, data: Value) -> ParseResult {
        let chunk: GuildMembersChunkEvent = serde_json::from_value(data)?;
        for member in &chunk.members {
            self.store_user(&member.user);
        }

        self.update_guild(chunk.guild_id, "GUILD_MEMBERS_CHUNK", |guild| {
            for member in &chunk.members {
                let mut member = member.clone();
                member.guild_id = Some(guild.id);
                guild.members.insert(member.id(), member);
            }
            for presence in &chunk.presences {
                let mut presence = presence.clone();
                presence.guild_id = Some(guild.id);
                guild.presences.insert(presence.user_id(), presence);
            }
        });
        debug!(
            guild_id = %chunk.guild_id,
            index = chunk.chunk_index,
            count = chunk.chunk_count,
            members = chunk.members.len(),
            "member chunk"
        );

        if let Some(nonce) = &chunk.nonce {
            self.chunks.feed(nonce, &chunk.members, chunk.is_last());
        }
        Ok(Vec::new())
    }

    pub fn parse_guild_role_create(&self, data: Value) -> ParseResult {
        let GuildRoleEvent { guild_id, role } = serde_json::from_value(data)?;
        let event = self.update_guild(guild_id, "GUILD_ROLE_CREATE", |guild| {
            guild.roles.insert(role.id, role.clone());
            Event::RoleCreate { guild_id, role }
        });
        Ok(event.into_iter().collect())
    }

    pub fn parse_guild_role_update(&self, data: Value) -> ParseResult {
        let GuildRoleEvent { guild_id, role } = serde_json::from_value(data)?;
        let event = self.update_guild(guild_id, "GUILD_ROLE_UPDATE", |guild| {
            match guild.roles.insert(role.id, role.clone()) {
                Some(old) => Event::RoleUpdate {
                    guild_id,
                    old,
                    new: role,
                },
                None => Event::RoleCreate { guild_id, role },
            }
        });
        Ok(event.into_iter().collect())
    }

    pub fn parse_guild_role_delete(&self, data: Value) -> ParseResult {
        let deleted: GuildRoleDeleteEvent = serde_json::from_value(data)?;
        let event = self.update_guild(deleted.guild_id, "GUILD_ROLE_DELETE", |guild| {
            let role: Role = guild.roles.remove(&deleted.role_id)?;
            for member in guild.members.values_mut() {
                member.roles.retain(|id| *id != deleted.role_id);
            }
            Some(Event::RoleDelete {
                guild_id: deleted.guild_id,
                role,
            })
        });
        Ok(event.flatten().into_iter().collect())
    }

    pub fn parse_guild_ban(&self, data: Value, added: bool) -> ParseResult {
        let GuildBanEvent { guild_id, user } = serde_json::from_value(data)?;
        if !self.guilds.contains_key(&guild_id) {
            debug!(%guild_id, "ban event for unknown guild");
            return Ok(Vec::new());
        }
        self.store_user(&user);
        Ok(vec![if added {
            Event::MemberBan { guild_id, user }
        } else {
            Event::MemberUnban { guild_id, user }
        }])
    }

    pub fn parse_guild_emojis_update(&self, data: Value) -> ParseResult {
        let update: GuildEmojisUpdateEvent = serde_json::from_value(data)?;
        let event = self.update_guild(update.guild_id, "GUILD_EMOJIS_UPDATE", |guild| {
            let old = guild.emojis.drain().map(|(_, e)| e).collect();
            guild.emojis = update.emojis.iter().map(|e| (e.id, e.clone())).collect();
            Event::GuildEmojisUpdate {
                guild_id: update.guild_id,
                old,
                new: update.emojis,
            }
        });
        Ok(event.into_iter().collect())
    }

    // === Channels ===

    pub fn parse_channel_create(&self, data: Value) -> ParseResult {
        let channel: Channel = serde_json::from_value(data)?;
        let Some(guild_id) = channel.guild_id else {
            for user in &channel.recipients {
                self.store_user(user);
            }
            self.private_channels.insert(channel.id, channel.clone());
            return Ok(vec![Event::ChannelCreate(channel)]);
        };

        let event = self.update_guild(guild_id, "CHANNEL_CREATE", |guild| {
            guild.channels.insert(channel.id, channel.clone());
            Event::ChannelCreate(channel.clone())
        });
        if event.is_some() {
            self.channel_guilds.insert(channel.id, guild_id);
        }
        Ok(event.into_iter().collect())
    }

    pub fn parse_channel_update(&self, data: Value) -> ParseResult {
        let channel: Channel = serde_json::from_value(data)?;
        let Some(guild_id) = channel.guild_id else {
            let old = self.private_channels.insert(channel.id, channel.clone());
            return Ok(match old {
                Some(old) => vec![Event::ChannelUpdate { old, new: channel }],
                None => vec![Event::ChannelCreate(channel)],
            });
        };

        let event = self.update_guild(guild_id, "CHANNEL_UPDATE", |guild| {
            match guild.channels.insert(channel.id, channel.clone()) {
                Some(old) => Event::ChannelUpdate { old, new: channel.clone() },
                None => Event::ChannelCreate(channel.clone()),
            }
        });
        if event.is_some() {
            self.channel_guilds.insert(channel.id, guild_id);
        }
        Ok(event.into_iter().collect())
    }

    pub fn parse_channel_delete(&self, data: Value) -> ParseResult {
        let channel: Channel = serde_json::from_value(data)?;
        self.messages.lock().remove_channel(channel.id);

        let Some(guild_id) = channel.guild_id else {
            let removed = self.private_channels.remove(&channel.id).map(|(_, c)| c);
            return Ok(vec![Event::ChannelDelete(removed.unwrap_or(channel))]);
        };

        self.channel_guilds.remove(&channel.id);
        let event = self.update_guild(guild_id, "CHANNEL_DELETE", |guild| {
            let removed = guild.channels.remove(&channel.id);
            Event::ChannelDelete(removed.unwrap_or_else(|| channel.clone()))
        });
        Ok(event.into_iter().collect())
    }

    pub fn parse_channel_pins_update(&self, data: Value) -> ParseResult {
        let update: ChannelPinsUpdateEvent = serde_json::from_value(data)?;
        if self.channel(update.channel_id).is_none() {
            debug!(channel_id = %update.channel_id, "pins update for unknown channel");
            return Ok(Vec::new());
        }
        Ok(vec![Event::ChannelPinsUpdate {
            channel_id: update.channel_id,
            guild_id: update.guild_id,
            last_pin: update.last_pin_timestamp,
        }])
    }

    // === Messages ===

    pub fn parse_message_create(&self, data: Value) -> ParseResult {
        let message: Message = serde_json::from_value(data)?;
        self.store_user(&message.author);

        match message.guild_id {
            Some(guild_id) => {
                let known = self.update_guild(guild_id, "MESSAGE_CREATE", |guild| {
                    if let Some(channel) = guild.channels.get_mut(&message.channel_id) {
                        channel.last_message_id = Some(message.id);
                    }
                    if let Some(partial) = &message.member {
                        if !guild.members.contains_key(&message.author.id) {
                            let member = partial.clone().into_member(message.author.clone(), guild.id);
                            guild.members.insert(message.author.id, member);
                        }
                    }
                });
                if known.is_none() {
                    return Ok(Vec::new());
                }
            }
            None => {
                if let Some(mut channel) = self.private_channels.get_mut(&message.channel_id) {
                    channel.last_message_id = Some(message.id);
                }
            }
        }

        self.messages.lock().push(message.clone());
        Ok(vec![Event::MessageCreate(message)])
    }

    pub fn parse_message_update(&self, data: Value) -> ParseResult {
        let raw = MessageUpdateEvent::from_value(data)?;
        let mut events = Vec::with_capacity(2);

        {
            let mut messages = self.messages.lock();
            if let Some(message) = messages.get_mut(raw.id) {
                let old = message.clone();
                message.apply_update(&raw.data);
                events.push(Event::MessageUpdate {
                    old,
                    new: message.clone(),
                });
            }
        }
        events.insert(0, Event::RawMessageUpdate(raw));
        Ok(events)
    }

    pub fn parse_message_delete(&self, data: Value) -> ParseResult {
        let raw: MessageDeleteEvent = serde_json::from_value(data)?;
        let removed = self.messages.lock().remove(raw.id);
        let mut events = vec![Event::RawMessageDelete(raw)];
        events.extend(removed.map(Event::MessageDelete));
        Ok(events)
    }

    pub fn parse_message_delete_bulk(&self, data: Value) -> ParseResult {
        let raw: MessageDeleteBulkEvent = serde_json::from_value(data)?;
        let removed: Vec<Message> = {
            let mut messages = self.messages.lock();
            raw.ids.iter().filter_map(|id| messages.remove(*id)).collect()
        };
        let mut events = vec![Event::RawBulkMessageDelete(raw)];
        if !removed.is_empty() {
            events.push(Event::BulkMessageDelete(removed));
        }
        Ok(events)
    }

    pub fn parse_message_reaction_add(&self, data: Value) -> ParseResult {
        let raw: MessageReactionEvent = serde_json::from_value(data)?;
        if let (Some(guild_id), Some(member)) = (raw.guild_id, &raw.member) {
            self.store_user(&member.user);
            if let Some(mut guild) = self.guilds.get_mut(&guild_id) {
                let mut member = member.clone();
                member.guild_id = Some(guild_id);
                guild.members.insert(member.id(), member);
            }
        }

        let me = self.user_id() == Some(raw.user_id);
        let cached = {
            let mut messages = self.messages.lock();
            messages.get_mut(raw.message_id).map(|message| {
                message.add_reaction(&raw.emoji, me);
                message.clone()
            })
        };

        let mut events = Vec::with_capacity(2);
        if let Some(message) = cached {
            events.push(Event::ReactionAdd {
                message,
                emoji: raw.emoji.clone(),
                user_id: raw.user_id,
            });
        }
        events.insert(0, Event::RawReactionAdd(raw));
        Ok(events)
    }

    pub fn parse_message_reaction_remove(&self, data: Value) -> ParseResult {
        let raw: MessageReactionEvent = serde_json::from_value(data)?;
        let me = self.user_id() == Some(raw.user_id);
        let cached = {
            let mut messages = self.messages.lock();
            messages.get_mut(raw.message_id).and_then(|message| {
                message.remove_reaction(&raw.emoji, me)?;
                Some(message.clone())
            })
        };

        let mut events = Vec::with_capacity(2);
        if let Some(message) = cached {
            events.push(Event::ReactionRemove {
                message,
                emoji: raw.emoji.clone(),
                user_id: raw.user_id,
            });
        }
        events.insert(0, Event::RawReactionRemove(raw));
        Ok(events)
    }

    pub fn parse_message_reaction_remove_all(&self, data: Value) -> ParseResult {
        let raw: MessageReactionRemoveAllEvent = serde_json::from_value(data)?;
        let cached = {
            let mut messages = self.messages.lock();
            messages.get_mut(raw.message_id).map(|message| {
                let reactions = std::mem::take(&mut message.reactions);
                (message.clone(), reactions)
            })
        };

        let mut events = vec![Event::RawReactionClear(raw)];
        if let Some((message, reactions)) = cached {
            events.push(Event::ReactionClear { message, reactions });
        }
        Ok(events)
    }

    pub fn parse_message_reaction_remove_emoji(&self, data: Value) -> ParseResult {
        let raw: MessageReactionRemoveEmojiEvent = serde_json::from_value(data)?;
        let cached = {
            let mut messages = self.messages.lock();
            messages.get_mut(raw.message_id).and_then(|message| {
                let reaction = message.clear_emoji(&raw.emoji)?;
                Some((message.clone(), reaction))
            })
        };

        let mut events = Vec::with_capacity(2);
        if let Some((message, reaction)) = cached {
            events.push(Event::ReactionClearEmoji { message, reaction });
        }
        events.insert(0, Event::RawReactionClearEmoji(raw));
        Ok(events)
    }

    // === Users ===

    pub fn parse_presence_update(&self, data: Value) -> ParseResult {
        let presence: Presence = serde_json::from_value(data)?;
        let user_id = presence.user_id();

        let Some(guild_id) = presence.guild_id else {
            self.friend_presences.insert(
                user_id,
                FriendPresence {
                    user_id,
                    status: presence.status,
                    activities: presence.activities.clone(),
                },
            );
            return Ok(vec![Event::PresenceUpdate {
                guild_id: None,
                old: None,
                new: presence,
            }]);
        };

        let event = self.update_guild(guild_id, "PRESENCE_UPDATE", |guild| {
            if let Some(member) = guild.members.get_mut(&user_id) {
                let update = &presence.user;
                if let Some(username) = &update.username {
                    member.user.username.clone_from(username);
                }
                if let Some(discriminator) = &update.discriminator {
                    member.user.discriminator.clone_from(discriminator);
                }
                if update.avatar.is_some() {
                    member.user.avatar.clone_from(&update.avatar);
                }
                if update.global_name.is_some() {
                    member.user.global_name.clone_from(&update.global_name);
                }
            }
            // Member events may arrive after the presence
            let old = guild.presences.insert(user_id, presence.clone());
            Event::PresenceUpdate {
                guild_id: Some(guild_id),
                old,
                new: presence,
            }
        });
        Ok(event.into_iter().collect())
    }

    pub fn parse_typing_start(&self, data: Value) -> ParseResult {
        let typing: TypingStartEvent = serde_json::from_value(data)?;
        if let (Some(guild_id), Some(member)) = (typing.guild_id, &typing.member) {
            self.store_user(&member.user);
            let known = self.update_guild(guild_id, "TYPING_START", |guild| {
                guild
                    .members
                    .entry(member.user.id)
                    .or_insert_with(|| member.clone())
                    .guild_id = Some(guild_id);
            });
            if known.is_none() {
                return Ok(Vec::new());
            }
        }
        Ok(vec![Event::Typing(typing)])
    }

    pub fn parse_user_update(&self, data: Value) -> ParseResult {
        let updated: CurrentUser = serde_json::from_value(data)?;
        let old = self.user.write().replace(updated.clone());
        self.store_user(&updated.user);
        Ok(match old {
            Some(old) => vec![Event::UserUpdate {
                old: old.user,
                new: updated.user,
            }],
            None => Vec::new(),
        })
    }

    pub fn parse_relationship_add(&self, data: Value) -> ParseResult {
        let relationship: Relationship = serde_json::from_value(data)?;
        self.store_user(&relationship.user);
        self.relationships.insert(relationship.id, relationship.clone());
        Ok(vec![Event::RelationshipAdd(relationship)])
    }

    pub fn parse_relationship_remove(&self, data: Value) -> ParseResult {
        let removed: RelationshipRemoveEvent = serde_json::from_value(data)?;
        Ok(self
            .relationships
            .remove(&removed.id)
            .map(|(_, r)| Event::RelationshipRemove(r))
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConnectionState;
    use parley_common::ClientConfig;
    use parley_core::{OnlineStatus, Snowflake};
    use serde_json::json;

    fn user(id: u64) -> Value {
        json!({"id": id.to_string(), "username": format!("user{id}"), "discriminator": "0"})
    }

    fn guild(id: u64) -> Value {
        json!({
            "id": id.to_string(),
            "name": "guild",
            "owner_id": "1",
            "member_count": 1,
            "roles": [{"id": id.to_string(), "name": "@everyone", "permissions": "1024"}],
            "channels": [{"id": "100", "type": 0, "name": "general"}],
            "members": [{"user": user(1), "roles": []}],
        })
    }

    fn message(id: u64) -> Value {
        json!({
            "id": id.to_string(),
            "channel_id": "100",
            "guild_id": "10",
            "author": user(2),
            "content": "hello",
            "timestamp": "2024-01-01T00:00:00+00:00",
        })
    }

    fn user_state() -> ConnectionState {
        let state = ConnectionState::new(&ClientConfig::new("token"));
        let events = state
            .parse_ready(0, json!({
                "user": user(1),
                "session_id": "abc",
                "guilds": [guild(10)],
                "private_channels": [{"id": "200", "type": 1, "recipients": [user(3)]}],
                "relationships": [{"id": "3", "type": 1, "user": user(3)}],
            }))
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::Ready]));
        state
    }

    #[test]
    fn test_user_ready_populates_cache() {
        let state = user_state();
        assert!(state.is_ready());
        assert_eq!(state.user_id(), Some(Snowflake::new(1)));
        assert!(state.guild(Snowflake::new(10)).is_some());
        assert_eq!(
            state.channel(Snowflake::new(100)).and_then(|c| c.guild_id),
            Some(Snowflake::new(10))
        );
        assert!(state.private_channel_with(Snowflake::new(3)).is_some());
        assert_eq!(state.relationships().len(), 1);
        assert!(state.user(Snowflake::new(3)).is_some());
    }

    #[test]
    fn test_bot_ready_waits_for_guilds() {
        let state = ConnectionState::new(&ClientConfig::new("token").with_bot(true));
        let mut me = user(1);
        me["bot"] = json!(true);
        let events = state
            .parse_ready(0, json!({
                "user": me,
                "session_id": "abc",
                "guilds": [{"id": "10", "unavailable": true}],
            }))
            .unwrap();
        assert!(events.is_empty());
        assert!(state.is_starting(0));
        assert!(state.guild(Snowflake::new(10)).is_some_and(|g| g.unavailable));

        // Queued while starting
        let events = state.parse_guild_create(0, guild(10)).unwrap();
        assert!(events.is_empty());
        assert!(state.guild(Snowflake::new(10)).is_some_and(|g| !g.unavailable));
    }

    #[tokio::test]
    async fn test_finish_startup_emits_queued_guilds() {
        let config = ClientConfig::new("token")
            .with_bot(true)
            .with_guild_ready_timeout(std::time::Duration::from_millis(20));
        let state = ConnectionState::new(&config);
        let mut me = user(1);
        me["bot"] = json!(true);
        state
            .parse_ready(0, json!({
                "user": me,
                "session_id": "abc",
                "guilds": [{"id": "10", "unavailable": true}],
            }))
            .unwrap();
        state.parse_guild_create(0, guild(10)).unwrap();

        let events = state.finish_startup(0).await;
        assert!(matches!(events.as_slice(), [Event::GuildAvailable(g), Event::Ready] if g.id == Snowflake::new(10)));
        assert!(!state.is_starting(0));
        assert!(state.is_ready());

        // After startup, new guilds dispatch directly
        let events = state.parse_guild_create(0, guild(11)).unwrap();
        assert!(matches!(events.as_slice(), [Event::GuildJoin(g)] if g.id == Snowflake::new(11)));
    }

    #[test]
    fn test_guild_delete() {
        let state = user_state();
        let events = state
            .parse_guild_delete(json!({"id": "10", "unavailable": true}))
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::GuildUnavailable(id)] if *id == Snowflake::new(10)));

        let events = state.parse_guild_delete(json!({"id": "10"})).unwrap();
        assert!(matches!(events.as_slice(), [Event::GuildRemove(_)]));
        assert!(state.guild(Snowflake::new(10)).is_none());
        assert!(state.channel(Snowflake::new(100)).is_none());
    }

    #[test]
    fn test_member_count_tracks_add_and_remove() {
        let state = user_state();
        state
            .parse_guild_member_add(json!({"guild_id": "10", "user": user(5), "roles": []}))
            .unwrap();
        assert_eq!(state.guild(Snowflake::new(10)).map(|g| g.member_count), Some(2));
        assert!(state.member(Snowflake::new(10), Snowflake::new(5)).is_some());

        let events = state
            .parse_guild_member_remove(json!({"guild_id": "10", "user": user(5)}))
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::MemberRemove { .. }]));
        assert_eq!(state.guild(Snowflake::new(10)).map(|g| g.member_count), Some(1));
    }

    #[test]
    fn test_member_update_emits_old_and_new() {
        let state = user_state();
        let events = state
            .parse_guild_member_update(json!({
                "guild_id": "10",
                "user": user(1),
                "nick": "nick",
                "roles": ["10"],
            }))
            .unwrap();
        match events.as_slice() {
            [Event::MemberUpdate { old, new }] => {
                assert_eq!(old.nick, None);
                assert_eq!(new.nick.as_deref(), Some("nick"));
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_guild_is_dropped() {
        let state = user_state();
        let events = state
            .parse_guild_member_add(json!({"guild_id": "999", "user": user(5)}))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_role_delete_strips_members() {
        let state = user_state();
        state
            .parse_guild_role_create(json!({"guild_id": "10", "role": {"id": "50", "name": "mod", "permissions": "0"}}))
            .unwrap();
        state
            .parse_guild_member_update(json!({"guild_id": "10", "user": user(1), "roles": ["50"]}))
            .unwrap();

        let events = state
            .parse_guild_role_delete(json!({"guild_id": "10", "role_id": "50"}))
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::RoleDelete { role, .. }] if role.name == "mod"));
        let member = state.member(Snowflake::new(10), Snowflake::new(1)).unwrap();
        assert!(member.roles.is_empty());
    }

    #[test]
    fn test_message_lifecycle() {
        let state = user_state();
        let events = state.parse_message_create(message(500)).unwrap();
        assert!(matches!(events.as_slice(), [Event::MessageCreate(_)]));
        assert_eq!(
            state.channel(Snowflake::new(100)).and_then(|c| c.last_message_id),
            Some(Snowflake::new(500))
        );

        let events = state
            .parse_message_update(json!({"id": "500", "channel_id": "100", "content": "edited"}))
            .unwrap();
        match events.as_slice() {
            [Event::RawMessageUpdate(_), Event::MessageUpdate { old, new }] => {
                assert_eq!(old.content, "hello");
                assert_eq!(new.content, "edited");
            }
            other => panic!("unexpected events: {other:?}"),
        }

        let events = state
            .parse_message_delete(json!({"id": "500", "channel_id": "100"}))
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::RawMessageDelete(_), Event::MessageDelete(_)]));
        assert!(state.message(Snowflake::new(500)).is_none());
    }

    #[test]
    fn test_update_of_uncached_message_is_raw_only() {
        let state = user_state();
        let events = state
            .parse_message_update(json!({"id": "1", "channel_id": "100", "content": "x"}))
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::RawMessageUpdate(_)]));
    }

    #[test]
    fn test_bulk_delete() {
        let state = user_state();
        state.parse_message_create(message(1)).unwrap();
        state.parse_message_create(message(2)).unwrap();
        let events = state
            .parse_message_delete_bulk(json!({"ids": ["1", "2", "3"], "channel_id": "100"}))
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::RawBulkMessageDelete(_), Event::BulkMessageDelete(m)] if m.len() == 2));
    }

    #[test]
    fn test_reactions_on_cached_message() {
        let state = user_state();
        state.parse_message_create(message(500)).unwrap();
        let reaction = json!({
            "user_id": "1",
            "channel_id": "100",
            "message_id": "500",
            "guild_id": "10",
            "emoji": {"id": null, "name": "👍"},
        });

        let events = state.parse_message_reaction_add(reaction.clone()).unwrap();
        match events.as_slice() {
            [Event::RawReactionAdd(_), Event::ReactionAdd { message, .. }] => {
                assert_eq!(message.reactions.len(), 1);
                assert!(message.reactions[0].me);
            }
            other => panic!("unexpected events: {other:?}"),
        }

        let events = state.parse_message_reaction_remove(reaction).unwrap();
        assert!(matches!(events.as_slice(), [Event::RawReactionRemove(_), Event::ReactionRemove { message, .. }] if message.reactions.is_empty()));
    }

    #[test]
    fn test_reaction_on_uncached_message_is_raw_only() {
        let state = user_state();
        let events = state
            .parse_message_reaction_add(json!({
                "user_id": "2",
                "channel_id": "100",
                "message_id": "999",
                "emoji": {"id": null, "name": "👍"},
            }))
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::RawReactionAdd(_)]));
    }

    #[test]
    fn test_presence_without_member_is_recorded() {
        let state = user_state();
        let events = state
            .parse_presence_update(json!({
                "user": {"id": "77"},
                "guild_id": "10",
                "status": "idle",
            }))
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::PresenceUpdate { old: None, .. }]));
        let guild = state.guild(Snowflake::new(10)).unwrap();
        assert_eq!(guild.presences.get(&Snowflake::new(77)).map(|p| p.status), Some(OnlineStatus::Idle));
        assert!(guild.member(Snowflake::new(77)).is_none());
    }

    #[test]
    fn test_channel_create_and_delete() {
        let state = user_state();
        state
            .parse_channel_create(json!({"id": "101", "type": 0, "guild_id": "10", "name": "new"}))
            .unwrap();
        assert!(state.channel(Snowflake::new(101)).is_some());

        let events = state
            .parse_channel_update(json!({"id": "101", "type": 0, "guild_id": "10", "name": "renamed"}))
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::ChannelUpdate { old, new }] if old.name.as_deref() == Some("new") && new.name.as_deref() == Some("renamed")));

        state
            .parse_channel_delete(json!({"id": "101", "type": 0, "guild_id": "10"}))
            .unwrap();
        assert!(state.channel(Snowflake::new(101)).is_none());
    }

    #[test]
    fn test_relationship_remove() {
        let state = user_state();
        let events = state
            .parse_relationship_remove(json!({"id": "3", "type": 1}))
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::RelationshipRemove(r)] if r.user.id == Snowflake::new(3)));
        assert!(state.relationships().is_empty());
    }

    #[test]
    fn test_chunk_merges_members() {
        let state = user_state();
        let waiter = state.chunks().register(Snowflake::new(10));
        let nonce = waiter.nonce().to_string();
        state
            .parse_guild_members_chunk(json!({
                "guild_id": "10",
                "members": [{"user": user(8), "roles": []}],
                "chunk_index": 0,
                "chunk_count": 1,
                "nonce": nonce,
            }))
            .unwrap();
        assert!(state.member(Snowflake::new(10), Snowflake::new(8)).is_some());
        assert_eq!(state.chunks().pending(), 0);
    }

    #[test]
    fn test_unknown_dispatch_passes_through() {
        let state = user_state();
        let events = state.handle(parley_gateway::ShardEvent::Dispatch {
            shard_id: 0,
            event: GatewayEventType::parse("CALL_CREATE"),
            seq: 4,
            data: json!({"x": 1}),
        });
        assert!(matches!(events.as_slice(), [Event::Unknown { name, .. }] if name == "CALL_CREATE"));
    }
}
