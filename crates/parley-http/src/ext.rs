//! Model methods that talk to the API
//!
//! Models are plain data; these traits forward to [`Http`] so call sites can
//! read `message.reply(&http, "pong")`.

use async_trait::async_trait;
use parley_core::{
    Channel, Guild, Invite, Member, Message, ModelError, PartialEmoji, Role, Snowflake, User,
};

use crate::client::Http;
use crate::error::HttpResult;
use crate::requests::{CreateBan, CreateChannel, CreateInvite, CreateMessage, EditMessage, EditRole, HistoryAnchor};

/// Guild id of a member, required by every member endpoint
fn member_guild(member: &Member) -> HttpResult<Snowflake> {
    member
        .guild_id
        .ok_or_else(|| ModelError::Validation("Member has no guild id".to_string()).into())
}

#[async_trait]
pub trait MessageExt {
    /// Reply in the same channel, referencing this message
    async fn reply(&self, http: &Http, content: &str) -> HttpResult<Message>;
    async fn edit(&self, http: &Http, content: &str) -> HttpResult<Message>;
    async fn delete(&self, http: &Http) -> HttpResult<()>;
    async fn react(&self, http: &Http, emoji: &PartialEmoji) -> HttpResult<()>;
    async fn unreact(&self, http: &Http, emoji: &PartialEmoji) -> HttpResult<()>;
    async fn pin(&self, http: &Http) -> HttpResult<()>;
    async fn unpin(&self, http: &Http) -> HttpResult<()>;
}

#[async_trait]
impl MessageExt for Message {
    async fn reply(&self, http: &Http, content: &str) -> HttpResult<Message> {
        let message = CreateMessage::content(content).reply_to(self.to_reference());
        http.send_message(self.channel_id, &message).await
    }

    async fn edit(&self, http: &Http, content: &str) -> HttpResult<Message> {
        let edit = EditMessage {
            content: Some(content.to_string()),
            ..EditMessage::default()
        };
        http.edit_message(self.channel_id, self.id, &edit).await
    }

    async fn delete(&self, http: &Http) -> HttpResult<()> {
        http.delete_message(self.channel_id, self.id, None).await
    }

    async fn react(&self, http: &Http, emoji: &PartialEmoji) -> HttpResult<()> {
        http.add_reaction(self.channel_id, self.id, emoji).await
    }

    async fn unreact(&self, http: &Http, emoji: &PartialEmoji) -> HttpResult<()> {
        http.remove_own_reaction(self.channel_id, self.id, emoji).await
    }

    async fn pin(&self, http: &Http) -> HttpResult<()> {
        http.pin_message(self.channel_id, self.id, None).await
    }

    async fn unpin(&self, http: &Http) -> HttpResult<()> {
        http.unpin_message(self.channel_id, self.id, None).await
    }
}

#[async_trait]
pub trait ChannelExt {
    async fn send(&self, http: &Http, content: &str) -> HttpResult<Message>;
    async fn send_message(&self, http: &Http, message: &CreateMessage) -> HttpResult<Message>;
    /// Newest `limit` messages
    async fn history(&self, http: &Http, limit: usize) -> HttpResult<Vec<Message>>;
    async fn typing(&self, http: &Http) -> HttpResult<()>;
    async fn create_invite(&self, http: &Http, request: &CreateInvite) -> HttpResult<Invite>;
    async fn delete(&self, http: &Http) -> HttpResult<()>;
}

#[async_trait]
impl ChannelExt for Channel {
    async fn send(&self, http: &Http, content: &str) -> HttpResult<Message> {
        http.send_message(self.id, &CreateMessage::content(content)).await
    }

    async fn send_message(&self, http: &Http, message: &CreateMessage) -> HttpResult<Message> {
        http.send_message(self.id, message).await
    }

    async fn history(&self, http: &Http, limit: usize) -> HttpResult<Vec<Message>> {
        http.logs_from(self.id, limit, HistoryAnchor::Latest).await
    }

    async fn typing(&self, http: &Http) -> HttpResult<()> {
        http.trigger_typing(self.id).await
    }

    async fn create_invite(&self, http: &Http, request: &CreateInvite) -> HttpResult<Invite> {
        http.create_invite(self.id, request, None).await
    }

    async fn delete(&self, http: &Http) -> HttpResult<()> {
        http.delete_channel(self.id, None).await
    }
}

#[async_trait]
pub trait GuildExt {
    async fn leave(&self, http: &Http) -> HttpResult<()>;
    async fn delete(&self, http: &Http) -> HttpResult<()>;
    async fn create_text_channel(&self, http: &Http, name: &str) -> HttpResult<Channel>;
    async fn create_role(&self, http: &Http, role: &EditRole) -> HttpResult<Role>;
    async fn fetch_member(&self, http: &Http, user_id: Snowflake) -> HttpResult<Member>;
    async fn kick(&self, http: &Http, user_id: Snowflake, reason: Option<&str>) -> HttpResult<()>;
    async fn ban(&self, http: &Http, user_id: Snowflake, reason: Option<&str>) -> HttpResult<()>;
    async fn unban(&self, http: &Http, user_id: Snowflake) -> HttpResult<()>;
}

#[async_trait]
impl GuildExt for Guild {
    async fn leave(&self, http: &Http) -> HttpResult<()> {
        http.leave_guild(self.id).await
    }

    async fn delete(&self, http: &Http) -> HttpResult<()> {
        http.delete_guild(self.id).await
    }

    async fn create_text_channel(&self, http: &Http, name: &str) -> HttpResult<Channel> {
        http.create_channel(self.id, &CreateChannel::text(name), None).await
    }

    async fn create_role(&self, http: &Http, role: &EditRole) -> HttpResult<Role> {
        http.create_role(self.id, role, None).await
    }

    async fn fetch_member(&self, http: &Http, user_id: Snowflake) -> HttpResult<Member> {
        http.get_member(self.id, user_id).await
    }

    async fn kick(&self, http: &Http, user_id: Snowflake, reason: Option<&str>) -> HttpResult<()> {
        http.kick(self.id, user_id, reason).await
    }

    async fn ban(&self, http: &Http, user_id: Snowflake, reason: Option<&str>) -> HttpResult<()> {
        http.ban(self.id, user_id, &CreateBan::default(), reason).await
    }

    async fn unban(&self, http: &Http, user_id: Snowflake) -> HttpResult<()> {
        http.unban(self.id, user_id, None).await
    }
}

#[async_trait]
pub trait MemberExt {
    async fn kick(&self, http: &Http, reason: Option<&str>) -> HttpResult<()>;
    async fn ban(&self, http: &Http, reason: Option<&str>) -> HttpResult<()>;
    async fn add_role(&self, http: &Http, role_id: Snowflake) -> HttpResult<()>;
    async fn remove_role(&self, http: &Http, role_id: Snowflake) -> HttpResult<()>;
    async fn send(&self, http: &Http, content: &str) -> HttpResult<Message>;
}

#[async_trait]
impl MemberExt for Member {
    async fn kick(&self, http: &Http, reason: Option<&str>) -> HttpResult<()> {
        http.kick(member_guild(self)?, self.id(), reason).await
    }

    async fn ban(&self, http: &Http, reason: Option<&str>) -> HttpResult<()> {
        http.ban(member_guild(self)?, self.id(), &CreateBan::default(), reason)
            .await
    }

    async fn add_role(&self, http: &Http, role_id: Snowflake) -> HttpResult<()> {
        http.add_role(member_guild(self)?, self.id(), role_id, None).await
    }

    async fn remove_role(&self, http: &Http, role_id: Snowflake) -> HttpResult<()> {
        http.remove_role(member_guild(self)?, self.id(), role_id, None).await
    }

    async fn send(&self, http: &Http, content: &str) -> HttpResult<Message> {
        self.user.send(http, content).await
    }
}

#[async_trait]
pub trait RoleExt {
    async fn edit(&self, http: &Http, guild_id: Snowflake, edit: &EditRole) -> HttpResult<Role>;
    async fn delete(&self, http: &Http, guild_id: Snowflake) -> HttpResult<()>;
}

#[async_trait]
impl RoleExt for Role {
    async fn edit(&self, http: &Http, guild_id: Snowflake, edit: &EditRole) -> HttpResult<Role> {
        http.edit_role(guild_id, self.id, edit, None).await
    }

    async fn delete(&self, http: &Http, guild_id: Snowflake) -> HttpResult<()> {
        http.delete_role(guild_id, self.id, None).await
    }
}

#[async_trait]
pub trait UserExt {
    async fn create_dm(&self, http: &Http) -> HttpResult<Channel>;
    /// Open a DM and send a message in it
    async fn send(&self, http: &Http, content: &str) -> HttpResult<Message>;
}

#[async_trait]
impl UserExt for User {
    async fn create_dm(&self, http: &Http) -> HttpResult<Channel> {
        http.create_dm(&[self.id]).await
    }

    async fn send(&self, http: &Http, content: &str) -> HttpResult<Message> {
        let channel = self.create_dm(http).await?;
        http.send_message(channel.id, &CreateMessage::content(content))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_common::HttpConfig;

    #[tokio::test]
    async fn test_member_without_guild_is_rejected_locally() {
        let http = Http::new("token", true, HttpConfig::default()).unwrap();
        let member = Member {
            guild_id: None,
            ..Member::new(User::new(Snowflake::new(1), "a"), Snowflake::new(2))
        };
        let err = member.kick(&http, None).await.unwrap_err();
        assert!(matches!(err, crate::HttpError::Model(ModelError::Validation(_))));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_locally() {
        let http = Http::new("token", true, HttpConfig::default()).unwrap();
        let channel = Channel::new_text(Snowflake::new(1), Snowflake::new(2), "general");
        let err = channel.send(&http, "   ").await.unwrap_err();
        assert!(matches!(err, crate::HttpError::Model(_)));
    }
}
