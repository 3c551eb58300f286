use parley_client::Context;
use parley_core::{Embed, Guild, Member, Message, Snowflake, User};
use parley_http::CreateMessage;
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

use crate::converters::ConvertContext;
use crate::error::CommandResult;

/// Everything a command callback knows about its invocation
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub ctx: Context,
    pub message: Message,
    /// The prefix that matched, as typed
    pub prefix: String,
    /// The name or alias the command was invoked with
    pub invoked_with: String,
    /// Qualified name of the resolved command, e.g. `tag create`
    pub command: String,
    pub(crate) owners: Arc<HashSet<Snowflake>>,
}

impl CommandContext {
    #[inline]
    pub fn author(&self) -> &User {
        &self.message.author
    }

    #[inline]
    pub fn guild_id(&self) -> Option<Snowflake> {
        self.message.guild_id
    }

    #[inline]
    pub fn channel_id(&self) -> Snowflake {
        self.message.channel_id
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.message.is_private()
    }

    pub fn guild(&self) -> Option<Guild> {
        self.cache.guild(self.guild_id()?)
    }

    /// The author's member object in the invoking guild
    pub fn member(&self) -> Option<Member> {
        self.cache.member(self.guild_id()?, self.author().id)
    }

    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owners.contains(&user_id)
    }

    pub(crate) fn convert_context(&self) -> ConvertContext {
        ConvertContext {
            cache: self.cache.clone(),
            guild_id: self.guild_id(),
            channel_id: self.channel_id(),
        }
    }

    /// Send a message to the invoking channel
    pub async fn send(&self, content: impl Into<String>) -> CommandResult<Message> {
        let message = CreateMessage::content(content);
        Ok(self.http.send_message(self.channel_id(), &message).await?)
    }

    pub async fn send_embed(&self, embed: Embed) -> CommandResult<Message> {
        let message = CreateMessage::default().embed(embed);
        Ok(self.http.send_message(self.channel_id(), &message).await?)
    }

    /// Reply to the invoking message
    pub async fn reply(&self, content: impl Into<String>) -> CommandResult<Message> {
        let message = CreateMessage::content(content).reply_to(self.message.to_reference());
        Ok(self.http.send_message(self.channel_id(), &message).await?)
    }
}

impl Deref for CommandContext {
    type Target = Context;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}
