//! Message model and its embedded parts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{PartialEmoji, PartialMember, User};
use crate::value_objects::Snowflake;

/// Maximum characters in message content
pub const MAX_CONTENT_LENGTH: usize = 2000;

/// Message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageType {
    #[default]
    Default,
    RecipientAdd,
    RecipientRemove,
    Call,
    ChannelNameChange,
    ChannelIconChange,
    ChannelPinnedMessage,
    UserJoin,
    GuildBoost,
    Reply,
    ThreadCreated,
    ThreadStarterMessage,
    Unknown(u8),
}

impl MessageType {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::RecipientAdd => 1,
            Self::RecipientRemove => 2,
            Self::Call => 3,
            Self::ChannelNameChange => 4,
            Self::ChannelIconChange => 5,
            Self::ChannelPinnedMessage => 6,
            Self::UserJoin => 7,
            Self::GuildBoost => 8,
            Self::ThreadCreated => 18,
            Self::Reply => 19,
            Self::ThreadStarterMessage => 21,
            Self::Unknown(value) => value,
        }
    }

    /// Whether this is a message a user typed, as opposed to a system notice
    #[must_use]
    pub const fn is_user_content(self) -> bool {
        matches!(self, Self::Default | Self::Reply)
    }
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Default,
            1 => Self::RecipientAdd,
            2 => Self::RecipientRemove,
            3 => Self::Call,
            4 => Self::ChannelNameChange,
            5 => Self::ChannelIconChange,
            6 => Self::ChannelPinnedMessage,
            7 => Self::UserJoin,
            8 => Self::GuildBoost,
            18 => Self::ThreadCreated,
            19 => Self::Reply,
            21 => Self::ThreadStarterMessage,
            other => Self::Unknown(other),
        }
    }
}

impl Serialize for MessageType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u8::deserialize(deserializer).map(Self::from)
    }
}

/// File attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub url: String,
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl Attachment {
    #[inline]
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedMedia {
    pub url: String,
}

/// Rich embed
///
/// Builder methods consume and return `self`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    #[must_use]
    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter {
            text: text.into(),
            icon_url: None,
        });
        self
    }
}

/// Reply / crosspost reference to another message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_if_not_exists: Option<bool>,
}

/// Aggregated reaction count on a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: PartialEmoji,
    #[serde(default)]
    pub count: u32,
    /// Whether the current user reacted
    #[serde(default)]
    pub me: bool,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub author: User,
    /// Present on guild messages from gateway events
    #[serde(default)]
    pub member: Option<PartialMember>,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    pub mention_roles: Vec<Snowflake>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub nonce: Option<serde_json::Value>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub message_reference: Option<MessageReference>,
    #[serde(default)]
    pub referenced_message: Option<Box<Message>>,
    #[serde(default)]
    pub flags: u64,
}

impl Message {
    #[inline]
    pub fn is_edited(&self) -> bool {
        self.edited_timestamp.is_some()
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.guild_id.is_none()
    }

    /// Whether `user_id` is mentioned directly
    pub fn mentions_user(&self, user_id: Snowflake) -> bool {
        self.mentions.iter().any(|u| u.id == user_id)
    }

    /// Link to this message in the client
    pub fn jump_url(&self) -> String {
        let guild = self
            .guild_id
            .map_or_else(|| "@me".to_string(), |id| id.to_string());
        format!(
            "https://discord.com/channels/{guild}/{}/{}",
            self.channel_id, self.id
        )
    }

    /// Reference for replying to this message
    pub fn to_reference(&self) -> MessageReference {
        MessageReference {
            message_id: Some(self.id),
            channel_id: Some(self.channel_id),
            guild_id: self.guild_id,
            fail_if_not_exists: None,
        }
    }

    /// Record a reaction; returns the updated reaction
    pub fn add_reaction(&mut self, emoji: &PartialEmoji, me: bool) -> &Reaction {
        let index = match self.reactions.iter().position(|r| same_emoji(&r.emoji, emoji)) {
            Some(index) => {
                let reaction = &mut self.reactions[index];
                reaction.count += 1;
                reaction.me |= me;
                index
            }
            None => {
                self.reactions.push(Reaction {
                    emoji: emoji.clone(),
                    count: 1,
                    me,
                });
                self.reactions.len() - 1
            }
        };
        &self.reactions[index]
    }

    /// Remove a reaction; drops the entry once its count reaches zero
    pub fn remove_reaction(&mut self, emoji: &PartialEmoji, me: bool) -> Option<Reaction> {
        let index = self
            .reactions
            .iter()
            .position(|r| same_emoji(&r.emoji, emoji))?;
        let reaction = &mut self.reactions[index];
        reaction.count = reaction.count.saturating_sub(1);
        if me {
            reaction.me = false;
        }
        let snapshot = reaction.clone();
        if reaction.count == 0 {
            self.reactions.remove(index);
        }
        Some(snapshot)
    }

    /// Remove every reaction for one emoji
    pub fn clear_emoji(&mut self, emoji: &PartialEmoji) -> Option<Reaction> {
        let index = self
            .reactions
            .iter()
            .position(|r| same_emoji(&r.emoji, emoji))?;
        Some(self.reactions.remove(index))
    }

    /// Patch this message from a partial MESSAGE_UPDATE payload
    ///
    /// Only keys present in `data` are applied.
    pub fn apply_update(&mut self, data: &serde_json::Value) {
        let Some(object) = data.as_object() else {
            return;
        };
        if let Some(content) = object.get("content").and_then(|v| v.as_str()) {
            self.content = content.to_string();
        }
        if let Some(value) = object.get("edited_timestamp") {
            self.edited_timestamp = serde_json::from_value(value.clone()).ok().flatten();
        }
        if let Some(pinned) = object.get("pinned").and_then(|v| v.as_bool()) {
            self.pinned = pinned;
        }
        if let Some(flags) = object.get("flags").and_then(|v| v.as_u64()) {
            self.flags = flags;
        }
        if let Some(value) = object.get("mention_everyone").and_then(|v| v.as_bool()) {
            self.mention_everyone = value;
        }
        macro_rules! patch_vec {
            ($($field:ident),*) => {$(
                if let Some(value) = object.get(stringify!($field)) {
                    if let Ok(parsed) = serde_json::from_value(value.clone()) {
                        self.$field = parsed;
                    }
                }
            )*};
        }
        patch_vec!(embeds, attachments, mentions, mention_roles);
    }
}

fn same_emoji(a: &PartialEmoji, b: &PartialEmoji) -> bool {
    match (a.id, b.id) {
        (Some(x), Some(y)) => x == y,
        (None, None) => a.name == b.name,
        _ => false,
    }
}
