//! Channel model - guild channels, DMs, group DMs, and threads

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::User;
use crate::value_objects::{Permissions, Snowflake};

/// Channel type
///
/// Unknown values are preserved so newer payloads still round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelType {
    #[default]
    GuildText,
    Dm,
    GuildVoice,
    GroupDm,
    GuildCategory,
    GuildNews,
    NewsThread,
    PublicThread,
    PrivateThread,
    GuildStageVoice,
    GuildDirectory,
    GuildForum,
    GuildMedia,
    Unknown(u8),
}

impl ChannelType {
    /// Get the numeric value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::GuildText => 0,
            Self::Dm => 1,
            Self::GuildVoice => 2,
            Self::GroupDm => 3,
            Self::GuildCategory => 4,
            Self::GuildNews => 5,
            Self::NewsThread => 10,
            Self::PublicThread => 11,
            Self::PrivateThread => 12,
            Self::GuildStageVoice => 13,
            Self::GuildDirectory => 14,
            Self::GuildForum => 15,
            Self::GuildMedia => 16,
            Self::Unknown(value) => value,
        }
    }

    /// Whether messages can be sent in channels of this type
    #[must_use]
    pub const fn is_messageable(self) -> bool {
        matches!(
            self,
            Self::GuildText
                | Self::Dm
                | Self::GuildVoice
                | Self::GroupDm
                | Self::GuildNews
                | Self::NewsThread
                | Self::PublicThread
                | Self::PrivateThread
                | Self::GuildStageVoice
        )
    }

    /// Whether this is a DM or group DM
    #[must_use]
    pub const fn is_private(self) -> bool {
        matches!(self, Self::Dm | Self::GroupDm)
    }

    #[must_use]
    pub const fn is_thread(self) -> bool {
        matches!(
            self,
            Self::NewsThread | Self::PublicThread | Self::PrivateThread
        )
    }
}

impl From<u8> for ChannelType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::GuildText,
            1 => Self::Dm,
            2 => Self::GuildVoice,
            3 => Self::GroupDm,
            4 => Self::GuildCategory,
            5 => Self::GuildNews,
            10 => Self::NewsThread,
            11 => Self::PublicThread,
            12 => Self::PrivateThread,
            13 => Self::GuildStageVoice,
            14 => Self::GuildDirectory,
            15 => Self::GuildForum,
            16 => Self::GuildMedia,
            other => Self::Unknown(other),
        }
    }
}

impl Serialize for ChannelType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ChannelType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u8::deserialize(deserializer).map(Self::from)
    }
}

/// Target of a permission overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverwriteKind {
    Role,
    Member,
}

impl Serialize for OverwriteKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(match self {
            Self::Role => 0,
            Self::Member => 1,
        })
    }
}

impl<'de> Deserialize<'de> for OverwriteKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Role),
            1 => Ok(Self::Member),
            other => Err(serde::de::Error::custom(format!(
                "invalid overwrite type: {other}"
            ))),
        }
    }
}

/// Channel permission overwrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: OverwriteKind,
    #[serde(default)]
    pub allow: Permissions,
    #[serde(default)]
    pub deny: Permissions,
}

/// Channel of any kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub last_message_id: Option<Snowflake>,
    #[serde(default)]
    pub rate_limit_per_user: u32,
    #[serde(default)]
    pub permission_overwrites: Vec<PermissionOverwrite>,
    /// DM and group DM participants (excluding the current user)
    #[serde(default)]
    pub recipients: Vec<User>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
}

impl Channel {
    /// Create a new guild text channel
    #[must_use]
    pub fn new_text(id: Snowflake, guild_id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id,
            kind: ChannelType::GuildText,
            guild_id: Some(guild_id),
            name: Some(name.into()),
            topic: None,
            position: 0,
            parent_id: None,
            nsfw: false,
            last_message_id: None,
            rate_limit_per_user: 0,
            permission_overwrites: Vec::new(),
            recipients: Vec::new(),
            owner_id: None,
        }
    }

    /// Create a new DM channel with a recipient
    #[must_use]
    pub fn new_dm(id: Snowflake, recipient: User) -> Self {
        Self {
            kind: ChannelType::Dm,
            guild_id: None,
            name: None,
            recipients: vec![recipient],
            ..Self::new_text(id, Snowflake::default(), "")
        }
    }

    /// Check if this is a DM or group DM
    #[inline]
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.kind.is_private()
    }

    /// Check if this is a category
    #[inline]
    #[must_use]
    pub fn is_category(&self) -> bool {
        matches!(self.kind, ChannelType::GuildCategory)
    }

    /// The DM recipient, for one-to-one DMs
    #[must_use]
    pub fn recipient(&self) -> Option<&User> {
        match self.kind {
            ChannelType::Dm => self.recipients.first(),
            _ => None,
        }
    }

    /// Get display name (channel name, or the recipients for DMs)
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if self.recipients.is_empty() {
            return "Unnamed".to_string();
        }
        self.recipients
            .iter()
            .map(|u| u.display_name().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `<#id>` mention string
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }

    /// Find the overwrite for a role or member
    pub fn overwrite_for(&self, id: Snowflake) -> Option<&PermissionOverwrite> {
        self.permission_overwrites.iter().find(|o| o.id == id)
    }
}
