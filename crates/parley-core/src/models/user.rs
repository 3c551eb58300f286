//! User models - platform accounts

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// CDN base used for avatar and icon URLs
pub const CDN_BASE: &str = "https://cdn.discordapp.com";

/// A platform user as it appears in payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default = "default_discriminator")]
    pub discriminator: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub public_flags: u64,
}

fn default_discriminator() -> String {
    "0".to_string()
}

impl User {
    /// Create a minimal user
    pub fn new(id: Snowflake, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            discriminator: default_discriminator(),
            global_name: None,
            avatar: None,
            bot: false,
            system: false,
            public_flags: 0,
        }
    }

    /// Whether the account migrated to unique usernames
    #[inline]
    pub fn is_migrated(&self) -> bool {
        self.discriminator == "0"
    }

    /// `username#discriminator`, or just the username for migrated accounts
    pub fn tag(&self) -> String {
        if self.is_migrated() {
            self.username.clone()
        } else {
            format!("{}#{}", self.username, self.discriminator)
        }
    }

    /// Global display name if set, otherwise the username
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }

    /// `<@id>` mention string
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Avatar URL or default avatar URL
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => {
                let ext = if hash.starts_with("a_") { "gif" } else { "png" };
                format!("{CDN_BASE}/avatars/{}/{hash}.{ext}", self.id)
            }
            None => format!(
                "{CDN_BASE}/embed/avatars/{}.png",
                self.default_avatar_index()
            ),
        }
    }

    /// Default avatar index, derived from the discriminator or the ID
    fn default_avatar_index(&self) -> u64 {
        if self.is_migrated() {
            (self.id.get() >> 22) % 6
        } else {
            self.discriminator.parse::<u64>().unwrap_or(0) % 5
        }
    }
}

/// The logged-in account, with private fields only visible to itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub mfa_enabled: bool,
    #[serde(default)]
    pub premium_type: Option<u8>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl CurrentUser {
    /// Whether the account has any premium subscription tier
    pub fn is_premium(&self) -> bool {
        self.premium_type.is_some_and(|t| t > 0)
    }
}

impl std::ops::Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.user
    }
}
