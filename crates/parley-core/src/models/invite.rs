//! Invite model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;
use crate::value_objects::Snowflake;

/// Guild summary embedded in an invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteGuild {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Channel summary embedded in an invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteChannel {
    pub id: Snowflake,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub code: String,
    #[serde(default)]
    pub guild: Option<InviteGuild>,
    #[serde(default)]
    pub channel: Option<InviteChannel>,
    #[serde(default)]
    pub inviter: Option<User>,
    #[serde(default)]
    pub uses: u32,
    /// Zero means unlimited
    #[serde(default)]
    pub max_uses: u32,
    /// Seconds; zero means never
    #[serde(default)]
    pub max_age: u32,
    #[serde(default)]
    pub temporary: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approximate_member_count: Option<u32>,
    #[serde(default)]
    pub approximate_presence_count: Option<u32>,
}

impl Invite {
    /// Public invite URL
    pub fn url(&self) -> String {
        format!("https://discord.gg/{}", self.code)
    }

    /// Extract the code from an invite URL or return the input unchanged
    pub fn resolve_code(url_or_code: &str) -> &str {
        let trimmed = url_or_code.trim().trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_uses > 0 && self.uses >= self.max_uses
    }
}
