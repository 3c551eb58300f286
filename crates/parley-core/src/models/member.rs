//! Member model - a user's membership in a guild

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;
use crate::value_objects::{Permissions, Snowflake};

/// Guild member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub premium_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub communication_disabled_until: Option<DateTime<Utc>>,
    /// Only present on interaction payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

impl Member {
    pub fn new(user: User, guild_id: Snowflake) -> Self {
        Self {
            user,
            guild_id: Some(guild_id),
            nick: None,
            avatar: None,
            roles: Vec::new(),
            joined_at: None,
            premium_since: None,
            deaf: false,
            mute: false,
            pending: false,
            communication_disabled_until: None,
            permissions: None,
        }
    }

    #[inline]
    pub fn id(&self) -> Snowflake {
        self.user.id
    }

    /// Nickname, then global name, then username
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or_else(|| self.user.display_name())
    }

    /// `<@id>` mention string
    pub fn mention(&self) -> String {
        self.user.mention()
    }

    /// Check if member has a specific role
    #[inline]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.roles.contains(&role_id)
    }

    /// Whether the member is timed out at `now`
    pub fn is_timed_out_at(&self, now: DateTime<Utc>) -> bool {
        self.communication_disabled_until
            .is_some_and(|until| until > now)
    }

    /// Whether the member is currently timed out
    pub fn is_timed_out(&self) -> bool {
        self.is_timed_out_at(Utc::now())
    }

    /// Apply a partial update, keeping cached fields the payload omits
    pub fn apply_update(&mut self, update: &PartialMember) {
        if let Some(user) = &update.user {
            self.user = user.clone();
        }
        if let Some(roles) = &update.roles {
            self.roles.clone_from(roles);
        }
        if update.nick.is_some() || update.user.is_some() {
            self.nick.clone_from(&update.nick);
        }
        if let Some(avatar) = &update.avatar {
            self.avatar = Some(avatar.clone());
        }
        if let Some(joined_at) = update.joined_at {
            self.joined_at = Some(joined_at);
        }
        self.premium_since = update.premium_since.or(self.premium_since);
        if let Some(pending) = update.pending {
            self.pending = pending;
        }
        self.communication_disabled_until = update.communication_disabled_until;
    }
}

/// Member data where any field may be missing (updates, message authors)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialMember {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<Snowflake>>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub premium_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deaf: Option<bool>,
    #[serde(default)]
    pub mute: Option<bool>,
    #[serde(default)]
    pub pending: Option<bool>,
    #[serde(default)]
    pub communication_disabled_until: Option<DateTime<Utc>>,
}

impl PartialMember {
    /// Complete this member with a user, for message authors
    pub fn into_member(self, user: User, guild_id: Snowflake) -> Member {
        Member {
            user,
            guild_id: Some(self.guild_id.unwrap_or(guild_id)),
            nick: self.nick,
            avatar: self.avatar,
            roles: self.roles.unwrap_or_default(),
            joined_at: self.joined_at,
            premium_since: self.premium_since,
            deaf: self.deaf.unwrap_or(false),
            mute: self.mute.unwrap_or(false),
            pending: self.pending.unwrap_or(false),
            communication_disabled_until: self.communication_disabled_until,
            permissions: None,
        }
    }
}
