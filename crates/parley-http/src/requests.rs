//! Request bodies for REST endpoints
//!
//! Bodies with user-supplied text implement `Validate` and are checked before
//! they are sent.

use chrono::{DateTime, Utc};
use parley_core::{
    ChannelType, Embed, MessageReference, PermissionOverwrite, Permissions, Snowflake,
    MAX_CONTENT_LENGTH,
};
use serde::Serialize;
use validator::Validate;

// ============================================================================
// Message Requests
// ============================================================================

/// Send message request
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct CreateMessage {
    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,

    #[validate(length(max = 10, message = "At most 10 embeds per message"))]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,

    /// Used to match the gateway echo to this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Snowflake>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub tts: bool,
}

impl CreateMessage {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    #[must_use]
    pub fn reply_to(mut self, reference: MessageReference) -> Self {
        self.message_reference = Some(reference);
        self
    }

    #[must_use]
    pub fn tts(mut self, tts: bool) -> Self {
        self.tts = tts;
        self
    }

    /// Whether the message would render anything
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.embeds.is_empty()
    }
}

/// Edit message request; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct EditMessage {
    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[validate(length(max = 10, message = "At most 10 embeds per message"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
}

/// Bulk delete messages request
#[derive(Debug, Clone, Serialize, Validate)]
pub struct BulkDeleteMessages {
    #[validate(length(min = 2, max = 100, message = "Must delete 2-100 messages"))]
    pub messages: Vec<Snowflake>,
}

/// Message history query
///
/// At most one of `before`, `after`, `around` is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryAnchor {
    /// Newest messages
    #[default]
    Latest,
    Before(Snowflake),
    After(Snowflake),
    Around(Snowflake),
}

impl HistoryAnchor {
    pub fn query(self) -> Option<(&'static str, String)> {
        match self {
            Self::Latest => None,
            Self::Before(id) => Some(("before", id.to_string())),
            Self::After(id) => Some(("after", id.to_string())),
            Self::Around(id) => Some(("around", id.to_string())),
        }
    }
}

// ============================================================================
// User Requests
// ============================================================================

/// Edit current user request
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct EditProfile {
    #[validate(length(min = 2, max = 32, message = "Username must be 2-32 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[validate(length(min = 1, max = 32, message = "Display name must be 1-32 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,

    /// Image data URI (`data:image/png;base64,...`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[validate(length(max = 190, message = "Bio must be at most 190 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Required by user accounts when changing the username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Open DM / group DM request
#[derive(Debug, Clone, Serialize)]
pub struct CreateDm {
    pub recipients: Vec<Snowflake>,
}

/// Friend request by username
#[derive(Debug, Clone, Serialize, Validate)]
pub struct SendFriendRequest {
    #[validate(length(min = 2, max = 32, message = "Username must be 2-32 characters"))]
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<u16>,
}

// ============================================================================
// Guild Requests
// ============================================================================

/// Create guild request
#[derive(Debug, Clone, Serialize, Validate)]
pub struct CreateGuild {
    #[validate(length(min = 2, max = 100, message = "Guild name must be 2-100 characters"))]
    pub name: String,

    /// Image data URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Edit guild request
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct EditGuild {
    #[validate(length(min = 2, max = 100, message = "Guild name must be 2-100 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[validate(length(max = 120, message = "Description must be at most 120 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Snowflake>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_channel_id: Option<Snowflake>,
}

// ============================================================================
// Channel Requests
// ============================================================================

/// Create guild channel request
#[derive(Debug, Clone, Serialize, Validate)]
pub struct CreateChannel {
    #[validate(length(min = 1, max = 100, message = "Channel name must be 1-100 characters"))]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ChannelType,

    #[validate(length(max = 1024, message = "Topic must be at most 1024 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permission_overwrites: Vec<PermissionOverwrite>,
}

impl CreateChannel {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChannelType::GuildText,
            topic: None,
            parent_id: None,
            position: None,
            permission_overwrites: Vec::new(),
        }
    }

    pub fn category(name: impl Into<String>) -> Self {
        Self {
            kind: ChannelType::GuildCategory,
            ..Self::text(name)
        }
    }
}

/// Edit channel request
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct EditChannel {
    #[validate(length(min = 1, max = 100, message = "Channel name must be 1-100 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[validate(length(max = 1024, message = "Topic must be at most 1024 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,

    #[validate(range(max = 21600, message = "Slowmode must be at most 6 hours"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_user: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_overwrites: Option<Vec<PermissionOverwrite>>,
}

// ============================================================================
// Member and Role Requests
// ============================================================================

/// Edit member request
///
/// `nick: Some(None)` clears the nickname.
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct EditMember {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Snowflake>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deaf: Option<bool>,

    /// `Some(None)` removes a timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_disabled_until: Option<Option<DateTime<Utc>>>,
}

impl EditMember {
    /// Check the nickname length, which `validator` cannot reach through `Option<Option<_>>`
    pub fn check_nick(&self) -> Result<(), parley_core::ModelError> {
        match &self.nick {
            Some(Some(nick)) if nick.chars().count() > 32 => Err(parley_core::ModelError::Validation(
                "Nickname must be at most 32 characters".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Ban request
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct CreateBan {
    #[validate(range(max = 604_800, message = "Can delete at most 7 days of messages"))]
    pub delete_message_seconds: u32,
}

/// Create or edit role request
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct EditRole {
    #[validate(length(min = 1, max = 100, message = "Role name must be 1-100 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,

    #[validate(range(max = 0x00ff_ffff, message = "Color must be a 24-bit RGB value"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoist: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentionable: Option<bool>,
}

// ============================================================================
// Invite Requests
// ============================================================================

/// Create invite request
#[derive(Debug, Clone, Serialize, Validate)]
pub struct CreateInvite {
    /// Seconds; 0 never expires
    #[validate(range(max = 604_800, message = "Max age must be at most 7 days"))]
    pub max_age: u32,

    /// 0 is unlimited
    #[validate(range(max = 100, message = "Max uses must be at most 100"))]
    pub max_uses: u32,

    pub temporary: bool,

    pub unique: bool,
}

impl Default for CreateInvite {
    fn default() -> Self {
        Self {
            max_age: 86_400,
            max_uses: 0,
            temporary: false,
            unique: false,
        }
    }
}

/// Check the content length limit
pub(crate) fn check_content(content: &str) -> Result<(), parley_core::ModelError> {
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(parley_core::ModelError::ContentTooLong {
            max: MAX_CONTENT_LENGTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_create_message_validation() {
        assert!(CreateMessage::content("Hello, world!").validate().is_ok());
        assert!(CreateMessage::content("a".repeat(2001)).validate().is_err());

        let mut too_many = CreateMessage::content("x");
        too_many.embeds = vec![Embed::new(); 11];
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn test_create_message_serialization_skips_defaults() {
        let body = serde_json::to_value(CreateMessage::content("hi")).unwrap();
        assert_eq!(body, serde_json::json!({"content": "hi"}));

        let mut msg = CreateMessage::content("hi").tts(true);
        msg.nonce = Some(Snowflake::new(5));
        let body = serde_json::to_value(msg).unwrap();
        assert_eq!(body["tts"], true);
        assert_eq!(body["nonce"], "5");
    }

    #[test]
    fn test_empty_message() {
        assert!(CreateMessage::default().is_empty());
        assert!(CreateMessage::content("  ").is_empty());
        assert!(!CreateMessage::default().embed(Embed::new().title("t")).is_empty());
    }

    #[test]
    fn test_bulk_delete_validation() {
        let valid = BulkDeleteMessages {
            messages: vec![Snowflake::new(1), Snowflake::new(2)],
        };
        assert!(valid.validate().is_ok());

        let too_few = BulkDeleteMessages {
            messages: vec![Snowflake::new(1)],
        };
        assert!(too_few.validate().is_err());
    }

    #[test]
    fn test_edit_member_nick_tristate() {
        let keep = serde_json::to_value(EditMember::default()).unwrap();
        assert_eq!(keep, serde_json::json!({}));

        let clear = EditMember {
            nick: Some(None),
            ..EditMember::default()
        };
        assert_eq!(serde_json::to_value(&clear).unwrap(), serde_json::json!({"nick": null}));

        let long = EditMember {
            nick: Some(Some("n".repeat(33))),
            ..EditMember::default()
        };
        assert!(long.check_nick().is_err());
    }

    #[test]
    fn test_role_color_range() {
        let role = EditRole {
            color: Some(0x0100_0000),
            ..EditRole::default()
        };
        assert!(role.validate().is_err());
    }

    #[test]
    fn test_history_anchor_query() {
        assert_eq!(HistoryAnchor::Latest.query(), None);
        assert_eq!(
            HistoryAnchor::Before(Snowflake::new(9)).query(),
            Some(("before", "9".to_string()))
        );
    }

    #[test]
    fn test_check_content_counts_chars() {
        assert!(check_content(&"é".repeat(2000)).is_ok());
        assert!(check_content(&"é".repeat(2001)).is_err());
    }
}
