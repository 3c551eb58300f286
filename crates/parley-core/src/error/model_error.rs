//! Model errors - failures resolving or validating platform objects locally

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Model layer errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(Snowflake),

    #[error("Guild not found: {0}")]
    GuildNotFound(Snowflake),

    #[error("Channel not found: {0}")]
    ChannelNotFound(Snowflake),

    #[error("Message not found: {0}")]
    MessageNotFound(Snowflake),

    #[error("Role not found: {0}")]
    RoleNotFound(Snowflake),

    #[error("Member {user_id} not found in guild {guild_id}")]
    MemberNotFound {
        guild_id: Snowflake,
        user_id: Snowflake,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Invalid emoji: {0:?}")]
    InvalidEmoji(String),

    #[error("Invalid mention: {0:?}")]
    InvalidMention(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

impl ModelError {
    /// Get an error code string
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::GuildNotFound(_) => "UNKNOWN_GUILD",
            Self::ChannelNotFound(_) => "UNKNOWN_CHANNEL",
            Self::MessageNotFound(_) => "UNKNOWN_MESSAGE",
            Self::RoleNotFound(_) => "UNKNOWN_ROLE",
            Self::MemberNotFound { .. } => "UNKNOWN_MEMBER",

            // Parse
            Self::InvalidEmoji(_) => "INVALID_EMOJI",
            Self::InvalidMention(_) => "INVALID_MENTION",

            // Validation
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::MissingPermission(_) => "MISSING_PERMISSIONS",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::GuildNotFound(_)
                | Self::ChannelNotFound(_)
                | Self::MessageNotFound(_)
                | Self::RoleNotFound(_)
                | Self::MemberNotFound { .. }
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::ContentTooLong { .. }
                | Self::InvalidEmoji(_)
                | Self::InvalidMention(_)
        )
    }
}
