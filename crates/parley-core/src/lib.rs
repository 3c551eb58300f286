//! # parley-core
//!
//! Model layer: the platform objects, value objects, permission resolution,
//! and experiment hashing. No I/O lives here.

pub mod error;
pub mod models;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use error::ModelError;
pub use models::{
    Activity, ActivityType, Attachment, Channel, ChannelType, CurrentUser, Embed, Emoji,
    Guild, GuildExperiment, Invite, Member, Message, MessageReference, MessageType,
    OnlineStatus, OverwriteKind, PartialEmoji, PartialMember, PermissionOverwrite, Presence,
    Reaction, Relationship, RelationshipType, Role, Subscription, UnavailableGuild, User,
    UserExperiment, MAX_CONTENT_LENGTH, percent_encode,
};
pub use value_objects::{Intents, NonceGenerator, Permissions, Snowflake, SnowflakeParseError};
