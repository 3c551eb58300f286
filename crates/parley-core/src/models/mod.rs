//! Platform models - serde mirrors of the objects the server sends
//!
//! Unknown JSON fields are ignored; fields that are frequently omitted default.

mod channel;
mod emoji;
mod experiment;
mod guild;
mod invite;
mod member;
mod message;
mod presence;
mod relationship;
mod role;
mod subscription;
mod user;

pub use channel::{Channel, ChannelType, OverwriteKind, PermissionOverwrite};
pub use emoji::{percent_encode, Emoji, PartialEmoji};
pub use experiment::{
    experiment_hash, murmur3_32, rollout_position, ExperimentOverride, ExperimentsResponse,
    GuildExperiment, Population, Rollout, RolloutRange, UserExperiment,
};
pub use guild::{Guild, Identified, UnavailableGuild};
pub use invite::{Invite, InviteChannel, InviteGuild};
pub use member::{Member, PartialMember};
pub use message::{
    Attachment, Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedMedia, Message,
    MessageReference, MessageType, Reaction, MAX_CONTENT_LENGTH,
};
pub use presence::{Activity, ActivityType, ClientStatus, OnlineStatus, Presence, PresenceUser};
pub use relationship::{Relationship, RelationshipType};
pub use role::Role;
pub use subscription::{PremiumGuildSubscription, Subscription, SubscriptionStatus};
pub use user::{CurrentUser, User, CDN_BASE};
