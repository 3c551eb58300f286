//! Typed REST endpoints, grouped by resource
//!
//! Each module adds an `impl Http` block. Bodies with user text are validated
//! locally before any request is made.

mod billing;
mod channels;
mod guilds;
mod invites;
mod members;
mod messages;
mod reactions;
mod relationships;
mod users;

/// Page size of `GET /users/@me/guilds`
pub const GUILDS_PAGE_SIZE: usize = 200;

/// Page size of `GET /guilds/{guild_id}/members`
pub const MEMBERS_PAGE_SIZE: usize = 1000;

/// Page size of `GET /channels/{channel_id}/messages`
pub const MESSAGES_PAGE_SIZE: usize = 100;
