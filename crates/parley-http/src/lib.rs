//! # parley-http
//!
//! REST client for the platform API: route templates, per-bucket rate
//! limiting with retries, typed endpoints, and model extension traits.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod ext;
pub mod ratelimit;
pub mod requests;
pub mod responses;
pub mod route;

pub use client::{Http, RequestOptions};
pub use error::{ApiErrorBody, HttpError, HttpResult};
pub use ext::{ChannelExt, GuildExt, MemberExt, MessageExt, RoleExt, UserExt};
pub use ratelimit::{RateLimitHeaders, Ratelimiter};
pub use requests::{
    BulkDeleteMessages, CreateBan, CreateChannel, CreateGuild, CreateInvite, CreateMessage,
    EditChannel, EditGuild, EditMember, EditMessage, EditProfile, EditRole, HistoryAnchor,
    SendFriendRequest,
};
pub use responses::{Ban, BotGatewayInfo, GatewayInfo, PartialGuild, SessionStartLimit};
pub use route::Route;
