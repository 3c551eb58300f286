//! # parley-gateway
//!
//! Gateway WebSocket client: the wire protocol, dispatch names and payloads,
//! the per-shard connection state machine, and the shard manager.

pub mod error;
pub mod events;
pub mod manager;
pub mod protocol;
pub mod shard;

pub use error::{GatewayError, GatewayResult};
pub use events::GatewayEventType;
pub use manager::{shard_for_guild, ShardManager};
pub use protocol::{
    CloseCode, GatewayMessage, GuildSubscriptionsPayload, OpCode, PresenceUpdatePayload,
    RequestGuildMembersPayload,
};
pub use shard::{Shard, ShardConfig, ShardEvent, ShardMessenger, ShardStage};
