//! Gateway protocol: op codes, close codes, frames, and payloads

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{
    parse_invalid_session, ClientState, GuildSubscriptionsPayload, HelloPayload, IdentifyPayload,
    IdentifyProperties, PresenceUpdatePayload, RequestGuildMembersPayload, ResumePayload,
};
