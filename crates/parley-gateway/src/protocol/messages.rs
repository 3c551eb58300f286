//! Gateway frame format

use super::{
    GuildSubscriptionsPayload, HelloPayload, IdentifyPayload, OpCode, PresenceUpdatePayload,
    RequestGuildMembersPayload, ResumePayload,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One gateway frame
///
/// `t` and `s` are only set on dispatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: OpCode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    #[serde(default)]
    pub d: Option<Value>,
}

impl GatewayMessage {
    fn with_data<T: Serialize>(op: OpCode, data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            op,
            t: None,
            s: None,
            d: Some(serde_json::to_value(data)?),
        })
    }

    // === Client frames ===

    /// Op 1 carrying the last sequence received
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self {
            op: OpCode::Heartbeat,
            t: None,
            s: None,
            d: Some(last_sequence.map_or(Value::Null, |s| Value::Number(s.into()))),
        }
    }

    pub fn identify(payload: &IdentifyPayload) -> Result<Self, serde_json::Error> {
        Self::with_data(OpCode::Identify, payload)
    }

    pub fn resume(payload: &ResumePayload) -> Result<Self, serde_json::Error> {
        Self::with_data(OpCode::Resume, payload)
    }

    pub fn presence_update(payload: &PresenceUpdatePayload) -> Result<Self, serde_json::Error> {
        Self::with_data(OpCode::PresenceUpdate, payload)
    }

    pub fn request_guild_members(payload: &RequestGuildMembersPayload) -> Result<Self, serde_json::Error> {
        Self::with_data(OpCode::RequestGuildMembers, payload)
    }

    pub fn guild_subscriptions(payload: &GuildSubscriptionsPayload) -> Result<Self, serde_json::Error> {
        Self::with_data(OpCode::GuildSubscriptions, payload)
    }

    // === Server frames ===

    /// Build a dispatch frame, as the server would
    #[must_use]
    pub fn dispatch(event: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    /// Hello interval, if this is op 10
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.d.as_ref().and_then(|d| HelloPayload::deserialize(d).ok())
    }

    /// Resumable flag, if this is op 9
    pub fn as_invalid_session(&self) -> Option<bool> {
        (self.op == OpCode::InvalidSession).then(|| super::parse_invalid_session(self.d.as_ref()))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.t, self.s) {
            (Some(t), Some(s)) => write!(f, "{} {t} #{s}", self.op),
            (Some(t), None) => write!(f, "{} {t}", self.op),
            _ => write!(f, "{}", self.op),
        }
    }
}
