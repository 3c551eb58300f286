//! Payloads of client frames, and of the server frames the shard reads itself

use parley_common::SuperProperties;
use parley_core::{Activity, Intents, OnlineStatus, Snowflake};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Op 10
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Milliseconds
    pub heartbeat_interval: u64,
}

/// `properties` of an Identify
///
/// Bots send the three basic keys; user sessions send the full web client
/// fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_build_number: Option<u32>,
}

impl IdentifyProperties {
    pub fn bot() -> Self {
        let props = SuperProperties::bot();
        Self {
            os: props.os,
            browser: props.browser,
            device: props.device,
            system_locale: None,
            browser_user_agent: None,
            browser_version: None,
            os_version: None,
            release_channel: None,
            client_build_number: None,
        }
    }
}

impl From<&SuperProperties> for IdentifyProperties {
    fn from(props: &SuperProperties) -> Self {
        Self {
            os: props.os.clone(),
            browser: props.browser.clone(),
            device: props.device.clone(),
            system_locale: Some(props.system_locale.clone()),
            browser_user_agent: Some(props.browser_user_agent.clone()),
            browser_version: Some(props.browser_version.clone()),
            os_version: Some(props.os_version.clone()),
            release_channel: Some(props.release_channel.clone()),
            client_build_number: Some(props.client_build_number),
        }
    }
}

/// Client state a user session reports on Identify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    pub guild_versions: HashMap<String, u64>,
    pub highest_last_message_id: String,
    pub read_state_version: u64,
    pub user_guild_settings_version: i64,
    pub user_settings_version: i64,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            guild_versions: HashMap::new(),
            highest_last_message_id: "0".to_string(),
            read_state_version: 0,
            user_guild_settings_version: -1,
            user_settings_version: -1,
        }
    }
}

/// Op 2
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub properties: IdentifyProperties,
    #[serde(default)]
    pub compress: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceUpdatePayload>,

    // Bot only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intents: Option<Intents>,
    /// `[shard_id, shard_count]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_threshold: Option<u16>,

    // User only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
}

impl IdentifyPayload {
    /// Capability flags the web client announces
    pub const USER_CAPABILITIES: u32 = 16381;

    pub fn bot(token: impl Into<String>, intents: Intents, shard: [u64; 2], large_threshold: u16) -> Self {
        Self {
            token: token.into(),
            properties: IdentifyProperties::bot(),
            compress: false,
            presence: None,
            intents: Some(intents),
            shard: Some(shard),
            large_threshold: Some(large_threshold),
            capabilities: None,
            client_state: None,
        }
    }

    pub fn user(token: impl Into<String>, properties: &SuperProperties) -> Self {
        Self {
            token: token.into(),
            properties: properties.into(),
            compress: false,
            presence: Some(PresenceUpdatePayload::new(OnlineStatus::Online)),
            intents: None,
            shard: None,
            large_threshold: None,
            capabilities: Some(Self::USER_CAPABILITIES),
            client_state: Some(ClientState::default()),
        }
    }
}

/// Op 6
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    pub seq: u64,
}

/// Op 3
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdatePayload {
    /// Unix milliseconds when the client went idle
    pub since: Option<u64>,
    pub activities: Vec<Activity>,
    pub status: OnlineStatus,
    pub afk: bool,
}

impl PresenceUpdatePayload {
    pub fn new(status: OnlineStatus) -> Self {
        Self {
            since: None,
            activities: Vec::new(),
            status,
            afk: false,
        }
    }

    #[must_use]
    pub fn activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }

    #[must_use]
    pub fn afk(mut self, afk: bool) -> Self {
        self.afk = afk;
        self
    }
}

/// Op 8
///
/// Either `query` (prefix match, empty for everyone) or `user_ids` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestGuildMembersPayload {
    pub guild_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// 0 is no limit for an empty query
    pub limit: u32,
    #[serde(default)]
    pub presences: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<Snowflake>>,
    /// Echoed back in every GUILD_MEMBERS_CHUNK of the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl RequestGuildMembersPayload {
    /// Request every member
    pub fn all(guild_id: Snowflake, presences: bool) -> Self {
        Self {
            guild_id,
            query: Some(String::new()),
            limit: 0,
            presences,
            user_ids: None,
            nonce: None,
        }
    }

    /// Members whose name starts with `query`
    pub fn query(guild_id: Snowflake, query: impl Into<String>, limit: u32) -> Self {
        Self {
            query: Some(query.into()),
            limit,
            ..Self::all(guild_id, false)
        }
    }

    pub fn user_ids(guild_id: Snowflake, user_ids: Vec<Snowflake>) -> Self {
        Self {
            query: None,
            user_ids: Some(user_ids),
            ..Self::all(guild_id, false)
        }
    }

    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

/// Op 14, user accounts only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSubscriptionsPayload {
    pub guild_id: Snowflake,
    pub typing: bool,
    pub activities: bool,
    pub threads: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_updates: Option<bool>,
    /// Channel id -> member list index ranges `[start, end]`
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub channels: HashMap<Snowflake, Vec<[u32; 2]>>,
}

impl GuildSubscriptionsPayload {
    pub fn new(guild_id: Snowflake) -> Self {
        Self {
            guild_id,
            typing: true,
            activities: true,
            threads: true,
            member_updates: None,
            channels: HashMap::new(),
        }
    }

    /// Subscribe to the member list of a channel, in pages of 100
    #[must_use]
    pub fn channel_ranges(mut self, channel_id: Snowflake, ranges: Vec<[u32; 2]>) -> Self {
        self.channels.insert(channel_id, ranges);
        self
    }
}

/// Data of op 9
pub fn parse_invalid_session(data: Option<&serde_json::Value>) -> bool {
    data.and_then(serde_json::Value::as_bool).unwrap_or(false)
}
