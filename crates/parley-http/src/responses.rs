//! Response bodies that are not platform models

use parley_core::{Permissions, Snowflake};
use serde::{Deserialize, Serialize};

/// `GET /gateway`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub url: String,
}

/// Identify budget for a bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartLimit {
    pub total: u32,
    pub remaining: u32,
    /// Milliseconds
    pub reset_after: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u64,
}

fn default_max_concurrency() -> u64 {
    1
}

/// `GET /gateway/bot`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotGatewayInfo {
    pub url: String,
    /// Recommended shard count
    pub shards: u64,
    pub session_start_limit: SessionStartLimit,
}

/// Guild entry of `GET /users/@me/guilds`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialGuild {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner: bool,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Entry of a guild's ban list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ban {
    #[serde(default)]
    pub reason: Option<String>,
    pub user: parley_core::User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_gateway_payload() {
        let info: BotGatewayInfo = serde_json::from_value(serde_json::json!({
            "url": "wss://gateway.discord.gg",
            "shards": 9,
            "session_start_limit": {
                "total": 1000,
                "remaining": 999,
                "reset_after": 14_400_000,
                "max_concurrency": 1
            }
        }))
        .unwrap();
        assert_eq!(info.shards, 9);
        assert_eq!(info.session_start_limit.remaining, 999);
    }

    #[test]
    fn test_partial_guild_permissions() {
        let guild: PartialGuild = serde_json::from_value(serde_json::json!({
            "id": "1", "name": "g", "owner": true, "permissions": "8"
        }))
        .unwrap();
        assert!(guild.permissions.contains(Permissions::ADMINISTRATOR));
    }
}
