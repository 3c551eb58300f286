//! Payload builders for the mock API and gateway

use serde_json::{json, Value};

pub const GUILD_ID: u64 = 10;
pub const CHANNEL_ID: u64 = 100;
pub const SELF_ID: u64 = 1;
pub const AUTHOR_ID: u64 = 2;

pub fn user(id: u64, username: &str, bot: bool) -> Value {
    json!({
        "id": id.to_string(),
        "username": username,
        "discriminator": "0",
        "bot": bot,
    })
}

/// `GET /users/@me` body
pub fn current_user(bot: bool) -> Value {
    let mut user = user(SELF_ID, "parley", bot);
    user["verified"] = json!(true);
    user
}

pub fn guild(id: u64) -> Value {
    json!({
        "id": id.to_string(),
        "name": format!("guild {id}"),
        "owner_id": AUTHOR_ID.to_string(),
        "member_count": 2,
        "roles": [{"id": id.to_string(), "name": "@everyone", "permissions": "3072"}],
        "channels": [{"id": CHANNEL_ID.to_string(), "type": 0, "name": "general"}],
        "members": [
            {"user": user(SELF_ID, "parley", false), "roles": []},
            {"user": user(AUTHOR_ID, "alice", false), "roles": []},
        ],
    })
}

/// READY for a shard; bots get their guilds as unavailable stubs
pub fn ready(bot: bool, shard: [u64; 2], guild_ids: &[u64]) -> Value {
    let guilds: Vec<Value> = guild_ids
        .iter()
        .map(|&id| {
            if bot {
                json!({"id": id.to_string(), "unavailable": true})
            } else {
                guild(id)
            }
        })
        .collect();
    json!({
        "v": 9,
        "user": current_user(bot),
        "session_id": format!("session-{}", shard[0]),
        "shard": shard,
        "guilds": guilds,
    })
}

pub fn message(id: u64, content: &str) -> Value {
    json!({
        "id": id.to_string(),
        "channel_id": CHANNEL_ID.to_string(),
        "guild_id": GUILD_ID.to_string(),
        "author": user(AUTHOR_ID, "alice", false),
        "content": content,
        "timestamp": "2024-01-01T00:00:00+00:00",
    })
}

/// A dispatch frame as the gateway sends it
pub fn dispatch(event: &str, seq: u64, data: Value) -> Value {
    json!({"op": 0, "t": event, "s": seq, "d": data})
}
