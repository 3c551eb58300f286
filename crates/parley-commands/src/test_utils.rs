//! Shared fixtures for unit tests

use parley_client::{ConnectionState, Context};
use parley_common::{ClientConfig, HttpConfig};
use parley_core::{Message, Snowflake};
use parley_gateway::shard::IdentifyQueue;
use parley_gateway::{Shard, ShardConfig};
use parley_http::Http;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::converters::ConvertContext;

pub(crate) const GUILD: u64 = 10;
pub(crate) const ME: u64 = 1;
pub(crate) const ALICE: u64 = 2;
pub(crate) const BOB: u64 = 3;

fn user(id: u64, name: &str) -> Value {
    json!({"id": id.to_string(), "username": name, "discriminator": "0"})
}

/// A ready user-account cache with one guild
///
/// Alice owns nothing but holds the `mod` role (manage messages); Bob has
/// no roles.
pub(crate) fn cache() -> Arc<ConnectionState> {
    let state = ConnectionState::new(&ClientConfig::new("token"));
    state
        .parse_ready(0, json!({"user": user(ME, "me"), "session_id": "s"}))
        .unwrap();
    state
        .parse_guild_create(0, json!({
            "id": GUILD.to_string(),
            "name": "guild",
            "owner_id": ME.to_string(),
            "roles": [
                {"id": GUILD.to_string(), "name": "@everyone", "permissions": "3072"},
                {"id": "20", "name": "mod", "permissions": "8192"},
            ],
            "channels": [
                {"id": "100", "type": 0, "name": "general"},
                {"id": "101", "type": 0, "name": "random"},
            ],
            "members": [
                {"user": user(ME, "me"), "roles": []},
                {"user": user(ALICE, "alice"), "nick": "Al", "roles": ["20"]},
                {"user": user(BOB, "bob"), "roles": []},
            ],
        }))
        .unwrap();
    Arc::new(state)
}

pub(crate) fn convert_context(in_guild: bool) -> ConvertContext {
    ConvertContext {
        cache: cache(),
        guild_id: in_guild.then_some(Snowflake::new(GUILD)),
        channel_id: Snowflake::new(100),
    }
}

/// Client context over a shard that never connects
pub(crate) fn context(cache: Arc<ConnectionState>) -> (Context, Shard) {
    let (events, _) = tokio::sync::mpsc::unbounded_channel();
    let (shard, messenger) = Shard::new(
        ShardConfig::new("token", false, "ws://127.0.0.1:9"),
        events,
        Arc::new(IdentifyQueue::default()),
    );
    let http = Http::new("token", false, HttpConfig::default()).unwrap();
    (Context::new(http, cache, messenger), shard)
}

/// A message from `author` in the guild's general channel, or a DM
pub(crate) fn message(content: &str, author: u64, in_guild: bool) -> Message {
    let name = match author {
        ME => "me",
        ALICE => "alice",
        BOB => "bob",
        _ => "someone",
    };
    let mut data = json!({
        "id": "500",
        "channel_id": if in_guild { "100" } else { "200" },
        "author": user(author, name),
        "content": content,
        "timestamp": "2024-01-01T00:00:00+00:00",
    });
    if in_guild {
        data["guild_id"] = json!(GUILD.to_string());
    }
    serde_json::from_value(data).unwrap()
}

pub(crate) fn bot_message(content: &str) -> Message {
    let mut message = message(content, 99, true);
    message.author.bot = true;
    message
}
