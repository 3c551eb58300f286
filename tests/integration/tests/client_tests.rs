//! Client integration tests
//!
//! Each test starts a mock API and gateway on loopback and drives the real
//! client against it.
//!
//! Run with: cargo test -p integration-tests --test client_tests

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{eventually, fixtures, MockOptions, MockServer, TOKEN};
use parking_lot::Mutex;
use parley_client::{async_trait, Client, ClientError, Context, EventHandler};
use parley_commands::{Args, Bot, Command, CommandContext};
use parley_core::{Message, Snowflake};
use parley_http::Http;
use reqwest::StatusCode;
use serde_json::json;
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_secs(5);

fn spawn_client(client: &Arc<Client>, autoshard: bool) -> JoinHandle<Result<(), ClientError>> {
    let client = Arc::clone(client);
    tokio::spawn(async move {
        if autoshard {
            client.start_autosharded().await
        } else {
            client.start().await
        }
    })
}

async fn ready(client: &Client) {
    tokio::time::timeout(WAIT, client.wait_until_ready())
        .await
        .expect("client did not become ready")
        .unwrap();
}

async fn shut_down(client: &Client, runner: JoinHandle<Result<(), ClientError>>) {
    client.close();
    tokio::time::timeout(WAIT, runner)
        .await
        .expect("client did not stop")
        .unwrap()
        .unwrap();
}

// ============================================================================
// Mock API Tests
// ============================================================================

#[tokio::test]
async fn test_mock_requires_authorization() {
    let server = MockServer::start(MockOptions::user()).await.unwrap();

    let response = server.get("/users/@me", None).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server.get("/users/@me", Some(TOKEN)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["id"], "1");
}

// ============================================================================
// REST Tests
// ============================================================================

#[tokio::test]
async fn test_rejected_token() {
    let server = MockServer::start(MockOptions::bot()).await.unwrap();
    // Bot tokens are sent with the `Bot` scheme; a user client sends it bare
    let client = Client::builder(server.config(false)).build().unwrap();

    let err = client.start().await.unwrap_err();
    assert!(err.is_unauthorized(), "{err}");
    assert!(server.recorded().identifies.is_empty());
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let options = MockOptions {
        rate_limit_user_lookups: 1,
        ..MockOptions::bot()
    };
    let server = MockServer::start(options).await.unwrap();
    let config = server.config(true);
    let http = Http::new(&config.token, true, config.http.clone()).unwrap();

    let user = http.get_user(Snowflake::new(2)).await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(server.recorded().user_lookups, 2);
}

// ============================================================================
// Gateway Tests
// ============================================================================

#[derive(Default, Clone)]
struct Recorder {
    ready: Arc<Mutex<u32>>,
    messages: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl EventHandler for Recorder {
    async fn on_ready(&self, _ctx: Context) {
        *self.ready.lock() += 1;
    }

    async fn on_message(&self, _ctx: Context, message: Message) {
        self.messages.lock().push(message.content);
    }
}

#[tokio::test]
async fn test_user_account_session() {
    let options = MockOptions {
        after_ready: vec![("MESSAGE_CREATE".into(), fixtures::message(500, "hello"))],
        ..MockOptions::user()
    };
    let server = MockServer::start(options).await.unwrap();
    let recorder = Recorder::default();
    let client = Arc::new(
        Client::builder(server.config(false))
            .event_handler(recorder.clone())
            .build()
            .unwrap(),
    );
    let runner = spawn_client(&client, false);

    ready(&client).await;
    assert_eq!(client.user().map(|u| u.user.id), Some(Snowflake::new(fixtures::SELF_ID)));
    let cache = client.cache();
    assert!(cache.guild(Snowflake::new(fixtures::GUILD_ID)).is_some());
    assert!(eventually(WAIT, || recorder.messages.lock().len() == 1).await);
    assert!(cache.message(Snowflake::new(500)).is_some());
    assert!(eventually(WAIT, || *recorder.ready.lock() == 1).await);

    // User accounts identify with a bare token and no shard
    let identify = server.recorded().identifies.remove(0);
    assert_eq!(identify["token"], TOKEN);
    assert!(identify.get("shard").map_or(true, serde_json::Value::is_null));

    shut_down(&client, runner).await;
    assert!(client.is_closed());
}

#[tokio::test]
async fn test_heartbeat_request_is_acknowledged() {
    let server = MockServer::start(MockOptions::user()).await.unwrap();
    let client = Arc::new(Client::builder(server.config(false)).build().unwrap());
    let runner = spawn_client(&client, false);

    ready(&client).await;
    assert!(eventually(WAIT, || client.latency().is_some()).await);
    assert!(server.recorded().heartbeats >= 1);
    assert_eq!(client.latencies().len(), 1);

    shut_down(&client, runner).await;
}

#[tokio::test]
async fn test_bot_waits_for_guilds() {
    let server = MockServer::start(MockOptions::bot()).await.unwrap();
    let recorder = Recorder::default();
    let client = Arc::new(
        Client::builder(server.config(true))
            .event_handler(recorder.clone())
            .build()
            .unwrap(),
    );
    let runner = spawn_client(&client, false);

    ready(&client).await;
    let guild = client.cache().guild(Snowflake::new(fixtures::GUILD_ID)).unwrap();
    assert!(!guild.unavailable);
    assert_eq!(guild.members.len(), 2);
    assert!(eventually(WAIT, || *recorder.ready.lock() == 1).await);

    let identify = server.recorded().identifies.remove(0);
    assert_eq!(identify["token"], TOKEN);
    assert_eq!(identify["shard"], json!([0, 1]));

    shut_down(&client, runner).await;
}

#[tokio::test]
async fn test_autosharded_ready() {
    // Guild 1 << 22 routes to shard 1 of 2
    let options = MockOptions {
        shards: 2,
        max_concurrency: 2,
        guilds: vec![fixtures::GUILD_ID, 1 << 22],
        ..MockOptions::bot()
    };
    let server = MockServer::start(options).await.unwrap();
    let client = Arc::new(Client::builder(server.config(true)).build().unwrap());
    let runner = spawn_client(&client, true);

    ready(&client).await;
    let sharded = client.sharded_cache().unwrap();
    assert_eq!(sharded.shard_count(), 2);
    assert_eq!(sharded.ready_shards(), vec![0, 1]);
    assert_eq!(sharded.guilds_for_shard(0).len(), 1);
    assert_eq!(sharded.guilds_for_shard(1).len(), 1);

    let mut shards: Vec<_> = server
        .recorded()
        .identifies
        .iter()
        .map(|identify| identify["shard"].clone())
        .collect();
    shards.sort_by_key(|shard| shard[0].as_u64());
    assert_eq!(shards, vec![json!([0, 2]), json!([1, 2])]);

    shut_down(&client, runner).await;
}

// ============================================================================
// Command Tests
// ============================================================================

#[tokio::test]
async fn test_bot_replies_to_command() {
    let options = MockOptions {
        after_ready: vec![
            ("MESSAGE_CREATE".into(), fixtures::message(500, "!ping")),
            ("MESSAGE_CREATE".into(), fixtures::message(501, "!echo \"two words\" rest")),
        ],
        ..MockOptions::bot()
    };
    let server = MockServer::start(options).await.unwrap();

    let bot = Bot::builder("!")
        .command(Command::new("ping", |ctx: CommandContext, _args: Args| async move {
            ctx.reply("pong").await?;
            Ok(())
        }))
        .command(Command::new("echo", |ctx: CommandContext, mut args: Args| async move {
            let first: String = args.single("first")?;
            ctx.send(format!("{first}|{}", args.rest("rest")?)).await?;
            Ok(())
        }))
        .build();
    let client = Arc::new(Client::builder(server.config(true)).event_handler(bot).build().unwrap());
    let runner = spawn_client(&client, false);

    assert!(eventually(WAIT, || server.recorded().sent_messages.len() == 2).await);
    let mut sent = server.recorded().sent_messages;
    sent.sort_by_key(|body| body["content"].as_str().map(str::to_owned));

    assert_eq!(sent[0]["content"], "pong");
    assert_eq!(sent[0]["message_reference"]["message_id"], "500");
    assert_eq!(sent[1]["content"], "two words|rest");
    assert!(sent[1].get("message_reference").is_none());

    shut_down(&client, runner).await;
}
