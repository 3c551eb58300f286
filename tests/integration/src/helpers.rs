//! Mock platform for integration tests
//!
//! One axum server plays both sides a client talks to: the REST API under
//! `/api/v9` and the gateway websocket at `/`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use parley_common::ClientConfig;
use parley_core::Snowflake;
use parley_gateway::shard_for_guild;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::fixtures;

pub const TOKEN: &str = "test-token";

/// What the mock serves
#[derive(Debug, Clone)]
pub struct MockOptions {
    pub bot: bool,
    /// Recommended shard count from `GET /gateway/bot`
    pub shards: u64,
    pub max_concurrency: u64,
    pub guilds: Vec<u64>,
    /// Dispatches sent on shard 0 after its guilds
    pub after_ready: Vec<(String, Value)>,
    /// `GET /users/{id}` answers 429 this many times first
    pub rate_limit_user_lookups: u32,
}

impl MockOptions {
    pub fn user() -> Self {
        Self {
            bot: false,
            shards: 1,
            max_concurrency: 1,
            guilds: vec![fixtures::GUILD_ID],
            after_ready: Vec::new(),
            rate_limit_user_lookups: 0,
        }
    }

    pub fn bot() -> Self {
        Self {
            bot: true,
            ..Self::user()
        }
    }

    fn authorization(&self) -> String {
        if self.bot {
            format!("Bot {TOKEN}")
        } else {
            TOKEN.to_string()
        }
    }
}

/// Requests and frames the mock has seen
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub identifies: Vec<Value>,
    pub heartbeats: u32,
    pub sent_messages: Vec<Value>,
    pub user_lookups: u32,
}

#[derive(Clone)]
struct MockState {
    options: Arc<MockOptions>,
    ws_url: String,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockState {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == self.options.authorization())
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "401: Unauthorized", "code": 0})),
    )
        .into_response()
}

/// Mock server instance that manages lifecycle
pub struct MockServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    recorded: Arc<Mutex<Recorded>>,
    _handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(options: MockOptions) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let state = MockState {
            options: Arc::new(options),
            ws_url: format!("ws://{addr}"),
            recorded: Arc::clone(&recorded),
        };

        let app = Router::new()
            .route("/", get(gateway))
            .route("/api/v9/users/@me", get(current_user))
            .route("/api/v9/users/:user_id", get(get_user))
            .route("/api/v9/gateway", get(gateway_info))
            .route("/api/v9/gateway/bot", get(gateway_info))
            .route("/api/v9/channels/:channel_id/messages", post(create_message))
            .with_state(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            addr,
            client,
            recorded,
            _handle: handle,
        })
    }

    pub fn api_base(&self) -> String {
        format!("http://{}/api/v9", self.addr)
    }

    /// Client configuration pointed at this server
    pub fn config(&self, bot: bool) -> ClientConfig {
        ClientConfig::new(TOKEN)
            .with_bot(bot)
            .with_api_base(self.api_base())
            .with_guild_ready_timeout(Duration::from_millis(100))
    }

    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().clone()
    }

    /// Make a GET request against the mock API
    pub async fn get(&self, path: &str, authorization: Option<&str>) -> Result<reqwest::Response> {
        let mut request = self.client.get(format!("{}{path}", self.api_base()));
        if let Some(authorization) = authorization {
            request = request.header("Authorization", authorization);
        }
        Ok(request.send().await?)
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ============================================================================
// REST handlers
// ============================================================================

async fn current_user(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(fixtures::current_user(state.options.bot)).into_response()
}

async fn get_user(State(state): State<MockState>, Path(user_id): Path<u64>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let lookups = {
        let mut recorded = state.recorded.lock();
        recorded.user_lookups += 1;
        recorded.user_lookups
    };
    if lookups <= state.options.rate_limit_user_lookups {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"message": "You are being rate limited.", "retry_after": 0.05, "global": false})),
        )
            .into_response();
    }
    Json(fixtures::user(user_id, "alice", false)).into_response()
}

async fn gateway_info(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "url": state.ws_url,
        "shards": state.options.shards,
        "session_start_limit": {
            "total": 1000,
            "remaining": 999,
            "reset_after": 0,
            "max_concurrency": state.options.max_concurrency,
        },
    }))
    .into_response()
}

async fn create_message(
    State(state): State<MockState>,
    Path(channel_id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let id = {
        let mut recorded = state.recorded.lock();
        recorded.sent_messages.push(body.clone());
        900 + recorded.sent_messages.len() as u64
    };
    let mut message = fixtures::message(id, body["content"].as_str().unwrap_or_default());
    message["channel_id"] = json!(channel_id.to_string());
    message["author"] = fixtures::current_user(state.options.bot);
    Json(message).into_response()
}

// ============================================================================
// Gateway
// ============================================================================

async fn gateway(ws: WebSocketUpgrade, State(state): State<MockState>) -> Response {
    ws.on_upgrade(move |socket| session(socket, state))
}

fn frame(op: u8, d: Value) -> Value {
    json!({"op": op, "d": d, "s": null, "t": null})
}

async fn send_json(socket: &mut WebSocket, value: &Value) -> Result<()> {
    socket.send(Message::Text(value.to_string())).await?;
    Ok(())
}

async fn session(mut socket: WebSocket, state: MockState) {
    if send_json(&mut socket, &frame(10, json!({"heartbeat_interval": 41250})))
        .await
        .is_err()
    {
        return;
    }

    while let Some(Ok(message)) = socket.recv().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(payload) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let result = match payload["op"].as_u64() {
            Some(2) => identified(&mut socket, &state, payload["d"].clone()).await,
            Some(1) => {
                state.recorded.lock().heartbeats += 1;
                send_json(&mut socket, &frame(11, Value::Null)).await
            }
            _ => Ok(()),
        };
        if result.is_err() {
            break;
        }
    }
}

/// READY, the shard's guilds, scripted events, then a heartbeat request
async fn identified(socket: &mut WebSocket, state: &MockState, identify: Value) -> Result<()> {
    let shard = match identify["shard"].as_array().map(Vec::as_slice) {
        Some([id, count]) => [id.as_u64().unwrap_or(0), count.as_u64().unwrap_or(1)],
        _ => [0, 1],
    };
    state.recorded.lock().identifies.push(identify);

    let options = &state.options;
    let guilds: Vec<u64> = options
        .guilds
        .iter()
        .copied()
        .filter(|&id| shard_for_guild(Snowflake::new(id), shard[1]) == shard[0])
        .collect();

    let mut seq = 1;
    send_json(socket, &fixtures::dispatch("READY", seq, fixtures::ready(options.bot, shard, &guilds))).await?;
    if options.bot {
        for &id in &guilds {
            seq += 1;
            send_json(socket, &fixtures::dispatch("GUILD_CREATE", seq, fixtures::guild(id))).await?;
        }
    }
    if shard[0] == 0 {
        for (event, data) in &options.after_ready {
            seq += 1;
            send_json(socket, &fixtures::dispatch(event, seq, data.clone())).await?;
        }
    }
    send_json(socket, &frame(1, Value::Null)).await
}
