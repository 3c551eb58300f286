//! Scripted gateway for shard tests
//!
//! Every accepted connection gets Hello, then plays the next queued script.
//! Frames the client sends are recorded per connection and heartbeats are
//! acknowledged throughout. Once a script runs out the connection idles
//! until the client leaves.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::Uri;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Path served for `resume_gateway_url`
pub const RESUME_PATH: &str = "/resume/";

/// One step of a connection script
#[derive(Debug, Clone)]
pub enum Step {
    /// Read frames until one with this op arrives
    Expect(u8),
    Send(Value),
    /// Send a close frame and drop the connection
    Close(u16),
}

/// What the client sent on one connection
#[derive(Debug, Clone, Default)]
pub struct Connection {
    pub path: String,
    pub frames: Vec<Value>,
}

impl Connection {
    /// Frames other than heartbeats
    pub fn commands(&self) -> Vec<&Value> {
        self.frames.iter().filter(|frame| frame["op"] != 1).collect()
    }
}

#[derive(Clone, Default)]
struct GatewayState {
    scripts: Arc<Mutex<VecDeque<Vec<Step>>>>,
    connections: Arc<Mutex<Vec<Connection>>>,
}

pub struct ScriptedGateway {
    pub addr: SocketAddr,
    state: GatewayState,
    _handle: JoinHandle<()>,
}

impl ScriptedGateway {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let state = GatewayState::default();

        let app = Router::new()
            .route("/", get(accept))
            .route(RESUME_PATH, get(accept))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Queue the script for the next connection
    pub fn script(&self, steps: Vec<Step>) {
        self.state.scripts.lock().push_back(steps);
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn resume_url(&self) -> String {
        format!("ws://{}{}", self.addr, RESUME_PATH.trim_end_matches('/'))
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.state.connections.lock().clone()
    }
}

async fn accept(ws: WebSocketUpgrade, uri: Uri, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(move |socket| play(socket, state, uri.path().to_string()))
}

async fn play(mut socket: WebSocket, state: GatewayState, path: String) {
    let index = {
        let mut connections = state.connections.lock();
        connections.push(Connection {
            path,
            frames: Vec::new(),
        });
        connections.len() - 1
    };
    let script = state.scripts.lock().pop_front().unwrap_or_default();

    let hello = json!({"op": 10, "d": {"heartbeat_interval": 41250}, "s": null, "t": null});
    if socket.send(Message::Text(hello.to_string())).await.is_err() {
        return;
    }

    for step in script {
        let done = match step {
            Step::Send(frame) => socket.send(Message::Text(frame.to_string())).await.is_err(),
            Step::Expect(op) => loop {
                match next_frame(&mut socket, &state, index).await {
                    Some(frame) if frame["op"] == op => break false,
                    Some(_) => {}
                    None => break true,
                }
            },
            Step::Close(code) => {
                let frame = CloseFrame {
                    code,
                    reason: Cow::Borrowed("scripted close"),
                };
                socket.send(Message::Close(Some(frame))).await.ok();
                return;
            }
        };
        if done {
            return;
        }
    }

    while next_frame(&mut socket, &state, index).await.is_some() {}
}

/// Next JSON frame from the client, recorded; `None` once the client is gone
async fn next_frame(socket: &mut WebSocket, state: &GatewayState, index: usize) -> Option<Value> {
    loop {
        let text = match socket.recv().await? {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        };
        let Ok(frame) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        state.connections.lock()[index].frames.push(frame.clone());
        if frame["op"] == 1 {
            let ack = json!({"op": 11, "d": null, "s": null, "t": null});
            socket.send(Message::Text(ack.to_string())).await.ok()?;
        }
        return Some(frame);
    }
}
