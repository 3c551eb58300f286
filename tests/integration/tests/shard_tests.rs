//! Shard reconnect tests
//!
//! A single shard runs against a scripted gateway; each test checks what the
//! shard sends on the connection that follows a disconnect.
//!
//! Run with: cargo test -p integration-tests --test shard_tests

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{eventually, fixtures, Connection, ScriptedGateway, Step, TOKEN};
use parley_gateway::shard::IdentifyQueue;
use parley_gateway::{
    CloseCode, GatewayError, GatewayResult, Shard, ShardConfig, ShardEvent, ShardMessenger, ShardStage,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// Invalid sessions wait up to 5 s before identifying again
const WAIT: Duration = Duration::from_secs(10);

struct Running {
    messenger: ShardMessenger,
    events: mpsc::UnboundedReceiver<ShardEvent>,
    runner: JoinHandle<GatewayResult<()>>,
}

fn spawn_shard(gateway: &ScriptedGateway) -> Running {
    let mut config = ShardConfig::new(TOKEN, true, gateway.url());
    config.reconnect_base = Duration::from_millis(10);
    let (tx, events) = mpsc::unbounded_channel();
    let identify = Arc::new(IdentifyQueue::with_interval(1, Duration::ZERO));
    let (shard, messenger) = Shard::new(config, tx, identify);
    Running {
        messenger,
        events,
        runner: tokio::spawn(shard.run()),
    }
}

impl Running {
    async fn stop(self) -> Vec<ShardEvent> {
        let Self {
            messenger,
            mut events,
            runner,
        } = self;
        messenger.shutdown().unwrap();
        tokio::time::timeout(WAIT, runner)
            .await
            .expect("shard did not stop")
            .unwrap()
            .unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        seen
    }
}

fn ready(gateway: &ScriptedGateway, seq: u64) -> Value {
    let mut data = fixtures::ready(true, [0, 1], &[]);
    data["resume_gateway_url"] = json!(gateway.resume_url());
    fixtures::dispatch("READY", seq, data)
}

fn op(op: u8, d: Value) -> Value {
    json!({"op": op, "d": d, "s": null, "t": null})
}

async fn second_connection(gateway: &ScriptedGateway, op: u8) -> Connection {
    assert!(
        eventually(WAIT, || {
            gateway
                .connections()
                .get(1)
                .is_some_and(|conn| conn.commands().iter().any(|frame| frame["op"] == op))
        })
        .await,
        "no op {op} on the second connection"
    );
    gateway.connections().remove(1)
}

#[tokio::test]
async fn test_reconnect_request_resumes() {
    let gateway = ScriptedGateway::start().await.unwrap();
    gateway.script(vec![
        Step::Expect(2),
        Step::Send(ready(&gateway, 1)),
        Step::Send(fixtures::dispatch("MESSAGE_CREATE", 2, fixtures::message(500, "hi"))),
        Step::Send(op(7, Value::Null)),
    ]);
    gateway.script(vec![
        Step::Expect(6),
        Step::Send(fixtures::dispatch("RESUMED", 3, json!({}))),
    ]);
    let shard = spawn_shard(&gateway);

    let resumed = second_connection(&gateway, 6).await;
    let resume = resumed.commands()[0].clone();
    assert_eq!(resume["op"], 6);
    assert_eq!(resume["d"]["token"], TOKEN);
    assert_eq!(resume["d"]["session_id"], "session-0");
    assert_eq!(resume["d"]["seq"], 2);
    assert_eq!(resumed.path, integration_tests::gateway::RESUME_PATH);

    assert!(eventually(WAIT, || shard.messenger.stage() == ShardStage::Connected).await);
    let events = shard.stop().await;
    assert!(events.iter().any(|event| matches!(event, ShardEvent::Resumed { .. })));
}

#[tokio::test]
async fn test_resumable_invalid_session_resumes() {
    let gateway = ScriptedGateway::start().await.unwrap();
    gateway.script(vec![
        Step::Expect(2),
        Step::Send(ready(&gateway, 1)),
        Step::Send(op(9, json!(true))),
    ]);
    gateway.script(vec![Step::Expect(6)]);
    let shard = spawn_shard(&gateway);

    let resumed = second_connection(&gateway, 6).await;
    let resume = resumed.commands()[0].clone();
    assert_eq!(resume["d"]["session_id"], "session-0");
    assert_eq!(resume["d"]["seq"], 1);

    shard.stop().await;
}

#[tokio::test]
async fn test_invalid_session_identifies_again() {
    let gateway = ScriptedGateway::start().await.unwrap();
    gateway.script(vec![
        Step::Expect(2),
        Step::Send(ready(&gateway, 1)),
        Step::Send(op(9, json!(false))),
    ]);
    gateway.script(vec![Step::Expect(2)]);
    let shard = spawn_shard(&gateway);

    let next = second_connection(&gateway, 2).await;
    assert_eq!(next.commands()[0]["op"], 2);
    assert!(next.commands().iter().all(|frame| frame["op"] != 6));
    // A cleared session connects to the default URL
    assert_eq!(next.path, "/");

    shard.stop().await;
}

#[tokio::test]
async fn test_session_invalidating_close_identifies_again() {
    let gateway = ScriptedGateway::start().await.unwrap();
    gateway.script(vec![
        Step::Expect(2),
        Step::Send(ready(&gateway, 1)),
        Step::Send(fixtures::dispatch("MESSAGE_CREATE", 2, fixtures::message(500, "hi"))),
        Step::Close(4009),
    ]);
    gateway.script(vec![Step::Expect(2)]);
    let shard = spawn_shard(&gateway);

    let next = second_connection(&gateway, 2).await;
    assert_eq!(next.commands()[0]["op"], 2);
    assert_eq!(next.path, "/");

    let events = shard.stop().await;
    assert!(events.iter().any(|event| matches!(
        event,
        ShardEvent::Disconnected {
            code: Some(4009),
            reconnecting: true,
            ..
        }
    )));
}

#[tokio::test]
async fn test_dropped_connection_resumes() {
    let gateway = ScriptedGateway::start().await.unwrap();
    gateway.script(vec![
        Step::Expect(2),
        Step::Send(ready(&gateway, 1)),
        Step::Send(fixtures::dispatch("MESSAGE_CREATE", 5, fixtures::message(500, "hi"))),
        Step::Close(4000),
    ]);
    gateway.script(vec![Step::Expect(6)]);
    let shard = spawn_shard(&gateway);

    let resumed = second_connection(&gateway, 6).await;
    assert_eq!(resumed.commands()[0]["d"]["seq"], 5);

    shard.stop().await;
}

#[tokio::test]
async fn test_fatal_close_stops_shard() {
    let gateway = ScriptedGateway::start().await.unwrap();
    gateway.script(vec![Step::Expect(2), Step::Close(4004)]);
    let shard = spawn_shard(&gateway);

    let result = tokio::time::timeout(WAIT, shard.runner)
        .await
        .expect("shard did not stop")
        .unwrap();
    match result {
        Err(GatewayError::Closed { shard_id, code }) => {
            assert_eq!(shard_id, 0);
            assert_eq!(code, CloseCode::AuthenticationFailed);
        }
        other => panic!("expected a fatal close, got {other:?}"),
    }
    assert_eq!(gateway.connections().len(), 1);
}
