//! The shard connection loop
//!
//! A [`Shard`] owns one WebSocket connection at a time. It connects, waits for
//! Hello, identifies or resumes, then runs a single select loop over the
//! heartbeat timer, incoming frames and [`ShardCommand`]s. When the connection
//! drops it decides from the close code whether to resume, re-identify or stop.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use parley_common::{ClientConfig, ExponentialBackoff, SuperProperties};
use parley_core::Intents;
use rand::Rng;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, trace, warn};

use super::heartbeat::{Beat, Heartbeater};
use super::identify::IdentifyQueue;
use super::messenger::{ShardCommand, ShardMessenger, ShardStage, ShardStatus};
use super::session::{gateway_url, SessionState};
use crate::error::{GatewayError, GatewayResult};
use crate::events::GatewayEventType;
use crate::protocol::{
    CloseCode, GatewayMessage, HelloPayload, IdentifyPayload, OpCode, PresenceUpdatePayload,
    ResumePayload,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Frames a shard may send per minute, heartbeats excluded
const SEND_LIMIT: NonZeroU32 = NonZeroU32::MIN.saturating_add(109);

const DEFAULT_HELLO_TIMEOUT: Duration = Duration::from_secs(30);

/// Close code for connections we intend to resume
const RESUME_CLOSE: u16 = 4000;
const NORMAL_CLOSE: u16 = 1000;

/// Settings of one shard
#[derive(Debug, Clone)]
pub struct ShardConfig {
    pub token: String,
    pub bot: bool,
    pub shard_id: u64,
    pub shard_count: u64,
    pub gateway_url: String,
    pub version: u8,
    pub intents: Intents,
    pub large_threshold: u16,
    pub properties: SuperProperties,
    /// Presence sent with Identify
    pub presence: Option<PresenceUpdatePayload>,
    pub hello_timeout: Duration,
    /// Base of the reconnect backoff
    pub reconnect_base: Duration,
}

impl ShardConfig {
    pub fn new(token: impl Into<String>, bot: bool, gateway_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            bot,
            shard_id: 0,
            shard_count: 1,
            gateway_url: gateway_url.into(),
            version: 9,
            intents: Intents::default(),
            large_threshold: 250,
            properties: SuperProperties::default(),
            presence: None,
            hello_timeout: DEFAULT_HELLO_TIMEOUT,
            reconnect_base: Duration::from_secs(1),
        }
    }

    /// Settings taken from the client configuration
    pub fn from_client(config: &ClientConfig, gateway_url: impl Into<String>) -> Self {
        Self {
            version: config.gateway.version,
            intents: config.gateway.intents,
            large_threshold: config.gateway.large_threshold,
            properties: config.http.properties.clone(),
            ..Self::new(config.token.clone(), config.bot, gateway_url)
        }
    }

    #[must_use]
    pub fn shard(mut self, shard_id: u64, shard_count: u64) -> Self {
        self.shard_id = shard_id;
        self.shard_count = shard_count;
        self
    }

    #[must_use]
    pub fn presence(mut self, presence: PresenceUpdatePayload) -> Self {
        self.presence = Some(presence);
        self
    }

    fn identify_payload(&self) -> IdentifyPayload {
        let mut payload = if self.bot {
            IdentifyPayload::bot(
                self.token.clone(),
                self.intents,
                [self.shard_id, self.shard_count],
                self.large_threshold,
            )
        } else {
            IdentifyPayload::user(self.token.clone(), &self.properties)
        };
        if let Some(presence) = &self.presence {
            payload.presence = Some(presence.clone());
        }
        payload
    }
}

/// What a shard reports to its consumer
#[derive(Debug, Clone)]
pub enum ShardEvent {
    /// Hello received on a fresh connection
    Connected { shard_id: u64 },
    Dispatch {
        shard_id: u64,
        event: GatewayEventType,
        seq: u64,
        data: Value,
    },
    /// Missed events have been replayed
    Resumed { shard_id: u64 },
    Disconnected {
        shard_id: u64,
        code: Option<u16>,
        reconnecting: bool,
    },
}

impl ShardEvent {
    pub fn shard_id(&self) -> u64 {
        match self {
            Self::Connected { shard_id }
            | Self::Dispatch { shard_id, .. }
            | Self::Resumed { shard_id }
            | Self::Disconnected { shard_id, .. } => *shard_id,
        }
    }
}

/// Reaction to a close code received from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Reconnecting cannot help
    Fatal(CloseCode),
    /// Reconnect with a fresh Identify
    Reidentify,
    /// Reconnect and resume when possible
    Resume,
}

pub fn close_action(code: u16) -> CloseAction {
    match CloseCode::from_u16(code) {
        Some(code) if !code.can_reconnect() => CloseAction::Fatal(code),
        Some(code) if code.invalidates_session() => CloseAction::Reidentify,
        _ => CloseAction::Resume,
    }
}

/// Why a connection ended
#[derive(Debug)]
enum Exit {
    Shutdown,
    Reconnect { code: Option<u16>, backoff: bool },
    /// Invalid session that cannot be resumed
    Reidentify,
}

enum Frame {
    Message(GatewayMessage),
    Close(Option<u16>),
    Ignored,
    End,
}

pub struct Shard {
    config: ShardConfig,
    session: SessionState,
    status: Arc<ShardStatus>,
    events: mpsc::UnboundedSender<ShardEvent>,
    commands: mpsc::UnboundedReceiver<ShardCommand>,
    identify: Arc<IdentifyQueue>,
    limiter: DefaultDirectRateLimiter,
    backoff: ExponentialBackoff,
}

impl Shard {
    pub fn new(
        config: ShardConfig,
        events: mpsc::UnboundedSender<ShardEvent>,
        identify: Arc<IdentifyQueue>,
    ) -> (Self, ShardMessenger) {
        let (tx, rx) = mpsc::unbounded_channel();
        let status = Arc::new(ShardStatus::default());
        let messenger = ShardMessenger::new(config.shard_id, tx, Arc::clone(&status));
        let backoff = ExponentialBackoff::new(config.reconnect_base, 10, false);

        let shard = Self {
            config,
            session: SessionState::default(),
            status,
            events,
            commands: rx,
            identify,
            limiter: RateLimiter::direct(Quota::per_minute(SEND_LIMIT)),
            backoff,
        };
        (shard, messenger)
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.config.shard_id
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    fn emit(&self, event: ShardEvent) {
        if self.events.send(event).is_err() {
            trace!(shard_id = self.id(), "event receiver dropped");
        }
    }

    /// Run until shut down or closed with a fatal code
    #[instrument(skip(self), fields(shard_id = self.config.shard_id))]
    pub async fn run(mut self) -> GatewayResult<()> {
        loop {
            self.status.set_stage(ShardStage::Connecting);

            let delay = match self.connect_and_run().await {
                Ok(Exit::Shutdown) => {
                    info!("shard shut down");
                    self.status.set_stage(ShardStage::Closed);
                    self.emit(ShardEvent::Disconnected {
                        shard_id: self.id(),
                        code: Some(NORMAL_CLOSE),
                        reconnecting: false,
                    });
                    return Ok(());
                }
                Ok(Exit::Reconnect { code, backoff }) => {
                    info!(?code, "connection closed, reconnecting");
                    self.disconnected(code);
                    if backoff {
                        self.backoff.delay()
                    } else {
                        Duration::ZERO
                    }
                }
                Ok(Exit::Reidentify) => {
                    self.disconnected(None);
                    Duration::from_millis(rand::thread_rng().gen_range(1_000..=5_000))
                }
                Err(err) if err.is_fatal() => {
                    warn!(error = %err, "shard stopped");
                    self.status.set_stage(ShardStage::Closed);
                    self.emit(ShardEvent::Disconnected {
                        shard_id: self.id(),
                        code: err.close_code().map(CloseCode::as_u16),
                        reconnecting: false,
                    });
                    return Err(err);
                }
                Err(err) => {
                    warn!(error = %err, "connection failed, reconnecting");
                    self.disconnected(None);
                    self.backoff.delay()
                }
            };

            if !self.pause(delay).await {
                info!("shard shut down while reconnecting");
                self.status.set_stage(ShardStage::Closed);
                return Ok(());
            }
        }
    }

    fn disconnected(&self, code: Option<u16>) {
        self.status.set_stage(ShardStage::Reconnecting);
        self.status.set_latency(None);
        self.emit(ShardEvent::Disconnected {
            shard_id: self.id(),
            code,
            reconnecting: true,
        });
    }

    /// Sleep before reconnecting; false if a shutdown arrived meanwhile
    async fn pause(&mut self, delay: Duration) -> bool {
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnect");
        }
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => return true,
                command = self.commands.recv() => match command {
                    Some(ShardCommand::Shutdown) | None => return false,
                    Some(ShardCommand::Reconnect) => {}
                    Some(ShardCommand::Send(message)) => {
                        debug!(op = %message.op, "dropping frame sent while disconnected");
                    }
                },
            }
        }
    }

    async fn connect_and_run(&mut self) -> GatewayResult<Exit> {
        let url = gateway_url(
            self.session.connect_url(&self.config.gateway_url),
            self.config.version,
        );
        debug!(%url, "connecting");

        let (ws, _) = connect_async(url.as_str()).await?;
        let (mut sink, mut stream) = ws.split();

        let hello = match tokio::time::timeout(self.config.hello_timeout, read_hello(&mut stream, self.config.shard_id)).await {
            Ok(hello) => hello?,
            Err(_) => return Err(GatewayError::HelloTimeout(self.config.hello_timeout)),
        };
        let mut heartbeater = Heartbeater::new(Duration::from_millis(hello.heartbeat_interval));
        debug!(interval_ms = hello.heartbeat_interval, "received hello");
        self.emit(ShardEvent::Connected { shard_id: self.id() });

        if self.session.is_resumable() {
            self.resume(&mut sink).await?;
        } else {
            self.identify(&mut sink).await?;
        }

        let mut beat = tokio::time::interval_at(
            Instant::now() + heartbeater.first_delay(),
            heartbeater.interval(),
        );
        beat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = beat.tick() => match heartbeater.due() {
                    Beat::Send => self.heartbeat(&mut sink, &mut heartbeater).await?,
                    Beat::Zombie => {
                        warn!("heartbeat not acknowledged, reconnecting");
                        close(&mut sink, RESUME_CLOSE, "zombie connection").await;
                        return Ok(Exit::Reconnect { code: Some(RESUME_CLOSE), backoff: false });
                    }
                },
                frame = stream.next() => match read_frame(frame)? {
                    Frame::Message(message) => {
                        if let Some(exit) = self.handle(message, &mut sink, &mut heartbeater).await? {
                            return Ok(exit);
                        }
                    }
                    Frame::Close(code) => return self.closed(code),
                    Frame::End => return Ok(Exit::Reconnect { code: None, backoff: true }),
                    Frame::Ignored => {}
                },
                command = self.commands.recv() => match command {
                    Some(ShardCommand::Send(message)) => {
                        self.limiter.until_ready().await;
                        send(&mut sink, &message).await?;
                    }
                    Some(ShardCommand::Reconnect) => {
                        close(&mut sink, RESUME_CLOSE, "reconnect requested").await;
                        return Ok(Exit::Reconnect { code: None, backoff: false });
                    }
                    Some(ShardCommand::Shutdown) | None => {
                        close(&mut sink, NORMAL_CLOSE, "shutdown").await;
                        return Ok(Exit::Shutdown);
                    }
                },
            }
        }
    }

    async fn identify(&mut self, sink: &mut WsSink) -> GatewayResult<()> {
        self.status.set_stage(ShardStage::Identifying);
        self.session.clear();
        self.identify.wait(self.id()).await;

        let frame = GatewayMessage::identify(&self.config.identify_payload())?;
        self.limiter.until_ready().await;
        send(sink, &frame).await?;
        info!(bot = self.config.bot, "sent identify");
        Ok(())
    }

    async fn resume(&mut self, sink: &mut WsSink) -> GatewayResult<()> {
        let (Some(session_id), Some(seq)) = (self.session.session_id.clone(), self.session.sequence) else {
            return self.identify(sink).await;
        };
        self.status.set_stage(ShardStage::Resuming);

        let frame = GatewayMessage::resume(&ResumePayload {
            token: self.config.token.clone(),
            session_id,
            seq,
        })?;
        self.limiter.until_ready().await;
        send(sink, &frame).await?;
        info!(seq, "sent resume");
        Ok(())
    }

    async fn heartbeat(&mut self, sink: &mut WsSink, heartbeater: &mut Heartbeater) -> GatewayResult<()> {
        send(sink, &GatewayMessage::heartbeat(self.session.sequence)).await?;
        heartbeater.sent(Instant::now());
        trace!(seq = ?self.session.sequence, "sent heartbeat");
        Ok(())
    }

    async fn handle(
        &mut self,
        message: GatewayMessage,
        sink: &mut WsSink,
        heartbeater: &mut Heartbeater,
    ) -> GatewayResult<Option<Exit>> {
        match message.op {
            OpCode::Dispatch => self.dispatch(message),
            OpCode::Heartbeat => self.heartbeat(sink, heartbeater).await?,
            OpCode::HeartbeatAck => {
                heartbeater.acked(Instant::now());
                self.status.set_latency(heartbeater.latency());
            }
            OpCode::Reconnect => {
                info!("server requested reconnect");
                close(sink, RESUME_CLOSE, "reconnect requested").await;
                return Ok(Some(Exit::Reconnect { code: None, backoff: false }));
            }
            OpCode::InvalidSession => {
                let resumable = message.as_invalid_session().unwrap_or(false);
                warn!(resumable, "invalid session");
                close(sink, RESUME_CLOSE, "invalid session").await;
                if resumable {
                    return Ok(Some(Exit::Reconnect { code: None, backoff: false }));
                }
                self.session.clear();
                return Ok(Some(Exit::Reidentify));
            }
            op => debug!(%op, "ignoring unexpected op"),
        }
        Ok(None)
    }

    fn dispatch(&mut self, message: GatewayMessage) {
        let Some(name) = message.t else {
            warn!("dispatch without an event name");
            return;
        };
        if let Some(seq) = message.s {
            self.session.record_sequence(seq);
        }
        let data = message.d.unwrap_or(Value::Null);
        let event = GatewayEventType::parse(&name);

        match event {
            GatewayEventType::Ready => {
                if let Some(session_id) = data.get("session_id").and_then(Value::as_str) {
                    let resume_url = data
                        .get("resume_gateway_url")
                        .and_then(Value::as_str)
                        .map(str::to_owned);
                    self.session.start(session_id.to_owned(), resume_url);
                }
                self.status.set_stage(ShardStage::Connected);
                self.backoff.reset();
                info!(session_id = ?self.session.session_id, "ready");
            }
            GatewayEventType::Resumed => {
                self.status.set_stage(ShardStage::Connected);
                self.backoff.reset();
                info!(seq = ?self.session.sequence, "resumed");
                self.emit(ShardEvent::Resumed { shard_id: self.id() });
            }
            _ => {}
        }

        self.emit(ShardEvent::Dispatch {
            shard_id: self.id(),
            event,
            seq: message.s.unwrap_or_default(),
            data,
        });
    }

    fn closed(&mut self, code: Option<u16>) -> GatewayResult<Exit> {
        match code.map(close_action) {
            Some(CloseAction::Fatal(code)) => Err(GatewayError::Closed {
                shard_id: self.id(),
                code,
            }),
            Some(CloseAction::Reidentify) => {
                self.session.clear();
                Ok(Exit::Reconnect { code, backoff: true })
            }
            Some(CloseAction::Resume) | None => Ok(Exit::Reconnect { code, backoff: true }),
        }
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("shard_id", &self.config.shard_id)
            .field("shard_count", &self.config.shard_count)
            .field("stage", &self.status.stage())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn read_frame(frame: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>) -> GatewayResult<Frame> {
    match frame {
        None => Ok(Frame::End),
        Some(Err(err)) => Err(err.into()),
        Some(Ok(Message::Text(text))) => match GatewayMessage::from_json(&text) {
            Ok(message) => Ok(Frame::Message(message)),
            Err(err) => {
                warn!(error = %err, "undecodable frame");
                Ok(Frame::Ignored)
            }
        },
        Some(Ok(Message::Close(frame))) => Ok(Frame::Close(frame.map(|f| u16::from(f.code)))),
        Some(Ok(_)) => Ok(Frame::Ignored),
    }
}

async fn read_hello(stream: &mut WsSource, shard_id: u64) -> GatewayResult<HelloPayload> {
    loop {
        match read_frame(stream.next().await)? {
            Frame::Message(message) => match message.as_hello() {
                Some(hello) => return Ok(hello),
                None => debug!(op = %message.op, "frame before hello"),
            },
            Frame::Close(Some(code)) => {
                if let CloseAction::Fatal(code) = close_action(code) {
                    return Err(GatewayError::Closed { shard_id, code });
                }
                return Err(GatewayError::ClosedBeforeHello);
            }
            Frame::Close(None) | Frame::End => return Err(GatewayError::ClosedBeforeHello),
            Frame::Ignored => {}
        }
    }
}

async fn send(sink: &mut WsSink, message: &GatewayMessage) -> GatewayResult<()> {
    sink.send(Message::Text(message.to_json()?)).await?;
    Ok(())
}

async fn close(sink: &mut WsSink, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code: WsCloseCode::from(code),
        reason: reason.into(),
    };
    if let Err(err) = sink.send(Message::Close(Some(frame))).await {
        debug!(error = %err, "failed to send close frame");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::OnlineStatus;

    #[test]
    fn test_close_actions() {
        assert_eq!(
            close_action(4004),
            CloseAction::Fatal(CloseCode::AuthenticationFailed)
        );
        assert_eq!(
            close_action(4014),
            CloseAction::Fatal(CloseCode::DisallowedIntents)
        );
        assert_eq!(close_action(4007), CloseAction::Reidentify);
        assert_eq!(close_action(4009), CloseAction::Reidentify);
        assert_eq!(close_action(4000), CloseAction::Resume);
        assert_eq!(close_action(1006), CloseAction::Resume);
    }

    #[test]
    fn test_identify_payload_for_bots() {
        let config = ShardConfig::new("token", true, "wss://gateway.test").shard(2, 4);
        let payload = config.identify_payload();
        assert_eq!(payload.shard, Some([2, 4]));
        assert_eq!(payload.large_threshold, Some(250));
        assert!(payload.capabilities.is_none());
        assert!(payload.presence.is_none());
    }

    #[test]
    fn test_identify_payload_for_users() {
        let config = ShardConfig::new("token", false, "wss://gateway.test")
            .presence(PresenceUpdatePayload::new(OnlineStatus::Invisible));
        let payload = config.identify_payload();
        assert!(payload.shard.is_none());
        assert_eq!(payload.capabilities, Some(IdentifyPayload::USER_CAPABILITIES));
        assert_eq!(
            payload.presence,
            Some(PresenceUpdatePayload::new(OnlineStatus::Invisible))
        );
    }

    #[test]
    fn test_from_client_config() {
        let client = ClientConfig::new("abc").with_bot(true).with_shard_count(3);
        let config = ShardConfig::from_client(&client, "wss://gateway.test");
        assert!(config.bot);
        assert_eq!(config.token, "abc");
        assert_eq!(config.version, 9);
        assert_eq!(config.shard_count, 1);
    }

    #[test]
    fn test_shard_event_id() {
        let event = ShardEvent::Dispatch {
            shard_id: 5,
            event: GatewayEventType::MessageCreate,
            seq: 1,
            data: Value::Null,
        };
        assert_eq!(event.shard_id(), 5);
        assert_eq!(ShardEvent::Resumed { shard_id: 1 }.shard_id(), 1);
    }

    #[test]
    fn test_send_limit() {
        assert_eq!(SEND_LIMIT.get(), 110);
    }
}
