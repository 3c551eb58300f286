//! Handle for talking to a running shard

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{
    GatewayMessage, GuildSubscriptionsPayload, PresenceUpdatePayload, RequestGuildMembersPayload,
};

/// Connection stage of a shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShardStage {
    #[default]
    Disconnected,
    Connecting,
    Identifying,
    Resuming,
    Connected,
    Reconnecting,
    Closed,
}

/// Instructions a shard accepts while running
#[derive(Debug)]
pub enum ShardCommand {
    Send(GatewayMessage),
    /// Drop the connection and resume
    Reconnect,
    Shutdown,
}

/// State a shard shares with its messengers
#[derive(Debug, Default)]
pub struct ShardStatus {
    stage: RwLock<ShardStage>,
    latency: RwLock<Option<Duration>>,
}

impl ShardStatus {
    pub fn stage(&self) -> ShardStage {
        *self.stage.read()
    }

    pub(crate) fn set_stage(&self, stage: ShardStage) {
        *self.stage.write() = stage;
    }

    pub fn latency(&self) -> Option<Duration> {
        *self.latency.read()
    }

    pub(crate) fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }
}

/// Cloneable sender into one shard
#[derive(Debug, Clone)]
pub struct ShardMessenger {
    shard_id: u64,
    commands: mpsc::UnboundedSender<ShardCommand>,
    status: Arc<ShardStatus>,
}

impl ShardMessenger {
    pub(crate) fn new(
        shard_id: u64,
        commands: mpsc::UnboundedSender<ShardCommand>,
        status: Arc<ShardStatus>,
    ) -> Self {
        Self {
            shard_id,
            commands,
            status,
        }
    }

    #[inline]
    pub fn shard_id(&self) -> u64 {
        self.shard_id
    }

    pub fn stage(&self) -> ShardStage {
        self.status.stage()
    }

    /// Time between the last heartbeat and its ACK
    pub fn latency(&self) -> Option<Duration> {
        self.status.latency()
    }

    fn command(&self, command: ShardCommand) -> GatewayResult<()> {
        self.commands
            .send(command)
            .map_err(|_| GatewayError::ShardNotRunning(self.shard_id))
    }

    /// Queue a frame; it goes out through the shard's send limiter
    pub fn send(&self, message: GatewayMessage) -> GatewayResult<()> {
        self.command(ShardCommand::Send(message))
    }

    pub fn update_presence(&self, presence: &PresenceUpdatePayload) -> GatewayResult<()> {
        self.send(GatewayMessage::presence_update(presence)?)
    }

    pub fn request_guild_members(&self, request: &RequestGuildMembersPayload) -> GatewayResult<()> {
        self.send(GatewayMessage::request_guild_members(request)?)
    }

    pub fn subscribe_guild(&self, subscription: &GuildSubscriptionsPayload) -> GatewayResult<()> {
        self.send(GatewayMessage::guild_subscriptions(subscription)?)
    }

    pub fn reconnect(&self) -> GatewayResult<()> {
        self.command(ShardCommand::Reconnect)
    }

    pub fn shutdown(&self) -> GatewayResult<()> {
        self.command(ShardCommand::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::OpCode;
    use parley_core::{OnlineStatus, Snowflake};

    #[test]
    fn test_messenger_queues_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let messenger = ShardMessenger::new(3, tx, Arc::new(ShardStatus::default()));

        messenger
            .update_presence(&PresenceUpdatePayload::new(OnlineStatus::Idle))
            .unwrap();
        messenger
            .request_guild_members(&RequestGuildMembersPayload::all(Snowflake::new(1), false))
            .unwrap();

        match rx.try_recv().unwrap() {
            ShardCommand::Send(frame) => assert_eq!(frame.op, OpCode::PresenceUpdate),
            other => panic!("unexpected command: {other:?}"),
        }
        match rx.try_recv().unwrap() {
            ShardCommand::Send(frame) => assert_eq!(frame.op, OpCode::RequestGuildMembers),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_stopped_shard() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let messenger = ShardMessenger::new(1, tx, Arc::new(ShardStatus::default()));
        assert!(matches!(messenger.shutdown(), Err(GatewayError::ShardNotRunning(1))));
        assert_eq!(messenger.stage(), ShardStage::Disconnected);
        assert_eq!(messenger.latency(), None);
    }
}
