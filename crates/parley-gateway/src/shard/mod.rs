//! One gateway connection and its state machine

mod heartbeat;
mod identify;
mod messenger;
mod runner;
mod session;

pub use heartbeat::{Beat, Heartbeater};
pub use identify::{IdentifyQueue, IDENTIFY_INTERVAL};
pub use messenger::{ShardCommand, ShardMessenger, ShardStage, ShardStatus};
pub use runner::{close_action, CloseAction, Shard, ShardConfig, ShardEvent};
pub use session::{gateway_url, SessionState};
