//! Gateway errors

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::protocol::CloseCode;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Closed with a code that reconnecting cannot fix
    #[error("Shard {shard_id} closed: {code}")]
    Closed { shard_id: u64, code: CloseCode },

    #[error("No Hello received within {0:?}")]
    HelloTimeout(std::time::Duration),

    #[error("Connection closed before Hello")]
    ClosedBeforeHello,

    #[error("Shard {0} is not running")]
    ShardNotRunning(u64),

    #[error("Invalid shard: {shard_id} of {shard_count}")]
    InvalidShard { shard_id: u64, shard_count: u64 },
}

impl From<tungstenite::Error> for GatewayError {
    fn from(err: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl GatewayError {
    /// Whether the shard gave up for good
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::InvalidShard { .. })
    }

    /// Close code, when the server closed the connection
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Closed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
