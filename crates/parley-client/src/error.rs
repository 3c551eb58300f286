//! Client errors

use parley_common::ConfigError;
use parley_core::Snowflake;
use parley_gateway::GatewayError;
use parley_http::HttpError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Member chunk for guild {guild_id} timed out after {timeout:?}")]
    ChunkTimeout { guild_id: Snowflake, timeout: Duration },

    /// A gateway operation was attempted before the client connected
    #[error("Client is not ready")]
    NotReady,

    #[error("Client is closed")]
    Closed,
}

impl ClientError {
    /// Whether the error came from a rejected token
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Http(HttpError::Unauthorized) => true,
            Self::Gateway(err) => err.close_code() == Some(parley_gateway::CloseCode::AuthenticationFailed),
            _ => false,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
