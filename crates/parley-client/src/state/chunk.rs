//! Pending member requests, keyed by nonce

use dashmap::DashMap;
use parley_core::{Member, Snowflake};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

/// Members collected for one op 8 request
#[derive(Debug)]
struct ChunkRequest {
    guild_id: Snowflake,
    members: Vec<Member>,
    waiter: oneshot::Sender<Vec<Member>>,
}

/// Receiving side of a registered request
#[derive(Debug)]
pub struct ChunkWaiter {
    nonce: String,
    guild_id: Snowflake,
    receiver: oneshot::Receiver<Vec<Member>>,
}

impl ChunkWaiter {
    #[inline]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    #[inline]
    pub fn guild_id(&self) -> Snowflake {
        self.guild_id
    }

    /// Wait for the final chunk; the request is dropped on timeout
    pub async fn wait(self, registry: &ChunkRegistry, timeout: Duration) -> ClientResult<Vec<Member>> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(members)) => Ok(members),
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => {
                registry.cancel(&self.nonce);
                warn!(guild_id = %self.guild_id, nonce = %self.nonce, "member chunk timed out");
                Err(ClientError::ChunkTimeout {
                    guild_id: self.guild_id,
                    timeout,
                })
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ChunkRegistry {
    requests: DashMap<String, ChunkRequest>,
}

impl ChunkRegistry {
    /// Register a request under a fresh nonce
    pub fn register(&self, guild_id: Snowflake) -> ChunkWaiter {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let (tx, rx) = oneshot::channel();
        self.requests.insert(
            nonce.clone(),
            ChunkRequest {
                guild_id,
                members: Vec::new(),
                waiter: tx,
            },
        );
        ChunkWaiter {
            nonce,
            guild_id,
            receiver: rx,
        }
    }

    /// Add a chunk's members; the request resolves on its last chunk
    ///
    /// Returns whether `nonce` belonged to a pending request.
    pub fn feed(&self, nonce: &str, members: &[Member], last: bool) -> bool {
        if !last {
            return match self.requests.get_mut(nonce) {
                Some(mut request) => {
                    request.members.extend_from_slice(members);
                    true
                }
                None => false,
            };
        }

        let Some((_, mut request)) = self.requests.remove(nonce) else {
            return false;
        };
        request.members.extend_from_slice(members);
        debug!(guild_id = %request.guild_id, count = request.members.len(), "member request complete");
        // The waiter may have timed out already
        let _ = request.waiter.send(request.members);
        true
    }

    pub fn cancel(&self, nonce: &str) {
        self.requests.remove(nonce);
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    /// Fail every pending request, e.g. on shutdown
    pub fn clear(&self) {
        self.requests.clear();
    }
}
