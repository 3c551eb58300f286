//! # parley-client
//!
//! The client facade over the REST and gateway crates: a cache kept in sync
//! with gateway dispatches, typed events, and handler dispatch.

pub mod client;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod state;

pub use client::{Client, ClientBuilder};
pub use context::Context;
pub use error::{ClientError, ClientResult};
pub use event::Event;
pub use handler::{EventHandler, RawEventHandler};
pub use state::{AutoShardedConnectionState, ChunkRegistry, ConnectionState, MessageCache, CHUNK_TIMEOUT};

// Re-exported for handler implementations
pub use async_trait::async_trait;
