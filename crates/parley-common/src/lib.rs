//! # parley-common
//!
//! Shared utilities: client configuration, telemetry setup, and reconnect backoff.

pub mod backoff;
pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use backoff::ExponentialBackoff;
pub use config::{
    CacheConfig, ClientConfig, ConfigError, Environment, GatewayConfig, HttpConfig,
    SuperProperties,
};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
