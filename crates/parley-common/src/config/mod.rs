//! Configuration structs

mod client_config;
mod properties;

pub use client_config::{
    CacheConfig, ClientConfig, ConfigError, Environment, GatewayConfig, HttpConfig,
};
pub use properties::SuperProperties;
