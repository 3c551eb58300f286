//! Client configuration structs
//!
//! Loads configuration from `PARLEY_*` environment variables (and `.env`),
//! or is built in code with [`ClientConfig::new`] and the `with_*` methods.

use parley_core::Intents;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use super::SuperProperties;

/// Main client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Account token, without the `Bot ` prefix
    pub token: String,
    /// Whether the token belongs to a bot account
    pub bot: bool,
    pub env: Environment,
    pub http: HttpConfig,
    pub gateway: GatewayConfig,
    pub cache: CacheConfig,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            _ => Err(()),
        }
    }
}

/// REST client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub api_base: String,
    pub timeout_secs: u64,
    /// Attempts per request before giving up on 429s and 5xx responses
    pub max_retries: u32,
    pub user_agent: String,
    /// Client fingerprint sent with user-account requests
    pub properties: SuperProperties,
}

impl HttpConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        let properties = SuperProperties::default();
        Self {
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            user_agent: properties.browser_user_agent.clone(),
            properties,
        }
    }
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Fixed gateway URL; fetched from the API when unset
    pub url: Option<String>,
    pub version: u8,
    /// Fixed shard count; the recommended count is used when unset
    pub shard_count: Option<u64>,
    /// Bot accounts only
    pub intents: Intents,
    pub large_threshold: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: None,
            version: default_gateway_version(),
            shard_count: None,
            intents: Intents::default(),
            large_threshold: default_large_threshold(),
        }
    }
}

/// Cache behaviour
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Messages kept in the message deque; 0 disables message caching
    pub max_messages: usize,
    pub chunk_guilds_at_startup: bool,
    /// Quiet period after the last GUILD_CREATE before READY is dispatched
    pub guild_ready_timeout_ms: u64,
}

impl CacheConfig {
    #[must_use]
    pub fn guild_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.guild_ready_timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            chunk_guilds_at_startup: true,
            guild_ready_timeout_ms: default_guild_ready_timeout_ms(),
        }
    }
}

// Default value functions
fn default_api_base() -> String {
    "https://discord.com/api/v9".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_gateway_version() -> u8 {
    9
}

fn default_large_threshold() -> u16 {
    250
}

fn default_max_messages() -> usize {
    1000
}

fn default_guild_ready_timeout_ms() -> u64 {
    2000
}

impl ClientConfig {
    /// Configuration with defaults for everything but the token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            bot: false,
            env: Environment::default(),
            http: HttpConfig::default(),
            gateway: GatewayConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Mark the token as a bot token
    pub fn with_bot(mut self, bot: bool) -> Self {
        self.bot = bot;
        self
    }

    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.gateway.intents = intents;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.http.api_base = api_base.into();
        self
    }

    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway.url = Some(url.into());
        self
    }

    pub fn with_shard_count(mut self, shard_count: u64) -> Self {
        self.gateway.shard_count = Some(shard_count);
        self
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.cache.max_messages = max_messages;
        self
    }

    pub fn with_chunk_guilds_at_startup(mut self, chunk: bool) -> Self {
        self.cache.chunk_guilds_at_startup = chunk;
        self
    }

    pub fn with_guild_ready_timeout(mut self, timeout: Duration) -> Self {
        self.cache.guild_ready_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.http.max_retries = max_retries;
        self
    }

    /// Load configuration from environment variables
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// # Errors
    /// Returns an error if `PARLEY_TOKEN` is missing or a value does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |name: &'static str| -> Result<Option<String>, ConfigError> {
            Ok(lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
        };

        let token = parse("PARLEY_TOKEN")?.ok_or(ConfigError::MissingVar("PARLEY_TOKEN"))?;
        let mut config = Self::new(token);

        if let Some(bot) = parse_bool(&lookup, "PARLEY_BOT")? {
            config.bot = bot;
        }
        if let Some(env) = parse("PARLEY_APP_ENV")? {
            config.env = env
                .parse()
                .map_err(|()| ConfigError::InvalidValue("PARLEY_APP_ENV", env))?;
        }

        // HTTP
        if let Some(api_base) = parse("PARLEY_API_BASE")? {
            config.http.api_base = api_base.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = parse_num(&lookup, "PARLEY_HTTP_TIMEOUT_SECS")? {
            config.http.timeout_secs = timeout;
        }
        if let Some(retries) = parse_num(&lookup, "PARLEY_HTTP_MAX_RETRIES")? {
            config.http.max_retries = retries;
        }
        if let Some(user_agent) = parse("PARLEY_USER_AGENT")? {
            config.http.properties.browser_user_agent.clone_from(&user_agent);
            config.http.user_agent = user_agent;
        }

        // Gateway
        config.gateway.url = parse("PARLEY_GATEWAY_URL")?;
        if let Some(version) = parse_num(&lookup, "PARLEY_GATEWAY_VERSION")? {
            config.gateway.version = version;
        }
        config.gateway.shard_count = parse_num(&lookup, "PARLEY_SHARD_COUNT")?;
        if let Some(bits) = parse_num::<u32, _>(&lookup, "PARLEY_INTENTS")? {
            config.gateway.intents = Intents::from_bits_truncate(bits);
        }
        if let Some(threshold) = parse_num(&lookup, "PARLEY_LARGE_THRESHOLD")? {
            if !(50..=250).contains(&threshold) {
                return Err(ConfigError::InvalidValue(
                    "PARLEY_LARGE_THRESHOLD",
                    format!("{threshold} (expected 50..=250)"),
                ));
            }
            config.gateway.large_threshold = threshold;
        }

        // Cache
        if let Some(max) = parse_num(&lookup, "PARLEY_MAX_MESSAGES")? {
            config.cache.max_messages = max;
        }
        if let Some(chunk) = parse_bool(&lookup, "PARLEY_CHUNK_GUILDS_AT_STARTUP")? {
            config.cache.chunk_guilds_at_startup = chunk;
        }
        if let Some(timeout) = parse_num(&lookup, "PARLEY_GUILD_READY_TIMEOUT_MS")? {
            config.cache.guild_ready_timeout_ms = timeout;
        }

        Ok(config)
    }

    /// Authorization header value
    pub fn authorization(&self) -> String {
        if self.bot {
            format!("Bot {}", self.token)
        } else {
            self.token.clone()
        }
    }
}

fn parse_num<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(None),
    }
}

fn parse_bool<F>(lookup: &F, name: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty()) {
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue(name, raw)),
        },
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_environment_is_production() {
        assert!(!Environment::Development.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_missing_token() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("PARLEY_TOKEN")));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("PARLEY_TOKEN", "abc")]).unwrap();
        assert_eq!(config.token, "abc");
        assert!(!config.bot);
        assert_eq!(config.http.api_base, "https://discord.com/api/v9");
        assert_eq!(config.http.max_retries, 5);
        assert_eq!(config.gateway.version, 9);
        assert_eq!(config.gateway.large_threshold, 250);
        assert_eq!(config.cache.max_messages, 1000);
        assert!(config.cache.chunk_guilds_at_startup);
        assert_eq!(config.cache.guild_ready_timeout(), Duration::from_secs(2));
        assert_eq!(config.authorization(), "abc");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PARLEY_TOKEN", "abc"),
            ("PARLEY_BOT", "true"),
            ("PARLEY_API_BASE", "http://127.0.0.1:3000/api/v9/"),
            ("PARLEY_SHARD_COUNT", "4"),
            ("PARLEY_INTENTS", "513"),
            ("PARLEY_MAX_MESSAGES", "0"),
            ("PARLEY_APP_ENV", "production"),
        ])
        .unwrap();

        assert!(config.bot);
        assert_eq!(config.authorization(), "Bot abc");
        assert_eq!(config.http.api_base, "http://127.0.0.1:3000/api/v9");
        assert_eq!(config.gateway.shard_count, Some(4));
        assert_eq!(
            config.gateway.intents,
            Intents::GUILDS | Intents::GUILD_MESSAGES
        );
        assert_eq!(config.cache.max_messages, 0);
        assert!(config.env.is_production());
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("PARLEY_TOKEN", "abc"), ("PARLEY_SHARD_COUNT", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("PARLEY_SHARD_COUNT", _)));

        let err = load(&[("PARLEY_TOKEN", "abc"), ("PARLEY_BOT", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("PARLEY_BOT", _)));

        let err = load(&[("PARLEY_TOKEN", "abc"), ("PARLEY_LARGE_THRESHOLD", "10")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("PARLEY_LARGE_THRESHOLD", _)));
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("t")
            .with_bot(true)
            .with_shard_count(2)
            .with_guild_ready_timeout(Duration::from_millis(50));
        assert!(config.bot);
        assert_eq!(config.gateway.shard_count, Some(2));
        assert_eq!(config.cache.guild_ready_timeout_ms, 50);
    }
}
