//! Client fingerprint sent by user accounts
//!
//! User sessions identify as the web client. The same properties go into the
//! gateway identify payload and, base64-encoded, into the `X-Super-Properties`
//! header of REST requests.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
    pub system_locale: String,
    pub browser_user_agent: String,
    pub browser_version: String,
    pub os_version: String,
    pub referrer: String,
    pub referring_domain: String,
    pub release_channel: String,
    pub client_build_number: u32,
}

impl Default for SuperProperties {
    fn default() -> Self {
        Self {
            os: "Windows".to_string(),
            browser: "Chrome".to_string(),
            device: String::new(),
            system_locale: "en-US".to_string(),
            browser_user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            browser_version: "120.0.0.0".to_string(),
            os_version: "10".to_string(),
            referrer: String::new(),
            referring_domain: String::new(),
            release_channel: "stable".to_string(),
            client_build_number: 260_672,
        }
    }
}

impl SuperProperties {
    /// Properties a bot sends when identifying
    pub fn bot() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "parley".to_string(),
            device: "parley".to_string(),
            browser_user_agent: String::new(),
            browser_version: String::new(),
            os_version: String::new(),
            client_build_number: 0,
            ..Self::default()
        }
    }

    /// Base64 JSON value for the `X-Super-Properties` header
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        base64::engine::general_purpose::STANDARD.encode(json)
    }
}
