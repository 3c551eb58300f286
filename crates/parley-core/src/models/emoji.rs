//! Emoji models - custom guild emoji and unicode emoji

use serde::{Deserialize, Serialize};
use std::fmt;

use super::user::CDN_BASE;
use crate::error::ModelError;
use crate::value_objects::Snowflake;

/// Custom emoji owned by a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default)]
    pub require_colons: bool,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub animated: bool,
    #[serde(default = "default_true")]
    pub available: bool,
}

fn default_true() -> bool {
    true
}

impl Emoji {
    /// CDN URL for the emoji image
    pub fn url(&self) -> String {
        let ext = if self.animated { "gif" } else { "png" };
        format!("{CDN_BASE}/emojis/{}.{ext}", self.id)
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.animated { "a" } else { "" };
        write!(f, "<{prefix}:{}:{}>", self.name, self.id)
    }
}

impl From<&Emoji> for PartialEmoji {
    fn from(emoji: &Emoji) -> Self {
        Self {
            id: Some(emoji.id),
            name: Some(emoji.name.clone()),
            animated: emoji.animated,
        }
    }
}

/// Emoji as referenced by reactions: custom (`id` set) or unicode (`name` only)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialEmoji {
    #[serde(default)]
    pub id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

impl PartialEmoji {
    /// Unicode emoji
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            animated: false,
        }
    }

    /// Custom emoji
    pub fn custom(id: Snowflake, name: impl Into<String>, animated: bool) -> Self {
        Self {
            id: Some(id),
            name: Some(name.into()),
            animated,
        }
    }

    #[inline]
    pub fn is_custom(&self) -> bool {
        self.id.is_some()
    }

    /// Parse `<:name:id>`, `<a:name:id>`, `name:id`, or a bare unicode emoji
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ModelError::InvalidEmoji(input.to_string()));
        }

        let (inner, animated) = match input
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
        {
            Some(inner) => match inner.strip_prefix("a:") {
                Some(rest) => (rest, true),
                None => (inner.strip_prefix(':').unwrap_or(inner), false),
            },
            None if input.contains(':') => (input.trim_start_matches(':'), false),
            None => return Ok(Self::unicode(input)),
        };

        let (name, id) = inner
            .rsplit_once(':')
            .ok_or_else(|| ModelError::InvalidEmoji(input.to_string()))?;
        let id = Snowflake::parse(id).map_err(|_| ModelError::InvalidEmoji(input.to_string()))?;
        if name.is_empty() {
            return Err(ModelError::InvalidEmoji(input.to_string()));
        }
        Ok(Self::custom(id, name, animated))
    }

    /// Form used in reaction REST paths: `name:id` for custom emoji,
    /// the percent-encoded character otherwise
    pub fn url_encoded(&self) -> String {
        let name = self.name.as_deref().unwrap_or("_");
        match self.id {
            Some(id) => format!("{name}:{id}"),
            None => percent_encode(name),
        }
    }
}

impl fmt::Display for PartialEmoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("_");
        match self.id {
            Some(id) if self.animated => write!(f, "<a:{name}:{id}>"),
            Some(id) => write!(f, "<:{name}:{id}>"),
            None => f.write_str(name),
        }
    }
}

/// Percent-encode everything outside the URL unreserved set
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
