//! Permission bitflags
//!
//! Permissions are sent by the platform as a decimal string of a 64-bit bitfield.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Platform permission flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        const CREATE_INSTANT_INVITE               = 1 << 0;
        const KICK_MEMBERS                        = 1 << 1;
        const BAN_MEMBERS                         = 1 << 2;
        /// Bypass all permission checks and channel overwrites
        const ADMINISTRATOR                       = 1 << 3;
        const MANAGE_CHANNELS                     = 1 << 4;
        const MANAGE_GUILD                        = 1 << 5;
        const ADD_REACTIONS                       = 1 << 6;
        const VIEW_AUDIT_LOG                      = 1 << 7;
        const PRIORITY_SPEAKER                    = 1 << 8;
        const STREAM                              = 1 << 9;
        const VIEW_CHANNEL                        = 1 << 10;
        const SEND_MESSAGES                       = 1 << 11;
        const SEND_TTS_MESSAGES                   = 1 << 12;
        const MANAGE_MESSAGES                     = 1 << 13;
        const EMBED_LINKS                         = 1 << 14;
        const ATTACH_FILES                        = 1 << 15;
        const READ_MESSAGE_HISTORY                = 1 << 16;
        const MENTION_EVERYONE                    = 1 << 17;
        const USE_EXTERNAL_EMOJIS                 = 1 << 18;
        const VIEW_GUILD_INSIGHTS                 = 1 << 19;
        const CONNECT                             = 1 << 20;
        const SPEAK                               = 1 << 21;
        const MUTE_MEMBERS                        = 1 << 22;
        const DEAFEN_MEMBERS                      = 1 << 23;
        const MOVE_MEMBERS                        = 1 << 24;
        const USE_VAD                             = 1 << 25;
        const CHANGE_NICKNAME                     = 1 << 26;
        const MANAGE_NICKNAMES                    = 1 << 27;
        const MANAGE_ROLES                        = 1 << 28;
        const MANAGE_WEBHOOKS                     = 1 << 29;
        const MANAGE_GUILD_EXPRESSIONS            = 1 << 30;
        const USE_APPLICATION_COMMANDS            = 1 << 31;
        const REQUEST_TO_SPEAK                    = 1 << 32;
        const MANAGE_EVENTS                       = 1 << 33;
        const MANAGE_THREADS                      = 1 << 34;
        const CREATE_PUBLIC_THREADS               = 1 << 35;
        const CREATE_PRIVATE_THREADS              = 1 << 36;
        const USE_EXTERNAL_STICKERS               = 1 << 37;
        const SEND_MESSAGES_IN_THREADS            = 1 << 38;
        const USE_EMBEDDED_ACTIVITIES             = 1 << 39;
        const MODERATE_MEMBERS                    = 1 << 40;
        const VIEW_CREATOR_MONETIZATION_ANALYTICS = 1 << 41;
        const USE_SOUNDBOARD                      = 1 << 42;
        const CREATE_GUILD_EXPRESSIONS            = 1 << 43;
        const CREATE_EVENTS                       = 1 << 44;
        const USE_EXTERNAL_SOUNDS                 = 1 << 45;
        const SEND_VOICE_MESSAGES                 = 1 << 46;

        /// Every permission that can be granted in a text channel
        const TEXT = Self::CREATE_INSTANT_INVITE.bits()
            | Self::MANAGE_CHANNELS.bits()
            | Self::ADD_REACTIONS.bits()
            | Self::VIEW_CHANNEL.bits()
            | Self::SEND_MESSAGES.bits()
            | Self::SEND_TTS_MESSAGES.bits()
            | Self::MANAGE_MESSAGES.bits()
            | Self::EMBED_LINKS.bits()
            | Self::ATTACH_FILES.bits()
            | Self::READ_MESSAGE_HISTORY.bits()
            | Self::MENTION_EVERYONE.bits()
            | Self::USE_EXTERNAL_EMOJIS.bits()
            | Self::MANAGE_ROLES.bits()
            | Self::MANAGE_WEBHOOKS.bits()
            | Self::USE_APPLICATION_COMMANDS.bits()
            | Self::MANAGE_THREADS.bits()
            | Self::CREATE_PUBLIC_THREADS.bits()
            | Self::CREATE_PRIVATE_THREADS.bits()
            | Self::USE_EXTERNAL_STICKERS.bits()
            | Self::SEND_MESSAGES_IN_THREADS.bits()
            | Self::SEND_VOICE_MESSAGES.bits();

        /// Permissions that depend on being able to send messages
        const SEND_DEPENDENT = Self::SEND_TTS_MESSAGES.bits()
            | Self::MENTION_EVERYONE.bits()
            | Self::EMBED_LINKS.bits()
            | Self::ATTACH_FILES.bits();

        /// What a timed-out member keeps
        const TIMEOUT_ALLOWED = Self::VIEW_CHANNEL.bits() | Self::READ_MESSAGE_HISTORY.bits();
    }
}

impl Permissions {
    /// Check if the permission set contains a required permission
    ///
    /// Administrators bypass all permission checks.
    #[inline]
    pub fn has(&self, permission: Permissions) -> bool {
        if self.contains(Permissions::ADMINISTRATOR) {
            return true;
        }
        self.contains(permission)
    }

    /// Check if the permission set has any of the given permissions
    #[inline]
    pub fn has_any(&self, permissions: Permissions) -> bool {
        if self.contains(Permissions::ADMINISTRATOR) {
            return true;
        }
        self.intersects(permissions)
    }

    /// Check if the permission set has all of the given permissions
    #[inline]
    pub fn has_all(&self, permissions: Permissions) -> bool {
        self.has(permissions)
    }

    /// Combine permissions from multiple roles
    pub fn combine<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = Permissions>,
    {
        roles.into_iter().fold(Permissions::empty(), |acc, p| acc | p)
    }

    /// Permissions that apply to text channels
    #[inline]
    pub const fn text() -> Self {
        Self::TEXT
    }

    /// Every permission that can be set through a channel overwrite
    pub const fn all_channel() -> Self {
        Self::from_bits_truncate(
            Self::TEXT.bits()
                | Self::PRIORITY_SPEAKER.bits()
                | Self::STREAM.bits()
                | Self::CONNECT.bits()
                | Self::SPEAK.bits()
                | Self::MUTE_MEMBERS.bits()
                | Self::DEAFEN_MEMBERS.bits()
                | Self::MOVE_MEMBERS.bits()
                | Self::USE_VAD.bits()
                | Self::REQUEST_TO_SPEAK.bits()
                | Self::MANAGE_EVENTS.bits()
                | Self::USE_EMBEDDED_ACTIVITIES.bits()
                | Self::USE_SOUNDBOARD.bits()
                | Self::USE_EXTERNAL_SOUNDS.bits(),
        )
    }

    /// Apply an overwrite: remove `deny`, then add `allow`
    #[inline]
    #[must_use]
    pub fn overwrite(self, allow: Permissions, deny: Permissions) -> Self {
        (self - deny) | allow
    }

    /// Parse from string representation (decimal number)
    pub fn parse(s: &str) -> Result<Self, std::num::ParseIntError> {
        s.parse::<u64>().map(Permissions::from_bits_truncate)
    }

    /// Names of every individual permission that is set
    pub fn list(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).filter(|name| {
            !matches!(*name, "TEXT" | "SEND_DEPENDENT" | "TIMEOUT_ALLOWED")
        }).collect()
    }

    /// Check if this permission set is a subset of another
    #[inline]
    pub fn is_subset_of(&self, other: Permissions) -> bool {
        (*self & other) == *self
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::empty()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

// Serialize as string for JSON (JavaScript BigInt safety)
impl Serialize for Permissions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.bits().to_string())
    }
}

// Deserialize from string or number
impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct PermissionsVisitor;

        impl Visitor<'_> for PermissionsVisitor {
            type Value = Permissions;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing permission bits")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                Ok(Permissions::from_bits_truncate(value as u64))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                Ok(Permissions::from_bits_truncate(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                Permissions::parse(value).map_err(|_| de::Error::custom("invalid permission bits"))
            }
        }

        deserializer.deserialize_any(PermissionsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_administrator_bypass() {
        let admin = Permissions::ADMINISTRATOR;
        assert!(admin.has(Permissions::VIEW_CHANNEL));
        assert!(admin.has(Permissions::MANAGE_GUILD));
        assert!(admin.has_any(Permissions::BAN_MEMBERS));
    }

    #[test]
    fn test_has_any_and_all() {
        let perms = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
        assert!(perms.has_all(Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES));
        assert!(!perms.has_all(Permissions::VIEW_CHANNEL | Permissions::MANAGE_GUILD));
        assert!(perms.has_any(Permissions::VIEW_CHANNEL | Permissions::MANAGE_GUILD));
        assert!(!Permissions::SEND_MESSAGES.has_any(Permissions::MANAGE_GUILD));
    }

    #[test]
    fn test_overwrite_denies_before_allowing() {
        let base = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
        let result = base.overwrite(Permissions::SEND_MESSAGES, Permissions::SEND_MESSAGES);
        assert!(result.contains(Permissions::SEND_MESSAGES));

        let result = base.overwrite(Permissions::empty(), Permissions::SEND_MESSAGES);
        assert!(!result.contains(Permissions::SEND_MESSAGES));
        assert!(result.contains(Permissions::VIEW_CHANNEL));
    }

    #[test]
    fn test_combine_permissions() {
        let combined = Permissions::combine([
            Permissions::VIEW_CHANNEL,
            Permissions::SEND_MESSAGES,
            Permissions::MANAGE_GUILD,
        ]);
        assert!(combined.contains(Permissions::VIEW_CHANNEL | Permissions::MANAGE_GUILD));
    }

    #[test]
    fn test_serialize_as_string() {
        let perms = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
        assert_eq!(serde_json::to_string(&perms).unwrap(), "\"3072\"");
    }

    #[test]
    fn test_deserialize_string_and_number() {
        let perms: Permissions = serde_json::from_str("\"3072\"").unwrap();
        assert!(perms.contains(Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES));
        let perms: Permissions = serde_json::from_str("8").unwrap();
        assert_eq!(perms, Permissions::ADMINISTRATOR);
    }

    #[test]
    fn test_unknown_bits_are_truncated() {
        let perms = Permissions::parse(&(1u64 << 60 | 1).to_string()).unwrap();
        assert_eq!(perms, Permissions::CREATE_INSTANT_INVITE);
    }

    #[test]
    fn test_list_skips_composites() {
        let list = Permissions::VIEW_CHANNEL.list();
        assert_eq!(list, vec!["VIEW_CHANNEL"]);
        let list = (Permissions::VIEW_CHANNEL | Permissions::ADMINISTRATOR).list();
        assert!(list.contains(&"ADMINISTRATOR"));
        assert!(list.contains(&"VIEW_CHANNEL"));
    }

    #[test]
    fn test_is_subset_of() {
        let subset = Permissions::VIEW_CHANNEL;
        let superset = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
        assert!(subset.is_subset_of(superset));
        assert!(!superset.is_subset_of(subset));
    }
}
