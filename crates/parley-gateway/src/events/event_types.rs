//! Dispatch event names

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

macro_rules! event_types {
    ($($variant:ident => $name:literal,)*) => {
        /// Dispatch names carried in the `t` field
        ///
        /// Names the cache does not know are kept as [`GatewayEventType::Unknown`].
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum GatewayEventType {
            $($variant,)*
            Unknown(String),
        }

        impl GatewayEventType {
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $name,)*
                    Self::Unknown(name) => name,
                }
            }

            #[must_use]
            pub fn parse(name: &str) -> Self {
                match name {
                    $($name => Self::$variant,)*
                    other => Self::Unknown(other.to_string()),
                }
            }
        }
    };
}

event_types! {
    Ready => "READY",
    ReadySupplemental => "READY_SUPPLEMENTAL",
    Resumed => "RESUMED",

    GuildCreate => "GUILD_CREATE",
    GuildUpdate => "GUILD_UPDATE",
    GuildDelete => "GUILD_DELETE",
    GuildMemberAdd => "GUILD_MEMBER_ADD",
    GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
    GuildMemberRemove => "GUILD_MEMBER_REMOVE",
    GuildMembersChunk => "GUILD_MEMBERS_CHUNK",
    GuildRoleCreate => "GUILD_ROLE_CREATE",
    GuildRoleUpdate => "GUILD_ROLE_UPDATE",
    GuildRoleDelete => "GUILD_ROLE_DELETE",
    GuildBanAdd => "GUILD_BAN_ADD",
    GuildBanRemove => "GUILD_BAN_REMOVE",
    GuildEmojisUpdate => "GUILD_EMOJIS_UPDATE",

    ChannelCreate => "CHANNEL_CREATE",
    ChannelUpdate => "CHANNEL_UPDATE",
    ChannelDelete => "CHANNEL_DELETE",
    ChannelPinsUpdate => "CHANNEL_PINS_UPDATE",

    MessageCreate => "MESSAGE_CREATE",
    MessageUpdate => "MESSAGE_UPDATE",
    MessageDelete => "MESSAGE_DELETE",
    MessageDeleteBulk => "MESSAGE_DELETE_BULK",
    MessageReactionAdd => "MESSAGE_REACTION_ADD",
    MessageReactionRemove => "MESSAGE_REACTION_REMOVE",
    MessageReactionRemoveAll => "MESSAGE_REACTION_REMOVE_ALL",
    MessageReactionRemoveEmoji => "MESSAGE_REACTION_REMOVE_EMOJI",

    PresenceUpdate => "PRESENCE_UPDATE",
    TypingStart => "TYPING_START",
    UserUpdate => "USER_UPDATE",
    RelationshipAdd => "RELATIONSHIP_ADD",
    RelationshipRemove => "RELATIONSHIP_REMOVE",
    InviteCreate => "INVITE_CREATE",
    InviteDelete => "INVITE_DELETE",
}

impl GatewayEventType {
    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for GatewayEventType {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl Serialize for GatewayEventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GatewayEventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names() {
        assert_eq!(GatewayEventType::parse("READY"), GatewayEventType::Ready);
        assert_eq!(
            GatewayEventType::parse("MESSAGE_REACTION_REMOVE_EMOJI"),
            GatewayEventType::MessageReactionRemoveEmoji
        );
        assert_eq!(GatewayEventType::GuildMembersChunk.as_str(), "GUILD_MEMBERS_CHUNK");
    }

    #[test]
    fn test_unknown_names_are_kept() {
        let event = GatewayEventType::parse("SESSIONS_REPLACE");
        assert!(event.is_unknown());
        assert_eq!(event.to_string(), "SESSIONS_REPLACE");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&GatewayEventType::TypingStart).unwrap();
        assert_eq!(json, "\"TYPING_START\"");
        let parsed: GatewayEventType = serde_json::from_str("\"CALL_CREATE\"").unwrap();
        assert_eq!(parsed, GatewayEventType::Unknown("CALL_CREATE".to_string()));
    }
}
