//! Guild model - a server with its roles, channels, members, and presences
//!
//! Collections arrive as arrays and are indexed by ID on deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::user::CDN_BASE;
use super::{Channel, ChannelType, Emoji, Member, OverwriteKind, Presence, Role};
use crate::value_objects::{Permissions, Snowflake};

/// Objects that can be indexed by their ID
pub trait Identified {
    fn key(&self) -> Snowflake;
}

impl Identified for Role {
    fn key(&self) -> Snowflake {
        self.id
    }
}

impl Identified for Channel {
    fn key(&self) -> Snowflake {
        self.id
    }
}

impl Identified for Emoji {
    fn key(&self) -> Snowflake {
        self.id
    }
}

impl Identified for Member {
    fn key(&self) -> Snowflake {
        self.user.id
    }
}

impl Identified for Presence {
    fn key(&self) -> Snowflake {
        self.user.id
    }
}

/// Serde adapter: JSON array <-> `HashMap<Snowflake, T>`
mod id_map {
    use super::Identified;
    use crate::value_objects::Snowflake;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S, T>(map: &HashMap<Snowflake, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<HashMap<Snowflake, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Identified,
    {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(items.into_iter().map(|item| (item.key(), item)).collect())
    }
}

/// Guild that is not available (outage, or not yet sent after READY)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

/// Guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Snowflake,
    #[serde(default, with = "id_map")]
    pub roles: HashMap<Snowflake, Role>,
    #[serde(default, with = "id_map")]
    pub emojis: HashMap<Snowflake, Emoji>,
    #[serde(default, with = "id_map")]
    pub channels: HashMap<Snowflake, Channel>,
    #[serde(default, with = "id_map")]
    pub members: HashMap<Snowflake, Member>,
    #[serde(default, with = "id_map")]
    pub presences: HashMap<Snowflake, Presence>,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub large: bool,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub premium_tier: u8,
    #[serde(default)]
    pub premium_subscription_count: u32,
    #[serde(default)]
    pub verification_level: u8,
    #[serde(default)]
    pub system_channel_id: Option<Snowflake>,
    #[serde(default)]
    pub afk_channel_id: Option<Snowflake>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

impl Guild {
    /// Create an empty guild with an `@everyone` role
    pub fn new(id: Snowflake, name: impl Into<String>, owner_id: Snowflake) -> Self {
        let everyone = Role::new(id, "@everyone", Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES);
        Self {
            id,
            name: name.into(),
            icon: None,
            banner: None,
            description: None,
            owner_id,
            roles: HashMap::from([(id, everyone)]),
            emojis: HashMap::new(),
            channels: HashMap::new(),
            members: HashMap::new(),
            presences: HashMap::new(),
            member_count: 0,
            large: false,
            unavailable: false,
            features: Vec::new(),
            premium_tier: 0,
            premium_subscription_count: 0,
            verification_level: 0,
            system_channel_id: None,
            afk_channel_id: None,
            joined_at: None,
        }
    }

    /// Stamp `guild_id` onto nested channels and members, which omit it
    pub fn fill_guild_ids(&mut self) {
        let id = self.id;
        for channel in self.channels.values_mut() {
            channel.guild_id = Some(id);
        }
        for member in self.members.values_mut() {
            member.guild_id = Some(id);
        }
        for presence in self.presences.values_mut() {
            presence.guild_id = Some(id);
        }
    }

    /// Copy fields from a GUILD_UPDATE payload, keeping cached collections
    /// the update does not carry
    pub fn apply_update(&mut self, update: Guild) {
        let members = std::mem::take(&mut self.members);
        let presences = std::mem::take(&mut self.presences);
        let channels = std::mem::take(&mut self.channels);
        let member_count = self.member_count;
        let large = self.large;
        let joined_at = self.joined_at;

        *self = update;
        self.members = members;
        self.presences = presences;
        if self.channels.is_empty() {
            self.channels = channels;
        }
        if self.member_count == 0 {
            self.member_count = member_count;
        }
        self.large |= large;
        self.joined_at = self.joined_at.or(joined_at);
    }

    /// The `@everyone` role
    #[inline]
    pub fn everyone_role(&self) -> Option<&Role> {
        self.roles.get(&self.id)
    }

    #[inline]
    pub fn member(&self, user_id: Snowflake) -> Option<&Member> {
        self.members.get(&user_id)
    }

    #[inline]
    pub fn role(&self, role_id: Snowflake) -> Option<&Role> {
        self.roles.get(&role_id)
    }

    #[inline]
    pub fn channel(&self, channel_id: Snowflake) -> Option<&Channel> {
        self.channels.get(&channel_id)
    }

    /// Find a role by exact name
    pub fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.roles.values().find(|r| r.name == name)
    }

    /// Find a member by username, global name, nickname, or `name#discrim`
    pub fn member_named(&self, name: &str) -> Option<&Member> {
        if let Some((username, discriminator)) = name.rsplit_once('#') {
            if discriminator.len() == 4 {
                if let Some(member) = self.members.values().find(|m| {
                    m.user.username == username && m.user.discriminator == discriminator
                }) {
                    return Some(member);
                }
            }
        }
        self.members.values().find(|m| {
            m.user.username == name
                || m.user.global_name.as_deref() == Some(name)
                || m.nick.as_deref() == Some(name)
        })
    }

    /// Text channels sorted by position
    pub fn text_channels(&self) -> Vec<&Channel> {
        let mut channels: Vec<&Channel> = self
            .channels
            .values()
            .filter(|c| matches!(c.kind, ChannelType::GuildText | ChannelType::GuildNews))
            .collect();
        channels.sort_by_key(|c| (c.position, c.id));
        channels
    }

    /// Highest role the member has
    pub fn top_role(&self, member: &Member) -> Option<&Role> {
        member
            .roles
            .iter()
            .filter_map(|id| self.roles.get(id))
            .chain(self.everyone_role())
            .reduce(|top, role| if role.is_higher_than(top) { role } else { top })
    }

    /// Whether every member has been received
    pub fn is_chunked(&self) -> bool {
        self.members.len() as u64 >= self.member_count
    }

    /// Shard that receives this guild's events
    #[inline]
    pub fn shard_id(&self, shard_count: u64) -> u64 {
        if shard_count == 0 {
            return 0;
        }
        (self.id.get() >> 22) % shard_count
    }

    pub fn icon_url(&self) -> Option<String> {
        self.icon.as_ref().map(|hash| {
            let ext = if hash.starts_with("a_") { "gif" } else { "png" };
            format!("{CDN_BASE}/icons/{}/{hash}.{ext}", self.id)
        })
    }

    /// Guild-wide permissions of a member
    pub fn guild_permissions(&self, member: &Member) -> Permissions {
        self.compute_permissions(member, None, Utc::now())
    }

    /// Permissions of a member in a channel of this guild
    pub fn permissions_for(&self, member: &Member, channel: &Channel) -> Permissions {
        self.compute_permissions(member, Some(channel), Utc::now())
    }

    /// Permission resolution at a fixed point in time
    pub fn compute_permissions(
        &self,
        member: &Member,
        channel: Option<&Channel>,
        now: DateTime<Utc>,
    ) -> Permissions {
        if member.id() == self.owner_id {
            return Permissions::all();
        }

        let everyone = self
            .everyone_role()
            .map_or(Permissions::empty(), |r| r.permissions);
        let mut base = everyone
            | Permissions::combine(
                member
                    .roles
                    .iter()
                    .filter_map(|id| self.roles.get(id))
                    .map(|r| r.permissions),
            );

        if base.contains(Permissions::ADMINISTRATOR) {
            return Permissions::all();
        }

        if let Some(channel) = channel {
            if let Some(ow) = channel.overwrite_for(self.id) {
                base = base.overwrite(ow.allow, ow.deny);
            }

            let (mut allow, mut deny) = (Permissions::empty(), Permissions::empty());
            for ow in &channel.permission_overwrites {
                if ow.kind == OverwriteKind::Role && ow.id != self.id && member.has_role(ow.id) {
                    allow |= ow.allow;
                    deny |= ow.deny;
                }
            }
            base = base.overwrite(allow, deny);

            if let Some(ow) = channel
                .permission_overwrites
                .iter()
                .find(|o| o.kind == OverwriteKind::Member && o.id == member.id())
            {
                base = base.overwrite(ow.allow, ow.deny);
            }
        }

        if member.is_timed_out_at(now) {
            base &= Permissions::TIMEOUT_ALLOWED;
        }

        if channel.is_some() {
            if !base.contains(Permissions::VIEW_CHANNEL) {
                return Permissions::empty();
            }
            if !base.contains(Permissions::SEND_MESSAGES) {
                base -= Permissions::SEND_DEPENDENT;
            }
        }

        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PermissionOverwrite, User};
    use chrono::Duration;

    const GUILD: Snowflake = Snowflake::new(1);
    const MOD_ROLE: Snowflake = Snowflake::new(2);
    const MUTED_ROLE: Snowflake = Snowflake::new(3);
    const CHANNEL: Snowflake = Snowflake::new(10);

    fn guild() -> Guild {
        let mut guild = Guild::new(GUILD, "test", Snowflake::new(100));
        guild.roles.insert(MOD_ROLE, Role::new(MOD_ROLE, "mod", Permissions::KICK_MEMBERS | Permissions::MANAGE_MESSAGES));
        guild.roles.insert(MUTED_ROLE, Role::new(MUTED_ROLE, "muted", Permissions::empty()));
        guild
    }

    fn member(id: u64, roles: &[Snowflake]) -> Member {
        let mut member = Member::new(User::new(Snowflake::new(id), "m"), GUILD);
        member.roles = roles.to_vec();
        member
    }

    fn channel(overwrites: Vec<PermissionOverwrite>) -> Channel {
        let mut channel = Channel::new_text(CHANNEL, GUILD, "general");
        channel.permission_overwrites = overwrites;
        channel
    }

    fn overwrite(id: Snowflake, kind: OverwriteKind, allow: Permissions, deny: Permissions) -> PermissionOverwrite {
        PermissionOverwrite { id, kind, allow, deny }
    }

    #[test]
    fn test_owner_has_everything() {
        let guild = guild();
        let owner = member(100, &[]);
        let ch = channel(vec![overwrite(GUILD, OverwriteKind::Role, Permissions::empty(), Permissions::VIEW_CHANNEL)]);
        assert_eq!(guild.permissions_for(&owner, &ch), Permissions::all());
    }

    #[test]
    fn test_base_is_everyone_plus_roles() {
        let guild = guild();
        let perms = guild.guild_permissions(&member(5, &[MOD_ROLE]));
        assert!(perms.contains(Permissions::VIEW_CHANNEL | Permissions::KICK_MEMBERS));
        assert!(!perms.contains(Permissions::BAN_MEMBERS));
    }

    #[test]
    fn test_administrator_ignores_overwrites() {
        let mut guild = guild();
        guild.roles.get_mut(&MOD_ROLE).unwrap().permissions = Permissions::ADMINISTRATOR;
        let ch = channel(vec![overwrite(GUILD, OverwriteKind::Role, Permissions::empty(), Permissions::VIEW_CHANNEL)]);
        assert_eq!(guild.permissions_for(&member(5, &[MOD_ROLE]), &ch), Permissions::all());
    }

    #[test]
    fn test_overwrite_order() {
        let guild = guild();
        let ch = channel(vec![
            overwrite(GUILD, OverwriteKind::Role, Permissions::empty(), Permissions::SEND_MESSAGES),
            overwrite(MOD_ROLE, OverwriteKind::Role, Permissions::SEND_MESSAGES, Permissions::empty()),
            overwrite(MUTED_ROLE, OverwriteKind::Role, Permissions::empty(), Permissions::SEND_MESSAGES),
            overwrite(Snowflake::new(6), OverwriteKind::Member, Permissions::empty(), Permissions::SEND_MESSAGES),
        ]);

        // Everyone denied
        assert!(!guild.permissions_for(&member(5, &[]), &ch).contains(Permissions::SEND_MESSAGES));
        // Role allow beats everyone deny
        assert!(guild.permissions_for(&member(5, &[MOD_ROLE]), &ch).contains(Permissions::SEND_MESSAGES));
        // Role allow wins over role deny once combined
        assert!(guild
            .permissions_for(&member(5, &[MOD_ROLE, MUTED_ROLE]), &ch)
            .contains(Permissions::SEND_MESSAGES));
        // Member overwrite is applied last
        assert!(!guild.permissions_for(&member(6, &[MOD_ROLE]), &ch).contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_no_view_channel_means_nothing() {
        let guild = guild();
        let ch = channel(vec![overwrite(GUILD, OverwriteKind::Role, Permissions::empty(), Permissions::VIEW_CHANNEL)]);
        assert_eq!(guild.permissions_for(&member(5, &[MOD_ROLE]), &ch), Permissions::empty());
    }

    #[test]
    fn test_no_send_drops_dependents() {
        let mut guild = guild();
        guild.roles.get_mut(&GUILD).unwrap().permissions =
            Permissions::VIEW_CHANNEL | Permissions::EMBED_LINKS | Permissions::ATTACH_FILES;
        let perms = guild.permissions_for(&member(5, &[]), &channel(vec![]));
        assert_eq!(perms, Permissions::VIEW_CHANNEL);
    }

    #[test]
    fn test_timed_out_member_keeps_read_only() {
        let guild = guild();
        let mut m = member(5, &[MOD_ROLE]);
        let now = Utc::now();
        m.communication_disabled_until = Some(now + Duration::hours(1));
        let perms = guild.compute_permissions(&m, Some(&channel(vec![])), now);
        assert_eq!(perms, Permissions::VIEW_CHANNEL);

        let perms = guild.compute_permissions(&m, Some(&channel(vec![])), now + Duration::hours(2));
        assert!(perms.contains(Permissions::SEND_MESSAGES | Permissions::KICK_MEMBERS));
    }

    #[test]
    fn test_guild_create_payload() {
        let mut guild: Guild = serde_json::from_value(serde_json::json!({
            "id": "1",
            "name": "Test",
            "owner_id": "100",
            "member_count": 3,
            "large": false,
            "roles": [{"id": "1", "name": "@everyone", "permissions": "3072"}],
            "channels": [{"id": "10", "type": 0, "name": "general", "position": 1},
                         {"id": "11", "type": 4, "name": "Category"}],
            "members": [{"user": {"id": "100", "username": "owner"}, "roles": []}],
            "presences": [{"user": {"id": "100"}, "status": "online"}]
        }))
        .unwrap();
        guild.fill_guild_ids();

        assert_eq!(guild.channel(CHANNEL).unwrap().guild_id, Some(GUILD));
        assert_eq!(guild.text_channels().len(), 1);
        assert!(!guild.is_chunked());
        assert_eq!(guild.member_named("owner").unwrap().id(), Snowflake::new(100));
        assert!(guild.everyone_role().is_some());
    }

    #[test]
    fn test_apply_update_keeps_members() {
        let mut guild = guild();
        guild.members.insert(Snowflake::new(5), member(5, &[]));
        guild.member_count = 1;
        let mut update = Guild::new(GUILD, "renamed", Snowflake::new(100));
        update.roles.clear();
        guild.apply_update(update);
        assert_eq!(guild.name, "renamed");
        assert_eq!(guild.members.len(), 1);
        assert_eq!(guild.member_count, 1);
    }

    #[test]
    fn test_shard_id() {
        let guild = Guild::new(Snowflake::new(41_771_983_423_143_936), "g", Snowflake::new(1));
        assert_eq!(guild.shard_id(1), 0);
        assert_eq!(guild.shard_id(2), (41_771_983_423_143_936u64 >> 22) % 2);
        assert_eq!(guild.shard_id(0), 0);
    }
}
