//! Role model - a guild role with permissions

use serde::{Deserialize, Serialize};

use crate::value_objects::{Permissions, Snowflake};

/// Guild role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub mentionable: bool,
    #[serde(default)]
    pub icon: Option<String>,
}

impl Role {
    /// Create a new Role
    pub fn new(id: Snowflake, name: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            id,
            name: name.into(),
            color: 0,
            hoist: false,
            position: 0,
            permissions,
            managed: false,
            mentionable: false,
            icon: None,
        }
    }

    /// The `@everyone` role shares its ID with the guild
    #[inline]
    pub fn is_everyone(&self, guild_id: Snowflake) -> bool {
        self.id == guild_id
    }

    /// Compare role positions for hierarchy, breaking ties by ID
    #[inline]
    pub fn is_higher_than(&self, other: &Role) -> bool {
        (self.position, std::cmp::Reverse(self.id)) > (other.position, std::cmp::Reverse(other.id))
    }

    /// `<@&id>` mention string
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }

    /// Get the color as a hex string (without #)
    pub fn color_hex(&self) -> String {
        format!("{:06x}", self.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        let mut admin = Role::new(Snowflake::new(1), "Admin", Permissions::ADMINISTRATOR);
        admin.position = 10;
        let mut moderator = Role::new(Snowflake::new(2), "Mod", Permissions::KICK_MEMBERS);
        moderator.position = 5;

        assert!(admin.is_higher_than(&moderator));
        assert!(!moderator.is_higher_than(&admin));
    }

    #[test]
    fn test_equal_positions_prefer_older_role() {
        let older = Role::new(Snowflake::new(1), "a", Permissions::empty());
        let newer = Role::new(Snowflake::new(2), "b", Permissions::empty());
        assert!(older.is_higher_than(&newer));
    }

    #[test]
    fn test_role_payload() {
        let role: Role = serde_json::from_value(serde_json::json!({
            "id": "41771983423143936",
            "name": "WE DEM BOYZZ!!!!!!",
            "color": 3_447_003,
            "hoist": true,
            "position": 1,
            "permissions": "66321471",
            "managed": false,
            "mentionable": false
        }))
        .unwrap();
        assert!(role.permissions.contains(Permissions::KICK_MEMBERS));
        assert_eq!(role.color_hex(), "3498db");
        assert_eq!(role.mention(), "<@&41771983423143936>");
    }
}
