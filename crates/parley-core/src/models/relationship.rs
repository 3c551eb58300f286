//! Relationship model - friends, blocks, and pending requests

use serde::{Deserialize, Serialize};

use super::User;
use crate::value_objects::Snowflake;

/// Relationship type, serialized as an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum RelationshipType {
    None,
    Friend,
    Blocked,
    IncomingRequest,
    OutgoingRequest,
    Implicit,
    Unknown(u8),
}

impl From<u8> for RelationshipType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Friend,
            2 => Self::Blocked,
            3 => Self::IncomingRequest,
            4 => Self::OutgoingRequest,
            5 => Self::Implicit,
            other => Self::Unknown(other),
        }
    }
}

impl From<RelationshipType> for u8 {
    fn from(value: RelationshipType) -> Self {
        match value {
            RelationshipType::None => 0,
            RelationshipType::Friend => 1,
            RelationshipType::Blocked => 2,
            RelationshipType::IncomingRequest => 3,
            RelationshipType::OutgoingRequest => 4,
            RelationshipType::Implicit => 5,
            RelationshipType::Unknown(other) => other,
        }
    }
}

/// A relationship with another user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: RelationshipType,
    pub user: User,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl Relationship {
    #[inline]
    pub fn is_friend(&self) -> bool {
        self.kind == RelationshipType::Friend
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(
            self.kind,
            RelationshipType::IncomingRequest | RelationshipType::OutgoingRequest
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_payload() {
        let rel: Relationship = serde_json::from_value(serde_json::json!({
            "id": "5",
            "type": 3,
            "user": {"id": "5", "username": "pending"}
        }))
        .unwrap();
        assert!(rel.is_pending());
        assert!(!rel.is_friend());
        assert_eq!(serde_json::to_value(&rel).unwrap()["type"], 3);
    }
}
