//! Subscription models - billing subscriptions and guild boosts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Billing subscription status, serialized as an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum SubscriptionStatus {
    Unpaid,
    Active,
    PastDue,
    Canceled,
    Ended,
    Inactive,
    Account,
    Unknown(u8),
}

impl From<u8> for SubscriptionStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Unpaid,
            1 => Self::Active,
            2 => Self::PastDue,
            3 => Self::Canceled,
            4 => Self::Ended,
            5 => Self::Inactive,
            6 => Self::Account,
            other => Self::Unknown(other),
        }
    }
}

impl From<SubscriptionStatus> for u8 {
    fn from(value: SubscriptionStatus) -> Self {
        match value {
            SubscriptionStatus::Unpaid => 0,
            SubscriptionStatus::Active => 1,
            SubscriptionStatus::PastDue => 2,
            SubscriptionStatus::Canceled => 3,
            SubscriptionStatus::Ended => 4,
            SubscriptionStatus::Inactive => 5,
            SubscriptionStatus::Account => 6,
            SubscriptionStatus::Unknown(other) => other,
        }
    }
}

/// Billing subscription of the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Snowflake,
    #[serde(rename = "type", default)]
    pub kind: u8,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub plan_id: Option<Snowflake>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub current_period_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_source_id: Option<Snowflake>,
}

impl Subscription {
    /// Whether the subscription still grants its perks
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue | SubscriptionStatus::Account
        )
    }

    /// Whether cancellation is pending at period end
    pub fn is_canceled(&self) -> bool {
        self.status == SubscriptionStatus::Canceled || self.canceled_at.is_some()
    }
}

/// A boost applied to a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumGuildSubscription {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    #[serde(default)]
    pub ended: bool,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}
