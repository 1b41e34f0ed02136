//! Subscription tiers and their quota table

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Percentage reported for a feature without a cap
pub const UNLIMITED_PERCENTAGE: i64 = -1;

/// Subscription plan, ordered from cheapest to most capable
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionTier {
    #[default]
    #[serde(alias = "free")]
    Free,
    #[serde(alias = "pro")]
    Pro,
    #[serde(alias = "team")]
    Team,
    #[serde(alias = "enterprise")]
    Enterprise,
}

impl SubscriptionTier {
    /// All tiers in ascending order
    pub const ALL: [SubscriptionTier; 4] = [Self::Free, Self::Pro, Self::Team, Self::Enterprise];

    /// Quota table row for this tier
    pub fn limits(self) -> UsageLimits {
        limits_for(self)
    }

    /// Whether moving to `other` is an upgrade
    pub fn can_upgrade_to(self, other: SubscriptionTier) -> bool {
        other > self
    }

    /// The tier directly above this one
    pub fn next_tier(self) -> Option<SubscriptionTier> {
        match self {
            Self::Free => Some(Self::Pro),
            Self::Pro => Some(Self::Team),
            Self::Team => Some(Self::Enterprise),
            Self::Enterprise => None,
        }
    }

    /// Human-readable plan name
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Pro => "Pro",
            Self::Team => "Team",
            Self::Enterprise => "Enterprise",
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "FREE"),
            Self::Pro => write!(f, "PRO"),
            Self::Team => write!(f, "TEAM"),
            Self::Enterprise => write!(f, "ENTERPRISE"),
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "team" => Ok(Self::Team),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(format!("Unknown subscription tier: {}", other)),
        }
    }
}

/// Numeric types a quota can be expressed in
pub trait LimitValue: Copy + PartialEq + std::fmt::Debug {
    fn as_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

impl LimitValue for u64 {
    fn as_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value.round() as u64
    }
}

impl LimitValue for f64 {
    fn as_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

/// A quota that is either capped or unlimited.
///
/// Serialized as the bare number or `null`. A negative number on input is
/// read as unlimited, which is how older payloads encoded the user cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit<T> {
    Finite(T),
    Unlimited,
}

impl<T: LimitValue> Limit<T> {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    pub fn finite(&self) -> Option<T> {
        match self {
            Self::Finite(value) => Some(*value),
            Self::Unlimited => None,
        }
    }

    /// True when `usage` has reached a finite cap
    pub fn is_reached_by(&self, usage: T) -> bool
    where
        T: PartialOrd,
    {
        match self {
            Self::Finite(limit) => usage >= *limit,
            Self::Unlimited => false,
        }
    }

    /// Rounded share of the cap consumed by `usage`, or [`UNLIMITED_PERCENTAGE`]
    pub fn percentage_used(&self, usage: T) -> i64 {
        match self {
            Self::Unlimited => UNLIMITED_PERCENTAGE,
            Self::Finite(limit) => {
                let limit = limit.as_f64();
                if limit <= 0.0 {
                    return 100;
                }
                (usage.as_f64() / limit * 100.0).round() as i64
            }
        }
    }
}

impl<T: LimitValue + Serialize> Serialize for Limit<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Finite(value) => serializer.serialize_some(value),
            Self::Unlimited => serializer.serialize_none(),
        }
    }
}

impl<'de, T: LimitValue> Deserialize<'de> for Limit<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<f64>::deserialize(deserializer)?;
        Ok(match raw {
            Some(value) if value >= 0.0 => Self::Finite(T::from_f64(value)),
            _ => Self::Unlimited,
        })
    }
}

/// Per-tier quota record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimits {
    pub monthly_session_limit: Limit<u64>,
    pub max_users: Limit<u64>,
    pub max_reports_per_month: Limit<u64>,
    pub max_exports_per_month: Limit<u64>,
    pub api_calls_per_minute: u64,
    #[serde(rename = "maxStorageGB")]
    pub max_storage_gb: Limit<f64>,
}

/// Look up the quota row for a tier.
///
/// | Tier | Sessions/mo | Users | Reports/mo | Exports/mo | API/min | Storage GB |
/// |------|-------------|-------|------------|------------|---------|------------|
/// | Free | 100 | 1 | 10 | 3 | 60 | 1 |
/// | Pro | unlimited | 1 | unlimited | unlimited | 300 | 10 |
/// | Team | unlimited | 5 | unlimited | unlimited | 600 | 50 |
/// | Enterprise | unlimited | unlimited | unlimited | unlimited | 1200 | unlimited |
pub fn limits_for(tier: SubscriptionTier) -> UsageLimits {
    use Limit::{Finite, Unlimited};

    match tier {
        SubscriptionTier::Free => UsageLimits {
            monthly_session_limit: Finite(100),
            max_users: Finite(1),
            max_reports_per_month: Finite(10),
            max_exports_per_month: Finite(3),
            api_calls_per_minute: 60,
            max_storage_gb: Finite(1.0),
        },
        SubscriptionTier::Pro => UsageLimits {
            monthly_session_limit: Unlimited,
            max_users: Finite(1),
            max_reports_per_month: Unlimited,
            max_exports_per_month: Unlimited,
            api_calls_per_minute: 300,
            max_storage_gb: Finite(10.0),
        },
        SubscriptionTier::Team => UsageLimits {
            monthly_session_limit: Unlimited,
            max_users: Finite(5),
            max_reports_per_month: Unlimited,
            max_exports_per_month: Unlimited,
            api_calls_per_minute: 600,
            max_storage_gb: Finite(50.0),
        },
        SubscriptionTier::Enterprise => UsageLimits {
            monthly_session_limit: Unlimited,
            max_users: Unlimited,
            max_reports_per_month: Unlimited,
            max_exports_per_month: Unlimited,
            api_calls_per_minute: 1200,
            max_storage_gb: Unlimited,
        },
    }
}
