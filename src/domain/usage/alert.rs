//! Usage alerts and threshold evaluation

use serde::{Deserialize, Serialize};

use super::event::UsageFeature;
use super::stats::UsageStats;
use super::tier::{limits_for, SubscriptionTier, UsageLimits};

/// Percentage at which a warning is raised
pub const WARNING_THRESHOLD: i64 = 80;
/// Percentage at which a critical alert is raised
pub const CRITICAL_THRESHOLD: i64 = 95;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Warning,
    Critical,
    Exceeded,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
            Self::Exceeded => write!(f, "exceeded"),
        }
    }
}

/// A derived notice about quota consumption. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageAlert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub feature: UsageFeature,
    pub current_usage: f64,
    pub limit: f64,
    pub percentage_used: i64,
    pub message: String,
    pub recommended_action: String,
    pub upgrade_required: bool,
}

impl UsageAlert {
    /// Alert for an action that was denied because the cap is reached
    pub fn exceeded(stats: &UsageStats, feature: UsageFeature) -> Self {
        let (current_usage, limit) = stats.usage_against_limit(feature).unwrap_or((0.0, 0.0));
        let upgrade = recommended_upgrade(stats.subscription_tier, feature);

        Self {
            alert_type: AlertType::Exceeded,
            feature,
            current_usage,
            limit,
            percentage_used: stats.percentages_used.for_feature(feature),
            message: message_for(feature, AlertType::Exceeded, current_usage, limit),
            recommended_action: exceeded_action(feature, upgrade),
            upgrade_required: true,
        }
    }

    fn threshold(
        stats: &UsageStats,
        feature: UsageFeature,
        alert_type: AlertType,
        current_usage: f64,
        limit: f64,
    ) -> Self {
        Self {
            alert_type,
            feature,
            current_usage,
            limit,
            percentage_used: stats.percentages_used.for_feature(feature),
            message: message_for(feature, alert_type, current_usage, limit),
            recommended_action: threshold_action(feature, alert_type).to_string(),
            upgrade_required: false,
        }
    }
}

/// Outcome of a quota check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageCheckResult {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<UsageAlert>,
}

impl UsageCheckResult {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            alert: None,
        }
    }

    pub fn deny(alert: UsageAlert) -> Self {
        Self {
            allowed: false,
            alert: Some(alert),
        }
    }
}

/// Warning and critical alerts for every capped feature, in feature order.
///
/// At most one alert per feature. Never emits `Exceeded`; those only come
/// from a denied check.
pub fn alerts_for(stats: &UsageStats) -> Vec<UsageAlert> {
    UsageFeature::ALL
        .iter()
        .filter_map(|&feature| {
            let (current_usage, limit) = stats.usage_against_limit(feature)?;
            let percentage = stats.percentages_used.for_feature(feature);

            let alert_type = if percentage >= CRITICAL_THRESHOLD {
                AlertType::Critical
            } else if percentage >= WARNING_THRESHOLD {
                AlertType::Warning
            } else {
                return None;
            };

            Some(UsageAlert::threshold(
                stats,
                feature,
                alert_type,
                current_usage,
                limit,
            ))
        })
        .collect()
}

/// Lowest tier above `current` that raises the cap for `feature`
pub fn recommended_upgrade(
    current: SubscriptionTier,
    feature: UsageFeature,
) -> Option<SubscriptionTier> {
    let current_cap = cap_of(&limits_for(current), feature);

    SubscriptionTier::ALL
        .into_iter()
        .filter(|tier| current.can_upgrade_to(*tier))
        .find(|tier| match (cap_of(&limits_for(*tier), feature), current_cap) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(candidate), Some(existing)) => candidate > existing,
        })
}

fn cap_of(limits: &UsageLimits, feature: UsageFeature) -> Option<f64> {
    match feature {
        UsageFeature::TriageSession => limits.monthly_session_limit.finite().map(|v| v as f64),
        UsageFeature::ReportGeneration => limits.max_reports_per_month.finite().map(|v| v as f64),
        UsageFeature::DataExport => limits.max_exports_per_month.finite().map(|v| v as f64),
        UsageFeature::UserInvitation => limits.max_users.finite().map(|v| v as f64),
        UsageFeature::Storage => limits.max_storage_gb.finite(),
    }
}

fn feature_noun(feature: UsageFeature) -> &'static str {
    match feature {
        UsageFeature::TriageSession => "triage sessions",
        UsageFeature::ReportGeneration => "reports",
        UsageFeature::DataExport => "data exports",
        UsageFeature::UserInvitation => "team seats",
        UsageFeature::Storage => "storage",
    }
}

fn message_for(feature: UsageFeature, alert_type: AlertType, usage: f64, limit: f64) -> String {
    let noun = feature_noun(feature);

    match (feature, alert_type) {
        (UsageFeature::Storage, AlertType::Exceeded) => {
            format!("You've used all {} GB of your storage.", limit)
        }
        (UsageFeature::Storage, _) => {
            format!("You've used {:.2} GB of your {} GB storage.", usage, limit)
        }
        (UsageFeature::UserInvitation, AlertType::Exceeded) => format!(
            "Your plan includes {} user(s) and all seats are taken.",
            limit
        ),
        (_, AlertType::Exceeded) => format!(
            "You've reached your monthly limit of {} {}.",
            limit, noun
        ),
        (_, AlertType::Critical) => format!(
            "Almost out: {} of {} {} used this month.",
            usage, limit, noun
        ),
        (_, AlertType::Warning) => format!(
            "You've used {} of {} {} this month.",
            usage, limit, noun
        ),
    }
}

fn threshold_action(feature: UsageFeature, alert_type: AlertType) -> &'static str {
    match (feature, alert_type) {
        (UsageFeature::TriageSession, AlertType::Critical) => {
            "Upgrade now to keep running triage sessions without interruption."
        }
        (UsageFeature::TriageSession, _) => "Consider upgrading for unlimited triage sessions.",
        (UsageFeature::ReportGeneration, AlertType::Critical) => {
            "Upgrade now to keep generating reports this month."
        }
        (UsageFeature::ReportGeneration, _) => "Consider upgrading for unlimited reports.",
        (UsageFeature::DataExport, AlertType::Critical) => {
            "Upgrade now to keep exporting data this month."
        }
        (UsageFeature::DataExport, _) => "Consider upgrading for unlimited data exports.",
        (UsageFeature::UserInvitation, AlertType::Critical) => {
            "Upgrade your plan before inviting more teammates."
        }
        (UsageFeature::UserInvitation, _) => "Consider a Team plan to add more users.",
        (UsageFeature::Storage, AlertType::Critical) => {
            "Free up space or upgrade for more storage."
        }
        (UsageFeature::Storage, _) => "Review stored exports or upgrade for more storage.",
    }
}

fn exceeded_action(feature: UsageFeature, upgrade: Option<SubscriptionTier>) -> String {
    match upgrade {
        Some(tier) => format!(
            "Upgrade to {} to get more {}.",
            tier.display_name(),
            feature_noun(feature)
        ),
        None => format!(
            "Contact support to raise your {} limit.",
            feature_noun(feature)
        ),
    }
}
