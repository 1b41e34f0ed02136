//! Quota gate for a single attempted action

use super::alert::{UsageAlert, UsageCheckResult};
use super::event::{EventMetadata, UsageEventType};
use super::stats::UsageStats;

/// Decide whether `event_type` may proceed given the current stats.
///
/// Each event type is checked against its own cap only. API calls are
/// always allowed here; per-minute rate limiting is not enforced.
pub fn check_usage_limit(
    stats: &UsageStats,
    event_type: UsageEventType,
    _metadata: Option<&EventMetadata>,
) -> UsageCheckResult {
    let limits = &stats.limits;
    let usage = &stats.usage;

    let reached = match event_type {
        UsageEventType::TriageSession => limits
            .monthly_session_limit
            .is_reached_by(usage.triage_sessions),
        UsageEventType::ReportGeneration => limits
            .max_reports_per_month
            .is_reached_by(usage.reports_generated),
        UsageEventType::DataExport => limits
            .max_exports_per_month
            .is_reached_by(usage.data_exports),
        UsageEventType::UserInvitation => limits.max_users.is_reached_by(usage.active_users),
        UsageEventType::ApiCall => false,
    };

    match (reached, event_type.feature()) {
        (true, Some(feature)) => UsageCheckResult::deny(UsageAlert::exceeded(stats, feature)),
        _ => UsageCheckResult::allow(),
    }
}

/// Convenience for callers that only need the gate decision
pub fn is_allowed(stats: &UsageStats, event_type: UsageEventType) -> bool {
    check_usage_limit(stats, event_type, None).allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::usage::alert::AlertType;
    use crate::domain::usage::event::UsageFeature;
    use crate::domain::usage::stats::{UsageCounters, UsagePeriod};
    use crate::domain::usage::tier::SubscriptionTier;

    fn stats(tier: SubscriptionTier, usage: UsageCounters) -> UsageStats {
        UsageStats::new("user-1", tier, UsagePeriod::current(), usage)
    }

    #[test]
    fn test_free_sessions_denied_at_limit() {
        let stats = stats(
            SubscriptionTier::Free,
            UsageCounters {
                triage_sessions: 100,
                ..Default::default()
            },
        );
        let result = check_usage_limit(&stats, UsageEventType::TriageSession, None);

        assert!(!result.allowed);
        let alert = result.alert.unwrap();
        assert_eq!(alert.alert_type, AlertType::Exceeded);
        assert_eq!(alert.feature, UsageFeature::TriageSession);
    }

    #[test]
    fn test_finite_limit_boundary_for_every_usage_value() {
        for used in 0..=12u64 {
            let stats = stats(
                SubscriptionTier::Free,
                UsageCounters {
                    reports_generated: used,
                    ..Default::default()
                },
            );
            let result = check_usage_limit(&stats, UsageEventType::ReportGeneration, None);
            assert_eq!(result.allowed, used < 10, "reports used = {}", used);
            assert_eq!(result.alert.is_some(), used >= 10);
        }
    }

    #[test]
    fn test_pro_sessions_unlimited() {
        let stats = stats(
            SubscriptionTier::Pro,
            UsageCounters {
                triage_sessions: 500,
                ..Default::default()
            },
        );
        let result = check_usage_limit(&stats, UsageEventType::TriageSession, None);

        assert!(result.allowed);
        assert!(result.alert.is_none());
    }

    #[test]
    fn test_free_exports_denied_at_three() {
        let stats = stats(
            SubscriptionTier::Free,
            UsageCounters {
                data_exports: 3,
                ..Default::default()
            },
        );
        let result = check_usage_limit(&stats, UsageEventType::DataExport, None);

        assert!(!result.allowed);
        assert_eq!(result.alert.unwrap().feature, UsageFeature::DataExport);
    }

    #[test]
    fn test_user_invitations_respect_seat_cap() {
        let team = stats(
            SubscriptionTier::Team,
            UsageCounters {
                active_users: 4,
                ..Default::default()
            },
        );
        assert!(is_allowed(&team, UsageEventType::UserInvitation));

        let full_team = stats(
            SubscriptionTier::Team,
            UsageCounters {
                active_users: 5,
                ..Default::default()
            },
        );
        assert!(!is_allowed(&full_team, UsageEventType::UserInvitation));

        let enterprise = stats(
            SubscriptionTier::Enterprise,
            UsageCounters {
                active_users: 10_000,
                ..Default::default()
            },
        );
        assert!(is_allowed(&enterprise, UsageEventType::UserInvitation));
    }

    #[test]
    fn test_api_calls_always_allowed() {
        let stats = stats(
            SubscriptionTier::Free,
            UsageCounters {
                api_calls: u64::MAX,
                ..Default::default()
            },
        );
        assert!(is_allowed(&stats, UsageEventType::ApiCall));
    }

    #[test]
    fn test_features_do_not_couple() {
        let stats = stats(
            SubscriptionTier::Free,
            UsageCounters {
                triage_sessions: 100,
                ..Default::default()
            },
        );
        assert!(is_allowed(&stats, UsageEventType::ReportGeneration));
        assert!(is_allowed(&stats, UsageEventType::DataExport));
    }
}
