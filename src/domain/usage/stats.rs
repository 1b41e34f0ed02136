//! Per-user usage counters for the current billing period

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::event::{UsageEvent, UsageEventType, UsageFeature};
use super::tier::{limits_for, SubscriptionTier, UsageLimits};

/// Counters accumulated over one billing period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageCounters {
    pub triage_sessions: u64,
    pub api_calls: u64,
    pub reports_generated: u64,
    pub data_exports: u64,
    pub active_users: u64,
    #[serde(rename = "storageUsedGB")]
    pub storage_used_gb: f64,
}

impl UsageCounters {
    /// Apply one allowed event
    pub fn apply(&mut self, event: &UsageEvent) {
        match event.event_type {
            UsageEventType::TriageSession => self.triage_sessions += 1,
            UsageEventType::ApiCall => self.api_calls += 1,
            UsageEventType::ReportGeneration => self.reports_generated += 1,
            UsageEventType::UserInvitation => self.active_users += 1,
            UsageEventType::DataExport => {
                self.data_exports += 1;
                if let Some(gb) = event.data_size_gb() {
                    self.storage_used_gb += gb;
                }
            }
        }
    }
}

/// Billing period window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl UsagePeriod {
    /// The calendar month containing `now`, ending on its last millisecond
    pub fn month_containing(now: DateTime<Utc>) -> Self {
        let start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(now);

        let (next_year, next_month) = if now.month() == 12 {
            (now.year() + 1, 1)
        } else {
            (now.year(), now.month() + 1)
        };

        let next_start = Utc
            .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
            .single()
            .unwrap_or(now);

        Self {
            start_date: start,
            end_date: next_start - Duration::milliseconds(1),
        }
    }

    pub fn current() -> Self {
        Self::month_containing(Utc::now())
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_date && at <= self.end_date
    }
}

/// Share of each quota consumed; `-1` marks an unlimited feature
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentagesUsed {
    pub sessions: i64,
    pub reports: i64,
    pub exports: i64,
    pub users: i64,
    pub storage: i64,
}

impl PercentagesUsed {
    pub fn compute(usage: &UsageCounters, limits: &UsageLimits) -> Self {
        Self {
            sessions: limits
                .monthly_session_limit
                .percentage_used(usage.triage_sessions),
            reports: limits
                .max_reports_per_month
                .percentage_used(usage.reports_generated),
            exports: limits
                .max_exports_per_month
                .percentage_used(usage.data_exports),
            users: limits.max_users.percentage_used(usage.active_users),
            storage: limits.max_storage_gb.percentage_used(usage.storage_used_gb),
        }
    }

    pub fn for_feature(&self, feature: UsageFeature) -> i64 {
        match feature {
            UsageFeature::TriageSession => self.sessions,
            UsageFeature::ReportGeneration => self.reports,
            UsageFeature::DataExport => self.exports,
            UsageFeature::UserInvitation => self.users,
            UsageFeature::Storage => self.storage,
        }
    }
}

/// Aggregate usage view for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub user_id: String,
    pub subscription_tier: SubscriptionTier,
    pub current_period: UsagePeriod,
    pub usage: UsageCounters,
    pub limits: UsageLimits,
    pub percentages_used: PercentagesUsed,
}

impl UsageStats {
    /// Build stats for a tier, resolving limits from the tier table
    pub fn new(
        user_id: impl Into<String>,
        tier: SubscriptionTier,
        period: UsagePeriod,
        usage: UsageCounters,
    ) -> Self {
        let limits = limits_for(tier);
        let percentages_used = PercentagesUsed::compute(&usage, &limits);

        Self {
            user_id: user_id.into(),
            subscription_tier: tier,
            current_period: period,
            usage,
            limits,
            percentages_used,
        }
    }

    /// Free tier, zero usage, current calendar month
    pub fn default_for(user_id: impl Into<String>) -> Self {
        Self::new(
            user_id,
            SubscriptionTier::Free,
            UsagePeriod::current(),
            UsageCounters::default(),
        )
    }

    /// Count an allowed event and refresh the derived percentages
    pub fn record(&mut self, event: &UsageEvent) {
        self.usage.apply(event);
        self.recompute_percentages();
    }

    pub fn recompute_percentages(&mut self) {
        self.percentages_used = PercentagesUsed::compute(&self.usage, &self.limits);
    }

    /// Current usage and limit for a feature, or None when uncapped
    pub fn usage_against_limit(&self, feature: UsageFeature) -> Option<(f64, f64)> {
        let usage = &self.usage;
        let limits = &self.limits;

        match feature {
            UsageFeature::TriageSession => limits
                .monthly_session_limit
                .finite()
                .map(|l| (usage.triage_sessions as f64, l as f64)),
            UsageFeature::ReportGeneration => limits
                .max_reports_per_month
                .finite()
                .map(|l| (usage.reports_generated as f64, l as f64)),
            UsageFeature::DataExport => limits
                .max_exports_per_month
                .finite()
                .map(|l| (usage.data_exports as f64, l as f64)),
            UsageFeature::UserInvitation => limits
                .max_users
                .finite()
                .map(|l| (usage.active_users as f64, l as f64)),
            UsageFeature::Storage => limits
                .max_storage_gb
                .finite()
                .map(|l| (usage.storage_used_gb, l)),
        }
    }

    /// Units left before the cap, or None when uncapped
    pub fn remaining(&self, feature: UsageFeature) -> Option<f64> {
        self.usage_against_limit(feature)
            .map(|(usage, limit)| (limit - usage).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::usage::event::{EventMetadata, DATA_SIZE_KEY};

    #[test]
    fn test_default_stats_are_free_and_empty() {
        let stats = UsageStats::default_for("user-1");
        assert_eq!(stats.subscription_tier, SubscriptionTier::Free);
        assert_eq!(stats.usage, UsageCounters::default());
        assert_eq!(stats.percentages_used.sessions, 0);
        assert_eq!(stats.limits, limits_for(SubscriptionTier::Free));
        assert!(stats.current_period.contains(Utc::now()));
    }

    #[test]
    fn test_month_boundaries() {
        let now = Utc.with_ymd_and_hms(2024, 2, 14, 10, 30, 0).unwrap();
        let period = UsagePeriod::month_containing(now);
        assert_eq!(period.start_date, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(
            period.end_date,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() - Duration::milliseconds(1)
        );

        let december = UsagePeriod::month_containing(
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap(),
        );
        assert_eq!(
            december.end_date,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() - Duration::milliseconds(1)
        );
    }

    #[test]
    fn test_record_session_updates_percentage() {
        let mut stats = UsageStats::default_for("user-1");
        stats.usage.triage_sessions = 79;
        stats.record(&UsageEvent::new("user-1", UsageEventType::TriageSession));

        assert_eq!(stats.usage.triage_sessions, 80);
        assert_eq!(stats.percentages_used.sessions, 80);
    }

    #[test]
    fn test_unlimited_features_report_sentinel() {
        let stats = UsageStats::new(
            "user-1",
            SubscriptionTier::Pro,
            UsagePeriod::current(),
            UsageCounters {
                triage_sessions: 500,
                ..Default::default()
            },
        );

        assert_eq!(stats.percentages_used.sessions, -1);
        assert_eq!(stats.percentages_used.reports, -1);
        assert_eq!(stats.percentages_used.exports, -1);
        assert_eq!(stats.percentages_used.users, 0);
        assert_eq!(stats.remaining(UsageFeature::TriageSession), None);
    }

    #[test]
    fn test_export_adds_storage() {
        let mut stats = UsageStats::default_for("user-1");
        let mut metadata = EventMetadata::new();
        metadata.insert(DATA_SIZE_KEY.to_string(), serde_json::json!(268_435_456u64));
        let event = UsageEvent::new("user-1", UsageEventType::DataExport).with_metadata(metadata);

        stats.record(&event);

        assert_eq!(stats.usage.data_exports, 1);
        assert_eq!(stats.usage.storage_used_gb, 0.25);
        assert_eq!(stats.percentages_used.storage, 25);
        assert_eq!(stats.percentages_used.exports, 33);
    }

    #[test]
    fn test_api_calls_have_no_percentage() {
        let mut stats = UsageStats::default_for("user-1");
        stats.record(&UsageEvent::new("user-1", UsageEventType::ApiCall));
        assert_eq!(stats.usage.api_calls, 1);
        assert_eq!(stats.percentages_used, PercentagesUsed::default());
    }

    #[test]
    fn test_remaining_never_negative() {
        let mut stats = UsageStats::default_for("user-1");
        stats.usage.data_exports = 5;
        assert_eq!(stats.remaining(UsageFeature::DataExport), Some(0.0));
    }
}
