//! Limits command - prints the tier limit table

use clap::Args;
use serde::Serialize;

use crate::domain::usage::{limits_for, SubscriptionTier, UsageLimits};

#[derive(Args, Clone)]
pub struct LimitsArgs {
    /// Only print this tier
    #[arg(long)]
    pub tier: Option<SubscriptionTier>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TierLimits {
    tier: SubscriptionTier,
    display_name: &'static str,
    limits: UsageLimits,
}

fn table(tier: Option<SubscriptionTier>) -> Vec<TierLimits> {
    SubscriptionTier::ALL
        .into_iter()
        .filter(|t| tier.is_none_or(|wanted| wanted == *t))
        .map(|tier| TierLimits {
            tier,
            display_name: tier.display_name(),
            limits: limits_for(tier),
        })
        .collect()
}

/// Print limits; needs neither configuration nor the backend
pub async fn run(args: LimitsArgs) -> anyhow::Result<()> {
    super::print_json(&table(args.tier))
}
