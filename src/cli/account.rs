//! Plan management commands

use clap::Args;
use serde_json::json;

use super::UserArgs;
use crate::domain::usage::SubscriptionTier;
use crate::infrastructure::usage::UsageTrackerTrait;

#[derive(Args, Clone)]
pub struct SetTierArgs {
    /// User ID
    pub user_id: String,

    /// New tier: free, pro, team or enterprise
    pub tier: SubscriptionTier,
}

pub async fn run_set_tier(args: SetTierArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let tracker = super::tracker(&config)?;

    tracker
        .update_subscription_tier(&args.user_id, args.tier)
        .await?;

    let stats = tracker.get_user_usage_stats(&args.user_id, false).await;
    super::print_json(&stats)
}

pub async fn run_reset_period(args: UserArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let tracker = super::tracker(&config)?;

    tracker.reset_usage_for_new_period(&args.user_id).await?;
    super::print_json(&json!({ "userId": args.user_id, "reset": true }))
}
