//! Boundary trait for reward-data providers.
//!
//! The daemon only depends on the shape of the data; [`crate::reward`]
//! carries the archive-node implementation, indexer adapters live
//! outside this workspace.

use {
    crate::error::Result,
    payout_model::{RewardLog, RewardProviderModel},
};

pub trait RewardProvider: Send + Sync {
    /// Fetch the reward snapshot for `cycle`: per-delegator balances at
    /// the cycle snapshot plus the baker's reward totals.
    fn rewards_for_cycle(&self, cycle: u64) -> Result<RewardProviderModel>;

    /// Refresh `current_balance` on each entry. Called before a retry
    /// run so the zero-balance gate sees the present state, not the
    /// state at the original failure.
    fn refresh_current_balances(&self, entries: &mut [RewardLog]) -> Result<()>;
}
