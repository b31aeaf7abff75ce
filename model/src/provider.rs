//! Immutable reward snapshot delivered by a reward-data provider for
//! one cycle.

use {
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// Per-delegator balances, minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DelegatorBalance {
    /// Balance delegated to the baker at the cycle's snapshot.
    pub staking_balance: u64,
    /// Spendable balance of the delegator right now (zero-balance gate
    /// input; refreshed before retries).
    pub current_balance: u64,
}

/// Aggregate cycle totals plus the delegator balance map, produced by
/// an external data-provider adapter and normalized into this shape.
///
/// All amounts are minor units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardProviderModel {
    /// The baker's own delegated stake.
    pub own_delegated_balance: u64,
    /// Stake delegated by third parties.
    pub external_delegated_balance: u64,

    /// Total reward as recorded in-protocol.
    pub total_reward_amount: u64,
    /// Baking rewards, fees and revelation rewards (itemized).
    pub rewards_and_fees: u64,
    /// Losses from double baking/endorsing.
    pub equivocation_losses: u64,
    /// Rewards from denouncing other bakers' equivocations.
    pub denunciation_rewards: u64,
    /// Rewards missed while the baker was offline.
    pub offline_losses: u64,

    /// Reward amount to actually distribute, derived from the totals
    /// above according to the operator's rewards-type settings.
    pub computed_reward_amount: u64,

    /// Delegator address → balances.
    pub delegators: HashMap<String, DelegatorBalance>,
}

impl RewardProviderModel {
    /// Total stake backing the baker (own + external).
    pub fn delegate_staking_balance(&self) -> u64 {
        self.own_delegated_balance
            .saturating_add(self.external_delegated_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegate_staking_balance_sums() {
        let model = RewardProviderModel {
            own_delegated_balance: 1_000,
            external_delegated_balance: 9_000,
            ..Default::default()
        };
        assert_eq!(model.delegate_staking_balance(), 10_000);
    }
}
