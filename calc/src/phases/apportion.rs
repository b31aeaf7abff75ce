//! Phase 0 — apportion the pool over the delegator set.

use {
    super::OWNERS_PARENT_ADDRESS,
    crate::error::{CalcError, Result},
    payout_model::{EntryType, RewardLog, RewardProviderModel},
};

/// Build one entry per delegator with `ratio0 = staking_balance /
/// total_delegated`, plus a synthetic owners-parent entry holding the
/// remainder `1 − Σratio0` (the baker's own, undelegated stake share).
///
/// Returns the fresh entry list and the pool total (the provider's
/// computed reward amount). Delegators are walked in address order so
/// the output is deterministic.
pub fn apportion(provider: &RewardProviderModel) -> Result<(Vec<RewardLog>, u64)> {
    let total_staking = provider.delegate_staking_balance();
    if total_staking == 0 {
        return Err(CalcError::ZeroStakingBalance);
    }

    let mut addresses: Vec<&String> = provider.delegators.keys().collect();
    addresses.sort();

    let mut entries = Vec::with_capacity(provider.delegators.len() + 1);
    let mut ratio_sum = 0.0_f64;
    let mut delegator_balance_sum = 0_u64;

    for address in addresses {
        let balance = provider.delegators[address];
        let ratio = balance.staking_balance as f64 / total_staking as f64;

        let mut entry = RewardLog::new(
            address.clone(),
            EntryType::Delegator,
            balance.staking_balance,
            balance.current_balance,
        );
        entry.ratio = ratio;
        entry.ratio0 = Some(ratio);

        ratio_sum += ratio;
        delegator_balance_sum += balance.staking_balance;
        entries.push(entry);
    }

    // The baker's own share: whatever stake is not externally delegated.
    let mut owners_parent = RewardLog::new(
        OWNERS_PARENT_ADDRESS,
        EntryType::OwnersParent,
        total_staking.saturating_sub(delegator_balance_sum),
        0,
    );
    owners_parent.ratio = 1.0 - ratio_sum;
    owners_parent.ratio0 = Some(owners_parent.ratio);
    entries.push(owners_parent);

    Ok((entries, provider.computed_reward_amount))
}
