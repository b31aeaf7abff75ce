//! Phases 1 and 2 — the two exclusion policies.
//!
//! Phase 1 leaves excluded shares "at the balance": the pool total
//! shrinks proportionally and nobody inherits the excluded mass.
//! Phase 2 keeps the pool total and redistributes the excluded ratio
//! mass among the survivors. The dichotomy is policy, not a bug.

use {
    super::{
        PHASE_BALANCE_EXCLUSION, PHASE_RATIO_EXCLUSION, SKIP_BY_CONFIGURATION,
        SKIP_BY_MIN_DELEGATION,
    },
    crate::rounding::round_half_down,
    payout_model::{EntryType, RewardLog},
    std::collections::HashSet,
};

fn should_exclude(entry: &RewardLog, excluded: &HashSet<String>, min_delegation: Option<u64>) -> Option<&'static str> {
    if entry.kind != EntryType::Delegator {
        // Parent aggregates are re-ratioed but never excluded.
        None
    } else if excluded.contains(&entry.address) {
        Some(SKIP_BY_CONFIGURATION)
    } else if min_delegation.is_some_and(|min| entry.staking_balance < min) {
        Some(SKIP_BY_MIN_DELEGATION)
    } else {
        None
    }
}

/// Phase 1. Excluded entries keep their share in the staking balance:
/// survivors are re-ratioed against the shrunken balance and the pool
/// total is reduced by the same factor, rounded half-down.
///
/// `min_delegation` is `Some` only when the configuration activates the
/// minimum-delegation rule at this phase.
pub fn exclude_at_balance(
    mut entries: Vec<RewardLog>,
    total: u64,
    excluded: &HashSet<String>,
    min_delegation: Option<u64>,
) -> (Vec<RewardLog>, u64) {
    let mut total_balance = 0_u64;
    let mut excluded_balance = 0_u64;

    for entry in entries.iter_mut() {
        total_balance += entry.staking_balance;
        if let Some(reason) = should_exclude(entry, excluded, min_delegation) {
            entry.skip(reason, PHASE_BALANCE_EXCLUSION);
            excluded_balance += entry.staking_balance;
        }
    }

    let remaining_balance = total_balance - excluded_balance;
    if remaining_balance == 0 {
        // Everyone excluded: nothing left to distribute.
        return (entries, 0);
    }

    for entry in entries.iter_mut().filter(|e| !e.skipped) {
        entry.ratio = entry.staking_balance as f64 / remaining_balance as f64;
        entry.ratio1 = Some(entry.ratio);
    }

    let shrink = remaining_balance as f64 / total_balance as f64;
    let new_total = round_half_down(total as f64 * shrink);
    (entries, new_total)
}

/// Phase 2. Excluded ratio mass is redistributed among survivors; the
/// pool total is unchanged.
pub fn exclude_at_ratio(
    mut entries: Vec<RewardLog>,
    excluded: &HashSet<String>,
    min_delegation: Option<u64>,
) -> Vec<RewardLog> {
    let mut total_balance = 0_u64;
    let mut excluded_balance = 0_u64;

    for entry in entries.iter_mut().filter(|e| !e.skipped) {
        total_balance += entry.staking_balance;
        if let Some(reason) = should_exclude(entry, excluded, min_delegation) {
            entry.skip(reason, PHASE_RATIO_EXCLUSION);
            excluded_balance += entry.staking_balance;
        }
    }

    let remaining_balance = total_balance - excluded_balance;
    if remaining_balance == 0 {
        return entries;
    }

    for entry in entries.iter_mut().filter(|e| !e.skipped) {
        entry.ratio = entry.staking_balance as f64 / remaining_balance as f64;
        entry.ratio2 = Some(entry.ratio);
    }

    entries
}
