//! Phase 3 — service fee collection.
//!
//! Each live entry gives up `fee_rate × ratio` of the pool; the shaved
//! mass accumulates in a synthetic founders-parent entry, later split
//! per founder in phase 4. Addresses excluded at this phase donate
//! their entire ratio to the founders-parent instead of keeping any
//! share. Parent aggregates never pay fees.

use {
    super::{FOUNDERS_PARENT_ADDRESS, PHASE_FEES, SKIP_BY_CONFIGURATION, SKIP_BY_MIN_DELEGATION},
    crate::fee::ServiceFeeCalculator,
    payout_model::{EntryType, RewardLog},
    std::collections::HashSet,
};

pub fn apply_service_fees(
    mut entries: Vec<RewardLog>,
    fee_calc: &ServiceFeeCalculator,
    excluded: &HashSet<String>,
    min_delegation: Option<u64>,
) -> Vec<RewardLog> {
    let mut fee_pool = 0.0_f64;

    for entry in entries.iter_mut().filter(|e| !e.skipped) {
        if matches!(entry.kind, EntryType::OwnersParent | EntryType::FoundersParent) {
            entry.service_fee_rate = 0.0;
            entry.ratio3 = Some(entry.ratio);
            continue;
        }

        if excluded.contains(&entry.address) {
            // The whole share is donated, not left with the delegator.
            fee_pool += entry.ratio;
            entry.service_fee_rate = 1.0;
            entry.service_fee_ratio = entry.ratio;
            entry.ratio3 = Some(0.0);
            entry.ratio = 0.0;
            entry.skip(SKIP_BY_CONFIGURATION, PHASE_FEES);
            continue;
        }
        if min_delegation.is_some_and(|min| entry.staking_balance < min) {
            fee_pool += entry.ratio;
            entry.service_fee_rate = 1.0;
            entry.service_fee_ratio = entry.ratio;
            entry.ratio3 = Some(0.0);
            entry.ratio = 0.0;
            entry.skip(SKIP_BY_MIN_DELEGATION, PHASE_FEES);
            continue;
        }

        let rate = fee_calc.rate_for(&entry.address);
        entry.service_fee_rate = rate;
        entry.service_fee_ratio = rate * entry.ratio;
        entry.ratio -= entry.service_fee_ratio;
        entry.ratio3 = Some(entry.ratio);
        fee_pool += entry.service_fee_ratio;
    }

    let mut founders_parent = RewardLog::new(FOUNDERS_PARENT_ADDRESS, EntryType::FoundersParent, 0, 0);
    founders_parent.ratio3 = Some(fee_pool);
    founders_parent.ratio = fee_pool;
    entries.push(founders_parent);

    entries
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::phases::OWNERS_PARENT_ADDRESS,
        std::collections::HashMap,
    };

    fn delegator(address: &str, ratio: f64) -> RewardLog {
        let mut rl = RewardLog::new(address, EntryType::Delegator, 1_000, 1_000);
        rl.ratio = ratio;
        rl.ratio2 = Some(ratio);
        rl
    }

    fn flat_fee(percent: f64) -> ServiceFeeCalculator {
        ServiceFeeCalculator::new(HashSet::new(), HashMap::new(), percent)
    }

    #[test]
    fn test_fee_shaved_into_founders_parent() {
        let entries = vec![delegator("tz1a", 0.6), delegator("tz1b", 0.4)];
        let entries = apply_service_fees(entries, &flat_fee(20.0), &HashSet::new(), None);

        assert!((entries[0].ratio - 0.48).abs() < 1e-9);
        assert!((entries[1].ratio - 0.32).abs() < 1e-9);
        let parent = entries.last().unwrap();
        assert_eq!(parent.kind, EntryType::FoundersParent);
        assert!((parent.ratio - 0.20).abs() < 1e-9);

        let sum: f64 = entries.iter().filter(|e| !e.skipped).map(|e| e.ratio).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fee_exclusion_donates_full_share() {
        let entries = vec![delegator("tz1kept", 0.7), delegator("tz1donor", 0.3)];
        let excluded = HashSet::from(["tz1donor".to_string()]);
        let entries = apply_service_fees(entries, &flat_fee(10.0), &excluded, None);

        let donor = &entries[1];
        assert!(donor.skipped);
        assert_eq!(donor.skip_phase, Some(PHASE_FEES));
        assert_eq!(donor.ratio, 0.0);

        // Founders parent holds its own fee take plus the donation.
        let parent = entries.last().unwrap();
        assert!((parent.ratio - (0.07 + 0.3)).abs() < 1e-9);
    }

    #[test]
    fn test_owners_parent_pays_no_fee() {
        let mut parent = RewardLog::new(OWNERS_PARENT_ADDRESS, EntryType::OwnersParent, 0, 0);
        parent.ratio = 0.5;
        let entries = apply_service_fees(vec![parent, delegator("tz1a", 0.5)], &flat_fee(50.0), &HashSet::new(), None);

        assert_eq!(entries[0].service_fee_rate, 0.0);
        assert!((entries[0].ratio - 0.5).abs() < f64::EPSILON);
        assert!((entries[1].ratio - 0.25).abs() < 1e-9);
        assert!((entries.last().unwrap().ratio - 0.25).abs() < 1e-9);
    }
}
