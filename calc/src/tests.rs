//! Whole-pipeline tests over hand-checkable cycles.

use {
    crate::{CalcError, PhasedCalculator, ServiceFeeCalculator},
    payout_model::{DelegatorBalance, EntryType, RewardProviderModel, RulesModel},
    std::collections::{BTreeMap, HashMap, HashSet},
};

fn provider(own: u64, delegators: &[(&str, u64)], pool: u64) -> RewardProviderModel {
    let mut model = RewardProviderModel {
        own_delegated_balance: own,
        external_delegated_balance: delegators.iter().map(|(_, b)| b).sum(),
        total_reward_amount: pool,
        rewards_and_fees: pool,
        computed_reward_amount: pool,
        ..Default::default()
    };
    for (address, balance) in delegators {
        model.delegators.insert(
            address.to_string(),
            DelegatorBalance {
                staking_balance: *balance,
                current_balance: 1_000_000,
            },
        );
    }
    model
}

fn calculator(fee_percent: f64, rules: RulesModel) -> PhasedCalculator {
    PhasedCalculator::new(
        ServiceFeeCalculator::new(HashSet::new(), HashMap::new(), fee_percent),
        rules,
        BTreeMap::new(),
        BTreeMap::new(),
        0,
        true,
    )
    .unwrap()
}

// Ratios [0.25, 0.05, 0.30, 0.15, 0.25] over a 1000-unit pool with a
// flat 20% fee; the first address is excluded at the fee phase, so its
// whole quarter is donated. The founders parent ends at 0.40 and the
// survivors' fee take sums to 0.15.
#[test]
fn test_fee_donation_scenario() {
    let model = provider(
        0,
        &[("tz1a", 250), ("tz1b", 50), ("tz1c", 300), ("tz1d", 150), ("tz1e", 250)],
        1_000,
    );
    let rules = RulesModel::new(
        HashSet::new(),
        HashSet::new(),
        HashSet::from(["tz1a".to_string()]),
        HashMap::new(),
    );
    let (entries, total) = calculator(20.0, rules).calculate(&model, 600).unwrap();
    assert_eq!(total, 1_000);

    let parent = entries
        .iter()
        .find(|e| e.kind == EntryType::FoundersParent)
        .unwrap();
    assert!((parent.ratio - 0.40).abs() < 1e-6);

    let fee_sum: f64 = entries
        .iter()
        .filter(|e| !e.skipped)
        .map(|e| e.service_fee_ratio)
        .sum();
    assert!((fee_sum - 0.15).abs() < 1e-6);

    let amount_sum: u64 = entries.iter().map(|e| e.amount).sum();
    assert_eq!(amount_sum, 1_000);

    let by_addr = |a: &str| entries.iter().find(|e| e.address == a).unwrap();
    assert_eq!(by_addr("tz1b").amount, 40);
    assert_eq!(by_addr("tz1c").amount, 240);
    assert_eq!(by_addr("tz1d").amount, 120);
    assert_eq!(by_addr("tz1e").amount, 200);
    assert!(by_addr("tz1a").skipped);
}

#[test]
fn test_amounts_conserve_awkward_pool() {
    // Three equal delegators over a pool not divisible by three.
    let model = provider(0, &[("tz1a", 100), ("tz1b", 100), ("tz1c", 100)], 1_000_001);
    let (entries, total) = calculator(5.0, RulesModel::default())
        .calculate(&model, 1)
        .unwrap();

    let amount_sum: u64 = entries.iter().map(|e| e.amount).sum();
    assert_eq!(amount_sum, total);
}

#[test]
fn test_same_input_same_output() {
    let model = provider(500, &[("tz1x", 700), ("tz1y", 300), ("tz1z", 1_500)], 987_654);
    let calc = calculator(12.5, RulesModel::default());

    let (a, _) = calc.calculate(&model, 7).unwrap();
    let (b, _) = calc.calculate(&model, 7).unwrap();

    assert_eq!(a.len(), b.len());
    for (left, right) in a.iter().zip(&b) {
        assert_eq!(left.address, right.address);
        assert_eq!(left.amount, right.amount);
        assert_eq!(left.payable, right.payable);
    }
}

#[test]
fn test_balance_exclusion_leaves_share_with_pool_shrink() {
    let model = provider(0, &[("tz1keep", 750), ("tz1drop", 250)], 1_000_000);
    let rules = RulesModel::new(
        HashSet::from(["tz1drop".to_string()]),
        HashSet::new(),
        HashSet::new(),
        HashMap::new(),
    );
    let (entries, total) = calculator(0.0, rules).calculate(&model, 2).unwrap();

    // The dropped quarter shrinks the pool instead of enriching tz1keep.
    assert_eq!(total, 750_000);
    let keep = entries.iter().find(|e| e.address == "tz1keep").unwrap();
    assert_eq!(keep.amount, 750_000);
}

#[test]
fn test_redirect_then_merge_single_transfer() {
    let model = provider(0, &[("tz1a", 400), ("tz1b", 600)], 1_000);
    let rules = RulesModel::new(
        HashSet::new(),
        HashSet::new(),
        HashSet::new(),
        HashMap::from([("tz1a".to_string(), "tz1b".to_string())]),
    );
    let (entries, _) = calculator(0.0, rules).calculate(&model, 3).unwrap();

    let merged = entries.iter().find(|e| e.kind == EntryType::Merged).unwrap();
    assert_eq!(merged.payment_address, "tz1b");
    assert_eq!(merged.amount, 1_000);
    assert_eq!(merged.parents.len(), 2);
    assert!(merged.parents.iter().all(|p| p.cycle == 3));
}

#[test]
fn test_merged_entry_carries_constituent_fees() {
    // Two delegators paying the same destination: the merged transfer
    // must owe the sum of both service fees, not a fresh zero.
    let model = provider(0, &[("tz1a", 400_000), ("tz1b", 600_000)], 1_000_000);
    let rules = RulesModel::new(
        HashSet::new(),
        HashSet::new(),
        HashSet::new(),
        HashMap::from([
            ("tz1a".to_string(), "tz1pool".to_string()),
            ("tz1b".to_string(), "tz1pool".to_string()),
        ]),
    );
    let (entries, _) = calculator(20.0, rules).calculate(&model, 9).unwrap();

    let merged = entries.iter().find(|e| e.kind == EntryType::Merged).unwrap();
    assert_eq!(merged.payment_address, "tz1pool");
    assert_eq!(merged.amount, 800_000);
    assert_eq!(merged.service_fee_amount, 200_000);
    assert!((merged.service_fee_ratio - 0.20).abs() < 1e-9);
    assert_eq!(
        merged.service_fee_amount,
        merged.parents.iter().map(|p| p.service_fee_amount).sum::<u64>()
    );
}

#[test]
fn test_owners_parent_holds_own_stake_share() {
    let model = provider(400, &[("tz1only", 600)], 1_000);
    let (entries, _) = calculator(0.0, RulesModel::default())
        .calculate(&model, 4)
        .unwrap();

    let parent = entries
        .iter()
        .find(|e| e.kind == EntryType::OwnersParent)
        .unwrap();
    assert!((parent.ratio - 0.4).abs() < 1e-6);
    assert!(!parent.payable);
    assert_eq!(parent.amount, 400);
}

#[test]
fn test_bad_share_map_rejected_at_construction() {
    let founders = BTreeMap::from([("tz1f".to_string(), 0.7)]);
    let err = PhasedCalculator::new(
        ServiceFeeCalculator::new(HashSet::new(), HashMap::new(), 10.0),
        RulesModel::default(),
        founders,
        BTreeMap::new(),
        0,
        true,
    )
    .unwrap_err();
    assert!(matches!(err, CalcError::BadShareMap { map: "founders", .. }));
}

#[test]
fn test_empty_snapshot_is_fatal() {
    let model = provider(0, &[], 1_000);
    let err = calculator(0.0, RulesModel::default())
        .calculate(&model, 5)
        .unwrap_err();
    assert_eq!(err, CalcError::ZeroStakingBalance);
}
