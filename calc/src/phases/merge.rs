//! Phase 6 — merge by destination. Entries that would pay the same
//! address (typically after phase-5 redirects) collapse into one
//! `Merged` entry so the batch carries a single transfer per
//! destination. The constituents survive in `parents` for the report.

use {
    payout_model::{EntryType, RewardLog},
    std::collections::BTreeMap,
};

pub fn merge_by_destination(entries: Vec<RewardLog>) -> Vec<RewardLog> {
    let mut out = Vec::with_capacity(entries.len());
    let mut groups: BTreeMap<String, Vec<RewardLog>> = BTreeMap::new();

    for mut entry in entries {
        if entry.skipped {
            out.push(entry);
            continue;
        }
        groups.entry(entry.payment_address.clone()).or_default().push(entry);
    }

    for (destination, mut group) in groups {
        if group.len() == 1 {
            let mut entry = group.pop().unwrap();
            entry.ratio6 = Some(entry.ratio);
            out.push(entry);
            continue;
        }

        let mut merged = RewardLog::new(destination, EntryType::Merged, 0, 0);
        merged.cycle = group[0].cycle;
        for constituent in &group {
            merged.ratio += constituent.ratio;
            merged.service_fee_ratio += constituent.service_fee_ratio;
            merged.amount += constituent.amount;
            merged.service_fee_amount += constituent.service_fee_amount;
            merged.staking_balance += constituent.staking_balance;
            merged.current_balance += constituent.current_balance;
        }
        merged.ratio6 = Some(merged.ratio);
        merged.parents = group;
        out.push(merged);
    }

    out
}
