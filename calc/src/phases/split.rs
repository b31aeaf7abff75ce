//! Phase 4 — expansion of the synthetic parent aggregates into
//! per-founder and per-owner entries.
//!
//! Share maps are `BTreeMap`s so the children come out in address
//! order, cycle after cycle. An empty map keeps the parent entry in
//! place: parents are never payable, so the mass stays with the baker
//! and remains visible in the calculation report.

use {
    payout_model::{EntryType, RewardLog},
    std::collections::BTreeMap,
};

fn expand(parent: &RewardLog, kind: EntryType, shares: &BTreeMap<String, f64>) -> Vec<RewardLog> {
    shares
        .iter()
        .map(|(address, share)| {
            let mut child = RewardLog::new(address.clone(), kind, 0, 0);
            child.cycle = parent.cycle;
            child.ratio = share * parent.ratio;
            child.ratio4 = Some(child.ratio);
            child
        })
        .collect()
}

pub fn split_parents(
    entries: Vec<RewardLog>,
    founders: &BTreeMap<String, f64>,
    owners: &BTreeMap<String, f64>,
) -> Vec<RewardLog> {
    let mut out = Vec::with_capacity(entries.len() + founders.len() + owners.len());

    for mut entry in entries {
        let shares = match entry.kind {
            EntryType::FoundersParent => founders,
            EntryType::OwnersParent => owners,
            _ => {
                if !entry.skipped {
                    entry.ratio4 = Some(entry.ratio);
                }
                out.push(entry);
                continue;
            }
        };

        if shares.is_empty() {
            entry.ratio4 = Some(entry.ratio);
            out.push(entry);
            continue;
        }

        let kind = if entry.kind == EntryType::FoundersParent {
            EntryType::Founder
        } else {
            EntryType::Owner
        };
        out.extend(expand(&entry, kind, shares));
    }

    out
}

#[cfg(test)]
mod tests {
    use {super::*, crate::phases::{FOUNDERS_PARENT_ADDRESS, OWNERS_PARENT_ADDRESS}};

    fn parent(kind: EntryType, address: &str, ratio: f64) -> RewardLog {
        let mut rl = RewardLog::new(address, kind, 0, 0);
        rl.ratio = ratio;
        rl.ratio3 = Some(ratio);
        rl
    }

    #[test]
    fn test_founders_parent_expands_per_share() {
        let founders = BTreeMap::from([
            ("tz1f1".to_string(), 0.6),
            ("tz1f2".to_string(), 0.4),
        ]);
        let entries = vec![parent(EntryType::FoundersParent, FOUNDERS_PARENT_ADDRESS, 0.2)];
        let out = split_parents(entries, &founders, &BTreeMap::new());

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].kind, EntryType::Founder);
        assert!((out[0].ratio - 0.12).abs() < 1e-9);
        assert!((out[1].ratio - 0.08).abs() < 1e-9);
    }

    #[test]
    fn test_empty_map_keeps_parent() {
        let entries = vec![parent(EntryType::OwnersParent, OWNERS_PARENT_ADDRESS, 0.5)];
        let out = split_parents(entries, &BTreeMap::new(), &BTreeMap::new());

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, EntryType::OwnersParent);
        assert_eq!(out[0].ratio4, Some(0.5));
    }

    #[test]
    fn test_children_in_address_order() {
        let owners = BTreeMap::from([
            ("tz1zz".to_string(), 0.5),
            ("tz1aa".to_string(), 0.5),
        ]);
        let entries = vec![parent(EntryType::OwnersParent, OWNERS_PARENT_ADDRESS, 0.4)];
        let out = split_parents(entries, &BTreeMap::new(), &owners);

        assert_eq!(out[0].address, "tz1aa");
        assert_eq!(out[1].address, "tz1zz");
    }
}
