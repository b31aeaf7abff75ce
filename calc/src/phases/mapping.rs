//! Phase 5 — destination remapping. Ratios are untouched; only the
//! `payment_address` changes, per the configured redirect table. The
//! origin `address` stays what it was so the report keeps the audit
//! trail.

use {payout_model::RewardLog, std::collections::HashMap};

pub fn remap_destinations(mut entries: Vec<RewardLog>, redirects: &HashMap<String, String>) -> Vec<RewardLog> {
    for entry in entries.iter_mut() {
        if let Some(target) = redirects.get(&entry.address) {
            entry.payment_address = target.clone();
        }
        if !entry.skipped {
            entry.ratio5 = Some(entry.ratio);
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use {super::*, payout_model::EntryType};

    #[test]
    fn test_redirect_changes_destination_not_origin() {
        let redirects = HashMap::from([("tz1cold".to_string(), "tz1hot".to_string())]);
        let mut entry = RewardLog::new("tz1cold", EntryType::Delegator, 100, 100);
        entry.ratio = 0.5;

        let out = remap_destinations(vec![entry], &redirects);

        assert_eq!(out[0].address, "tz1cold");
        assert_eq!(out[0].payment_address, "tz1hot");
        assert_eq!(out[0].ratio5, Some(0.5));
    }

    #[test]
    fn test_unmapped_entries_untouched() {
        let out = remap_destinations(
            vec![RewardLog::new("tz1plain", EntryType::Delegator, 1, 1)],
            &HashMap::new(),
        );
        assert_eq!(out[0].payment_address, "tz1plain");
    }
}
