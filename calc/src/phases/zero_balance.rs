//! Phase 7 — the zero-balance gate, run after amounts are final.
//!
//! A transfer to an empty non-contract account pays a reactivation
//! burn on top of the transfer fee. When reactivation is enabled the
//! entry is flagged so the payer prices the burn in; when disabled the
//! payment is withheld and the amount stays with the baker, recorded
//! with a reason. Contract destinations never need reactivation.

use {
    super::{PHASE_ZERO_BALANCE, SKIP_BY_ZERO_BALANCE},
    payout_model::RewardLog,
};

pub fn gate_zero_balance(mut entries: Vec<RewardLog>, reactivate: bool) -> Vec<RewardLog> {
    for entry in entries.iter_mut() {
        if !entry.payable || entry.current_balance > 0 || entry.is_contract_destination() {
            continue;
        }
        if reactivate {
            entry.needs_activation = true;
        } else {
            entry.payable = false;
            entry.skip(SKIP_BY_ZERO_BALANCE, PHASE_ZERO_BALANCE);
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use {super::*, payout_model::EntryType};

    fn payable(address: &str, balance: u64) -> RewardLog {
        let mut rl = RewardLog::new(address, EntryType::Delegator, 100, balance);
        rl.amount = 1_000;
        rl.payable = true;
        rl
    }

    #[test]
    fn test_withholds_when_reactivation_disabled() {
        let out = gate_zero_balance(vec![payable("tz1empty", 0)], false);
        assert!(!out[0].payable);
        assert_eq!(out[0].skip_phase, Some(PHASE_ZERO_BALANCE));
        // The amount stays on the row for the report.
        assert_eq!(out[0].amount, 1_000);
    }

    #[test]
    fn test_flags_when_reactivation_enabled() {
        let out = gate_zero_balance(vec![payable("tz1empty", 0)], true);
        assert!(out[0].payable);
        assert!(out[0].needs_activation);
    }

    #[test]
    fn test_funded_and_contract_destinations_pass() {
        let mut contract = payable("tz1origin", 0);
        contract.payment_address = "KT1Wv8Ted4b6raZDMoepkCPT8MkNFxyT2Ddo".to_string();
        let out = gate_zero_balance(vec![payable("tz1funded", 5), contract], false);

        assert!(out[0].payable && !out[0].needs_activation);
        assert!(out[1].payable && !out[1].needs_activation);
    }
}
