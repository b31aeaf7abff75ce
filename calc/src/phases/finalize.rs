//! Final pass — ratios become minor-unit amounts.
//!
//! Every live entry gets `floor(ratio × total)`; flooring loses at most
//! one minor unit per entry, and the accumulated residual is handed to
//! the last payable entry so the amounts conserve the pool exactly.

use {
    crate::{
        error::{CalcError, Result},
        rounding::floor_amount,
    },
    payout_model::{EntryType, RewardLog},
};

pub fn finalize_amounts(mut entries: Vec<RewardLog>, total: u64) -> Result<Vec<RewardLog>> {
    let mut distributed = 0_u64;
    let mut last_payable: Option<usize> = None;

    for (idx, entry) in entries.iter_mut().enumerate() {
        if entry.skipped {
            entry.amount = 0;
            continue;
        }
        if entry.kind == EntryType::Merged {
            // A merged transfer owes exactly what its constituents
            // would have been paid one by one; pricing the summed
            // ratio instead can drift by a unit per constituent.
            entry.amount = 0;
            entry.service_fee_amount = 0;
            for parent in entry.parents.iter_mut() {
                parent.amount = floor_amount(parent.ratio, total);
                parent.service_fee_amount = floor_amount(parent.service_fee_ratio, total);
                entry.amount += parent.amount;
                entry.service_fee_amount += parent.service_fee_amount;
            }
        } else {
            entry.amount = floor_amount(entry.ratio, total);
            entry.service_fee_amount = floor_amount(entry.service_fee_ratio, total);
        }
        distributed += entry.amount;

        entry.payable = entry.kind.is_payable_kind() && entry.amount > 0;
        if entry.payable {
            last_payable = Some(idx);
        }
    }

    if distributed > total {
        return Err(CalcError::Conservation { distributed, total });
    }

    let residual = total - distributed;
    if residual > 0 {
        // With no payable entry left the residual stays with the baker.
        if let Some(idx) = last_payable {
            entries[idx].amount += residual;
        }
    }

    Ok(entries)
}
