//! The allocation phases. Each phase takes ownership of the incoming
//! entry vector and returns a newly-owned one; entries are never
//! aliased across phase boundaries.

mod apportion;
mod exclusion;
mod fees;
mod finalize;
mod mapping;
mod merge;
mod split;
mod zero_balance;

pub use {
    apportion::apportion,
    exclusion::{exclude_at_balance, exclude_at_ratio},
    fees::apply_service_fees,
    finalize::finalize_amounts,
    mapping::remap_destinations,
    merge::merge_by_destination,
    split::split_parents,
    zero_balance::gate_zero_balance,
};

/// Skip reasons shared across phases; they end up verbatim in the
/// calculation report.
pub const SKIP_BY_CONFIGURATION: &str = "Skipped by configuration. ";
pub const SKIP_BY_MIN_DELEGATION: &str = "Balance below minimum delegation. ";
pub const SKIP_BY_ZERO_BALANCE: &str = "Destination has zero balance and reactivation is disabled. ";

/// Phase numbers recorded in `skip_phase`.
pub const PHASE_BALANCE_EXCLUSION: u8 = 1;
pub const PHASE_RATIO_EXCLUSION: u8 = 2;
pub const PHASE_FEES: u8 = 3;
pub const PHASE_ZERO_BALANCE: u8 = 7;

/// Synthetic addresses carried by parent aggregate entries.
pub const OWNERS_PARENT_ADDRESS: &str = "OWNERS_PARENT";
pub const FOUNDERS_PARENT_ADDRESS: &str = "FOUNDERS_PARENT";
