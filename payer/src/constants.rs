//! Protocol fee parameters and executor limits.
//!
//! The static fee table covers implicit-account transfers; contract
//! destinations are priced by simulation instead. These values track
//! the current protocol and may change across upgrades.

/// Minimum payable amount, minor units. Anything smaller is settled as
/// `Done` without touching the network.
pub const ZERO_THRESHOLD: u64 = 1;

// Transfer to an allocated implicit account.
pub const TX_FEE_ALLOCATED: u64 = 298;
pub const GAS_LIMIT_ALLOCATED: u64 = 3_400;
pub const STORAGE_LIMIT_ALLOCATED: u64 = 0;

// Transfer to an emptied implicit account: the storage it re-allocates
// is burned at `COST_PER_BYTE`.
pub const TX_FEE_NON_ALLOCATED: u64 = 397;
pub const GAS_LIMIT_NON_ALLOCATED: u64 = 3_421;
pub const STORAGE_LIMIT_NON_ALLOCATED: u64 = 277;
pub const COST_PER_BYTE: u64 = 250;
pub const REACTIVATION_BURN_FEE: u64 = STORAGE_LIMIT_NON_ALLOCATED * COST_PER_BYTE;

// Minimal-fee formula inputs: fee ≥ 100 + 0.1·gas + 1·byte.
pub const MINIMUM_FEE: u64 = 100;
pub const FEE_PER_GAS_UNIT: f64 = 0.1;
pub const FEE_PER_BYTE: u64 = 1;

// Simulation starts from the per-operation hard limits and narrows to
// the consumed amounts.
pub const HARD_GAS_LIMIT_PER_OPERATION: u64 = 1_040_000;
pub const HARD_STORAGE_LIMIT_PER_OPERATION: u64 = 60_000;
/// Safety margin added to the simulated gas consumption.
pub const SIMULATION_GAS_MARGIN: u64 = 100;

/// Default ceiling on simulated transfer + burn fees for a contract
/// destination; anything above is `Avoided`.
pub const DEFAULT_CONTRACT_FEE_CEILING: u64 = 100_000;

// Batch shape: homogeneous batches, plain and contract destinations
// never mixed.
pub const MAX_TX_PER_BATCH_PLAIN: usize = 550;
pub const MAX_TX_PER_BATCH_CONTRACT: usize = 25;

pub const MAX_BATCH_ATTEMPTS: u32 = 3;
/// Confirmation poll window after injection.
pub const CONFIRMATION_BLOCKS: u64 = 5;
pub const TRIALS_PER_BLOCK: u32 = 2;

/// Required batch fee per the minimal-fee formula. `size` is the byte
/// size of the signed operation.
pub fn required_fee(total_gas: u64, size: u64) -> u64 {
    (MINIMUM_FEE as f64 + FEE_PER_GAS_UNIT * total_gas as f64 + (FEE_PER_BYTE * size) as f64).ceil()
        as u64
}

/// Byte size of a forged operation once the signature is appended.
/// `forged_hex` is hex, two characters per byte.
pub fn signed_operation_size(forged_hex: &str) -> u64 {
    crate::batch_payer::SIGNATURE_SIZE + (forged_hex.len() as u64) / 2
}
