//! # Phased reward allocator
//!
//! Deterministic, side-effect-free transformation of one cycle's reward
//! pool into final per-destination payment amounts.
//!
//! ## Phases
//!
//! ```text
//! 0  apportion      ratio0 = staking_balance / total_delegated;
//!                   synthetic owners-parent holds 1 − Σratio0
//! 1  balance excl.  skipped shares stay at the staking balance,
//!                   the pool total shrinks proportionally
//! 2  ratio excl.    pool unchanged, ratio mass redistributed
//! 3  fees           service fee shaved into a founders-parent;
//!                   fee-set exclusions donate their full ratio
//! 4  split          parents expanded per configured founder/owner share
//! 5  mapping        payment_address redirects, ratios untouched
//! 6  merge          same-destination entries collapse into one
//! F  final          amount = floor(ratio × total) + residual fix-up
//! 7  zero balance   unfunded non-contract destinations flagged for
//!                   reactivation or withheld
//! ```
//!
//! The final amount pass runs before the zero-balance gate: gate
//! decisions are taken on computed amounts, and a withheld share stays
//! with the baker (recorded with a reason) rather than being silently
//! redistributed.
//!
//! After every ratio-producing phase the calculator checks that the
//! non-skipped ratios sum to 1 within [`RATIO_EPSILON`], and after the
//! final pass that the amounts conserve the pool exactly. A violation
//! is a fatal [`CalcError`] — the cycle must not proceed to payment
//! with corrupted numbers.

pub mod calculator;
pub mod error;
pub mod fee;
pub mod phases;
pub mod rounding;

#[cfg(test)]
mod tests;

pub use {
    calculator::PhasedCalculator,
    error::{CalcError, Result},
    fee::ServiceFeeCalculator,
};

/// Tolerance for ratio-closure checks.
pub const RATIO_EPSILON: f64 = 1e-6;
