//! Fatal calculation errors.

use thiserror::Error;

/// Errors raised by the phased allocator. All of them abort the
/// cycle's payment: a calculation that cannot prove its own sums is
/// never executed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    /// The provider snapshot carries no stake to apportion.
    #[error("delegate staking balance is zero, nothing to apportion")]
    ZeroStakingBalance,

    /// Non-skipped ratios stopped summing to 1 after a phase.
    #[error("ratio closure violated after phase {phase}: sum = {sum}")]
    RatioClosure { phase: u8, sum: f64 },

    /// Final amounts do not conserve the pool total.
    #[error("amount conservation violated: distributed {distributed} of {total} minor units")]
    Conservation { distributed: u64, total: u64 },

    /// A configured share map does not sum to 1.
    #[error("{map} shares sum to {sum}, expected 1")]
    BadShareMap { map: &'static str, sum: f64 },
}

/// Convenience result type for allocator operations.
pub type Result<T> = std::result::Result<T, CalcError>;
