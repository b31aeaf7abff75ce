//! Terminal-state machine for a single payment attempt.

use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Outcome of a payment attempt for one reward entry.
///
/// `Undefined → {Paid, Done, Injected, Avoided, Fail}`. Every state
/// except `Fail` is terminal; a later retry pass may reset `Fail` back
/// to `Undefined` and attempt the entry again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Not yet attempted.
    #[default]
    Undefined,
    /// Confirmed on chain within the confirmation window.
    Paid,
    /// Nothing to send (zero-value after fees, or below threshold).
    Done,
    /// Submitted but confirmation window exhausted — outcome unknown.
    /// Not a failure; resubmitting risks double payment.
    Injected,
    /// Policy skip (incompatible contract, over-fee). Requires a
    /// configuration change, never retried automatically.
    Avoided,
    /// Transient failure, eligible for the retry sweep.
    Fail,
}

impl PaymentStatus {
    pub fn is_undefined(self) -> bool {
        self == PaymentStatus::Undefined
    }

    pub fn is_paid(self) -> bool {
        self == PaymentStatus::Paid
    }

    pub fn is_done(self) -> bool {
        self == PaymentStatus::Done
    }

    pub fn is_injected(self) -> bool {
        self == PaymentStatus::Injected
    }

    pub fn is_avoided(self) -> bool {
        self == PaymentStatus::Avoided
    }

    pub fn is_fail(self) -> bool {
        self == PaymentStatus::Fail
    }

    /// Whether the entry already carries a resolved outcome and must be
    /// passed through untouched by the executor.
    pub fn is_processed(self) -> bool {
        matches!(
            self,
            PaymentStatus::Paid | PaymentStatus::Done | PaymentStatus::Injected | PaymentStatus::Avoided
        )
    }

    /// Short code used in payment report files.
    pub fn code(self) -> &'static str {
        match self {
            PaymentStatus::Undefined => "UNDEFINED",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Done => "DONE",
            PaymentStatus::Injected => "INJECTED",
            PaymentStatus::Avoided => "AVOIDED",
            PaymentStatus::Fail => "FAIL",
        }
    }

    /// Parse the report-file code back into a status.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "UNDEFINED" => Some(PaymentStatus::Undefined),
            "PAID" => Some(PaymentStatus::Paid),
            "DONE" => Some(PaymentStatus::Done),
            "INJECTED" => Some(PaymentStatus::Injected),
            "AVOIDED" => Some(PaymentStatus::Avoided),
            "FAIL" => Some(PaymentStatus::Fail),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
