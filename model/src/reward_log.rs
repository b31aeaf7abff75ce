//! The unit of work that flows through the allocation phases and the
//! payment executor.

use {
    crate::status::PaymentStatus,
    serde::{Deserialize, Serialize},
    std::{cmp::Ordering, fmt},
};

/// Prefix of contract-style destination addresses. Contract
/// destinations require script execution (simulated fees) and never
/// need reactivation on zero balance.
pub const CONTRACT_ADDRESS_PREFIX: &str = "KT1";

/// Kind of a reward entry.
///
/// Adding a variant is a compile-time-checked change: every phase
/// matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// A delegator entitled to a pro-rata share.
    Delegator,
    /// A configured owner receiving part of the baker's own stake reward.
    Owner,
    /// A configured founder receiving part of the service fee.
    Founder,
    /// Synthetic aggregate holding the baker's own (undelegated) share
    /// until phase 4 splits it per owner.
    OwnersParent,
    /// Synthetic aggregate collecting service fees and fee-phase
    /// exclusion donations until phase 4 splits it per founder.
    FoundersParent,
    /// Result of merging several entries with the same destination.
    Merged,
    /// An entry carried for audit only, never payable.
    External,
}

impl EntryType {
    /// Single-letter (or legacy) code used in report files.
    pub fn code(self) -> &'static str {
        match self {
            EntryType::Delegator => "D",
            EntryType::Owner => "O",
            EntryType::Founder => "F",
            EntryType::OwnersParent => "OWNERS_PARENT",
            EntryType::FoundersParent => "FOUNDERS_PARENT",
            EntryType::Merged => "MERGED",
            EntryType::External => "X",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "D" => Some(EntryType::Delegator),
            "O" => Some(EntryType::Owner),
            "F" => Some(EntryType::Founder),
            "OWNERS_PARENT" => Some(EntryType::OwnersParent),
            "FOUNDERS_PARENT" => Some(EntryType::FoundersParent),
            "MERGED" => Some(EntryType::Merged),
            "X" => Some(EntryType::External),
            _ => None,
        }
    }

    /// Whether entries of this kind may ever become payable.
    pub fn is_payable_kind(self) -> bool {
        match self {
            EntryType::Delegator | EntryType::Owner | EntryType::Founder | EntryType::Merged => true,
            EntryType::OwnersParent | EntryType::FoundersParent | EntryType::External => false,
        }
    }

    /// Sort rank used when ordering a batch before payment: founders
    /// and owners first, then delegators, merged entries by their
    /// constituents' weight.
    fn rank(self) -> u8 {
        match self {
            EntryType::Founder => 0,
            EntryType::Owner => 1,
            EntryType::Merged => 2,
            EntryType::Delegator => 3,
            EntryType::OwnersParent | EntryType::FoundersParent | EntryType::External => 4,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One reward entry, mutated in place across the pipeline phases and
/// finally handed to the payment executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardLog {
    /// Origin address of the reward share.
    pub address: String,
    /// Destination the payment actually goes to (phase 5 may remap it).
    pub payment_address: String,
    pub kind: EntryType,
    /// Reward cycle this entry belongs to.
    pub cycle: u64,

    /// Balance delegated to the baker, minor units.
    pub staking_balance: u64,
    /// Spendable balance of the destination, minor units.
    pub current_balance: u64,

    /// Share of the pool active at each phase. `None` until the phase
    /// has run (or if the entry was skipped before it).
    pub ratio0: Option<f64>,
    pub ratio1: Option<f64>,
    pub ratio2: Option<f64>,
    pub ratio3: Option<f64>,
    pub ratio4: Option<f64>,
    pub ratio5: Option<f64>,
    pub ratio6: Option<f64>,
    /// The current effective ratio (last phase's output).
    pub ratio: f64,

    pub service_fee_rate: f64,
    pub service_fee_ratio: f64,
    /// Final fee amount in minor units, set by the final pass.
    pub service_fee_amount: u64,

    /// Final payable amount in minor units.
    pub amount: u64,
    /// Transaction/burn fees charged to the delegator (subtracted from
    /// `amount` before sending).
    pub delegator_transaction_fee: u64,
    /// Transaction/burn fees borne by the baker.
    pub delegate_transaction_fee: u64,

    pub payable: bool,
    pub skipped: bool,
    pub skip_reason: String,
    /// Phase at which the entry was skipped, if any.
    pub skip_phase: Option<u8>,
    /// Destination has zero balance and must be reactivated as part of
    /// the transfer.
    pub needs_activation: bool,

    pub paid: PaymentStatus,
    /// Operation hash once injected.
    pub hash: Option<String>,

    /// Constituent entries replaced by a `Merged` entry. Audit only,
    /// never mutated further.
    pub parents: Vec<RewardLog>,
}

impl RewardLog {
    pub fn new(address: impl Into<String>, kind: EntryType, staking_balance: u64, current_balance: u64) -> Self {
        let address = address.into();
        Self {
            payment_address: address.clone(),
            address,
            kind,
            cycle: 0,
            staking_balance,
            current_balance,
            ratio0: None,
            ratio1: None,
            ratio2: None,
            ratio3: None,
            ratio4: None,
            ratio5: None,
            ratio6: None,
            ratio: 0.0,
            service_fee_rate: 0.0,
            service_fee_ratio: 0.0,
            service_fee_amount: 0,
            amount: 0,
            delegator_transaction_fee: 0,
            delegate_transaction_fee: 0,
            payable: false,
            skipped: false,
            skip_reason: String::new(),
            skip_phase: None,
            needs_activation: false,
            paid: PaymentStatus::Undefined,
            hash: None,
            parents: Vec::new(),
        }
    }

    /// Mark the entry skipped. Idempotent: the first skip wins.
    pub fn skip(&mut self, reason: &str, phase: u8) {
        if self.skipped {
            return;
        }
        self.skipped = true;
        self.skip_reason.push_str(reason);
        self.skip_phase = Some(phase);
    }

    /// Append a note to the entry's reason/description field.
    pub fn push_note(&mut self, note: &str) {
        self.skip_reason.push_str(note);
    }

    /// Whether the payment destination is a contract-style account.
    pub fn is_contract_destination(&self) -> bool {
        self.payment_address.starts_with(CONTRACT_ADDRESS_PREFIX)
    }

    /// Ordering used before batching: by kind rank, then by staking
    /// balance descending, then by address for determinism.
    pub fn cmp_by_kind_balance(&self, other: &Self) -> Ordering {
        self.kind
            .rank()
            .cmp(&other.kind.rank())
            .then(other.staking_balance.cmp(&self.staking_balance))
            .then(self.address.cmp(&other.address))
    }
}
