//! # Payout data model
//!
//! Shared types for the payout pipeline: the [`RewardLog`] unit of work
//! that flows through the calculation phases and the payment executor,
//! the [`PaymentStatus`] terminal-state machine, the immutable
//! [`RewardProviderModel`] snapshot delivered by a reward-data provider,
//! the per-cycle [`RulesModel`] policy, and the [`PaymentBatch`] handoff
//! unit between the producer and consumer threads.

pub mod batch;
pub mod provider;
pub mod reward_log;
pub mod rules;
pub mod status;

// Re-exports for convenience.
pub use batch::{PaymentBatch, QueueItem};
pub use provider::{DelegatorBalance, RewardProviderModel};
pub use reward_log::{EntryType, RewardLog};
pub use rules::{RulesModel, MIN_DELEGATION_KEY};
pub use status::PaymentStatus;

/// Smallest indivisible unit of the chain's native asset. All exact
/// arithmetic in the pipeline is done in minor units.
pub const MINOR_UNITS_PER_TOKEN: u64 = 1_000_000;
