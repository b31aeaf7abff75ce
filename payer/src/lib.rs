//! # Batch payment executor
//!
//! Turns a cycle's payable entries into injected batch operations and
//! terminal [`payout_model::PaymentStatus`] outcomes. One batch goes
//! through forge → required-fee top-up → sign → preapply → inject →
//! confirmation poll; a batch gets up to three attempts with a
//! randomized block-proportional backoff between them.
//!
//! The executor owns no policy beyond fee accounting: which entries
//! exist and what they are owed was settled by the allocator. It does
//! own the safety decisions around money in flight — the operation
//! counter is committed only after a non-failed attempt, an exhausted
//! confirmation window yields `Injected` (never retried by default),
//! and contract destinations whose simulated cost is out of bounds are
//! `Avoided` rather than risked.

pub mod batch_payer;
pub mod chunk;
pub mod constants;
pub mod counter;
pub mod error;

#[cfg(test)]
mod tests;

pub use {
    batch_payer::{BatchPayer, BatchPayerConfig, ExitReason, PayResult},
    chunk::sort_and_chunk,
    counter::OpCounter,
    error::{PayError, Result},
};
