//! Executor errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayError {
    #[error(transparent)]
    Rpc(#[from] payout_rpc::RpcError),

    /// `OpCounter::inc` before the counter was seeded from the node.
    #[error("operation counter used before it was set")]
    CounterUnset,
}

pub type Result<T> = std::result::Result<T, PayError>;
