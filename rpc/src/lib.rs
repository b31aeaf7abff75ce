//! # Node and signer clients
//!
//! Thin blocking HTTP clients for the chain node's RPC surface and the
//! remote signer, plus the wire types the payment executor forges and
//! injects. Everything network-facing sits behind object-safe traits
//! ([`NodeClient`], [`SignerClient`], [`RewardProvider`]) so the
//! executor and the daemon can be tested against in-memory fakes.
//!
//! Request safety rule: idempotent GETs are retried a bounded number of
//! times; POSTs (forge, preapply, inject, run_operation) are issued
//! exactly once per caller attempt. Retrying an injection blindly can
//! double-pay.

pub mod error;
pub mod node;
pub mod provider;
pub mod reward;
pub mod signer;
pub mod wire;

pub use {
    error::{Result, RpcError},
    node::{HeadBlock, HttpNodeClient, NodeClient},
    provider::RewardProvider,
    reward::RpcRewardProvider,
    signer::{HttpSignerClient, SignerClient},
};
