//! Batch shaping: homogeneous, bounded chunks.

use {
    crate::constants::{MAX_TX_PER_BATCH_CONTRACT, MAX_TX_PER_BATCH_PLAIN},
    payout_model::RewardLog,
};

/// Partition entries into plain-destination and contract-destination
/// groups, order each by (kind, staking balance, address), and cut
/// them into batches of at most 550 plain or 25 contract transfers.
/// Contract batches are small because every member is simulated.
pub fn sort_and_chunk(entries: Vec<RewardLog>) -> Vec<Vec<RewardLog>> {
    let (mut contract, mut plain): (Vec<_>, Vec<_>) =
        entries.into_iter().partition(|e| e.is_contract_destination());
    plain.sort_by(|a, b| a.cmp_by_kind_balance(b));
    contract.sort_by(|a, b| a.cmp_by_kind_balance(b));

    let mut chunks = Vec::new();
    chunk_into(&mut chunks, plain, MAX_TX_PER_BATCH_PLAIN);
    chunk_into(&mut chunks, contract, MAX_TX_PER_BATCH_CONTRACT);
    chunks
}

fn chunk_into(chunks: &mut Vec<Vec<RewardLog>>, mut entries: Vec<RewardLog>, size: usize) {
    while entries.len() > size {
        let rest = entries.split_off(size);
        chunks.push(std::mem::replace(&mut entries, rest));
    }
    if !entries.is_empty() {
        chunks.push(entries);
    }
}
