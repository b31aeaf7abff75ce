//! Archive-node-backed reward provider.
//!
//! Pulls the delegator snapshot from the first block of the cycle and
//! the baker's reward totals from the freezer balance updates of the
//! block where the cycle's rewards unfreeze. Needs a node that keeps
//! the relevant history.

use {
    crate::{
        error::{Result, RpcError},
        node::{HttpNodeClient, NodeClient},
        provider::RewardProvider,
        wire::string_u64,
    },
    log::{debug, info},
    payout_model::{DelegatorBalance, RewardLog, RewardProviderModel},
    serde::Deserialize,
    std::{collections::HashMap, sync::Arc},
};

#[derive(Debug, Deserialize)]
struct DelegateInfo {
    #[serde(with = "string_u64")]
    staking_balance: u64,
    #[serde(with = "string_u64")]
    delegated_balance: u64,
    #[serde(default)]
    delegated_contracts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BlockMetadata {
    #[serde(default)]
    balance_updates: Vec<BalanceUpdate>,
}

#[derive(Debug, Deserialize)]
struct BalanceUpdate {
    kind: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    delegate: Option<String>,
    change: String,
}

pub struct RpcRewardProvider {
    node: Arc<HttpNodeClient>,
    baking_address: String,
    blocks_per_cycle: u64,
    frozen_deposit_cycles: u64,
}

impl RpcRewardProvider {
    pub fn new(
        node: Arc<HttpNodeClient>,
        baking_address: &str,
        blocks_per_cycle: u64,
        frozen_deposit_cycles: u64,
    ) -> Self {
        Self {
            node,
            baking_address: baking_address.to_string(),
            blocks_per_cycle,
            frozen_deposit_cycles,
        }
    }

    /// First block of the cycle, where delegation balances are read.
    fn snapshot_level(&self, cycle: u64) -> u64 {
        cycle * self.blocks_per_cycle + 1
    }

    /// Last block of the cycle whose metadata carries the unfreeze
    /// updates for `cycle`.
    fn unfreeze_level(&self, cycle: u64) -> u64 {
        (cycle + self.frozen_deposit_cycles + 1) * self.blocks_per_cycle
    }

    /// Sums the freezer withdrawals credited back to the baker:
    /// (rewards, fees), both positive.
    fn unfrozen_totals(&self, cycle: u64) -> Result<(u64, u64)> {
        let level = self.unfreeze_level(cycle);
        let head = self.node.head()?;
        if head.header.level < level {
            return Err(RpcError::Provider(format!(
                "rewards for cycle {cycle} unfreeze at level {level}, head is {}",
                head.header.level
            )));
        }

        let path = format!("/chains/main/blocks/{level}/metadata");
        let metadata: BlockMetadata = self.node.get(&path)?;

        let mut rewards: i64 = 0;
        let mut fees: i64 = 0;
        for update in &metadata.balance_updates {
            if update.kind != "freezer" || update.delegate.as_deref() != Some(&self.baking_address)
            {
                continue;
            }
            let change: i64 = update.change.parse().map_err(|_| RpcError::BadResponse {
                path: path.clone(),
                reason: format!("non-numeric balance change '{}'", update.change),
            })?;
            // Unfreezing debits the freezer, so the change is negative.
            match update.category.as_deref() {
                Some("rewards") => rewards = -change,
                Some("fees") => fees = -change,
                _ => {}
            }
        }
        Ok((rewards.max(0) as u64, fees.max(0) as u64))
    }
}

impl RewardProvider for RpcRewardProvider {
    fn rewards_for_cycle(&self, cycle: u64) -> Result<RewardProviderModel> {
        let level = self.snapshot_level(cycle);
        let info: DelegateInfo = self.node.get(&format!(
            "/chains/main/blocks/{level}/context/delegates/{}",
            self.baking_address
        ))?;
        info!(
            "cycle {cycle}: staking balance {} over {} delegators at level {level}",
            info.staking_balance,
            info.delegated_contracts.len()
        );

        let mut delegators = HashMap::new();
        for address in &info.delegated_contracts {
            let staking_balance = self.node.get_numeric(&format!(
                "/chains/main/blocks/{level}/context/contracts/{address}/balance"
            ))?;
            let current_balance = self.node.balance(address)?;
            debug!("delegator {address}: snapshot {staking_balance}, current {current_balance}");
            delegators.insert(
                address.clone(),
                DelegatorBalance {
                    staking_balance,
                    current_balance,
                },
            );
        }

        let (rewards, fees) = self.unfrozen_totals(cycle)?;
        let total = rewards.saturating_add(fees);
        Ok(RewardProviderModel {
            own_delegated_balance: info.staking_balance.saturating_sub(info.delegated_balance),
            external_delegated_balance: info.delegated_balance,
            total_reward_amount: total,
            rewards_and_fees: total,
            delegators,
            ..Default::default()
        })
    }

    fn refresh_current_balances(&self, entries: &mut [RewardLog]) -> Result<()> {
        for entry in entries.iter_mut().filter(|entry| entry.payable) {
            entry.current_balance = self.node.balance(&entry.payment_address)?;
        }
        Ok(())
    }
}
