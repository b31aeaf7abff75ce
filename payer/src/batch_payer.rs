//! The batch executor itself.

use {
    crate::{
        chunk::sort_and_chunk,
        constants::{
            required_fee, signed_operation_size, GAS_LIMIT_ALLOCATED, GAS_LIMIT_NON_ALLOCATED,
            HARD_GAS_LIMIT_PER_OPERATION, HARD_STORAGE_LIMIT_PER_OPERATION, COST_PER_BYTE,
            MAX_BATCH_ATTEMPTS, REACTIVATION_BURN_FEE, SIMULATION_GAS_MARGIN,
            STORAGE_LIMIT_ALLOCATED, STORAGE_LIMIT_NON_ALLOCATED, TRIALS_PER_BLOCK,
            TX_FEE_ALLOCATED, TX_FEE_NON_ALLOCATED, CONFIRMATION_BLOCKS, FEE_PER_GAS_UNIT,
            ZERO_THRESHOLD,
        },
        counter::OpCounter,
        error::{PayError, Result},
    },
    log::{debug, error, info, warn},
    payout_model::{PaymentStatus, RewardLog},
    payout_rpc::{
        wire::{
            decode_signature, ForgeRequest, PreapplyOperation, RunOperationRequest,
            TransferContent,
        },
        NodeClient, RpcError, SignerClient,
    },
    rand::Rng,
    std::{sync::Arc, thread, time::Duration},
};

/// Raw signature appended to the forged bytes, in bytes.
pub const SIGNATURE_SIZE: u64 = 64;

#[derive(Debug, Clone)]
pub struct BatchPayerConfig {
    /// Payout source address; must be an implicit account the signer
    /// holds the key for.
    pub source: String,
    pub delegator_pays_transfer_fee: bool,
    pub delegator_pays_reactivation_fee: bool,
    /// The chain's minimal block delay; paces the confirmation poll
    /// and the retry backoff.
    pub block_delay: Duration,
    /// Ceiling on simulated transfer + burn fee for contract
    /// destinations.
    pub contract_fee_ceiling: u64,
    /// Stop short of injection.
    pub dry_run: bool,
}

/// Condition that must abort the whole daemon, not just this batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    InsufficientFunds,
}

/// Outcome of a `pay` run.
#[derive(Debug)]
pub struct PayResult {
    /// Every input entry, each carrying a terminal status.
    pub logs: Vec<RewardLog>,
    pub attempts: u32,
    /// Net amount moved out of the payout address, minor units.
    pub paid_amount: u64,
    /// How many further cycles the payout balance covers; `None` when
    /// the balance query failed. Negative means this cycle could not
    /// be funded.
    pub future_payable_cycles: Option<i64>,
    pub exit: Option<ExitReason>,
}

enum Simulation {
    Priced { gas: u64, fee: u64, storage: u64 },
    Rejected { reason: String },
}

pub struct BatchPayer {
    node: Arc<dyn NodeClient>,
    signer: Arc<dyn SignerClient>,
    config: BatchPayerConfig,
    /// Minimum amount worth attempting before per-item fee deductions.
    default_zero_threshold: u64,
}

impl BatchPayer {
    pub fn new(
        node: Arc<dyn NodeClient>,
        signer: Arc<dyn SignerClient>,
        config: BatchPayerConfig,
    ) -> Self {
        let mut default_zero_threshold = ZERO_THRESHOLD;
        if config.delegator_pays_transfer_fee {
            default_zero_threshold += TX_FEE_ALLOCATED;
        }
        info!(
            "transfer fee is {TX_FEE_ALLOCATED} mutez, paid by {}; minimum payment is {default_zero_threshold} mutez",
            if config.delegator_pays_transfer_fee { "delegator" } else { "delegate" },
        );
        Self {
            node,
            signer,
            config,
            default_zero_threshold,
        }
    }

    /// Execute the cycle's entries. Every input entry comes back in
    /// `logs` with a terminal status.
    pub fn pay(&self, entries: Vec<RewardLog>) -> Result<PayResult> {
        info!("{} payment items to process", entries.len());
        let mut logs = Vec::with_capacity(entries.len());
        let mut candidates = Vec::new();
        let mut estimated_transfer_fees = 0_u64;
        let mut estimated_burn_fees = 0_u64;

        for mut entry in entries {
            if entry.paid.is_processed() {
                debug!("{} already {}", entry.payment_address, entry.paid);
                logs.push(entry);
                continue;
            }
            // Entries from a failed report re-enter the machine.
            if entry.paid.is_fail() {
                entry.paid = PaymentStatus::Undefined;
            }
            if !entry.payable {
                info!(
                    "skipping payout to {} of {} mutez: {}",
                    entry.address, entry.amount, entry.skip_reason
                );
                logs.push(entry);
                continue;
            }

            let mut threshold = self.default_zero_threshold;
            let mut transfer_fee = TX_FEE_ALLOCATED;
            let mut burn_fee = 0;
            if entry.needs_activation {
                let surcharge = TX_FEE_NON_ALLOCATED - TX_FEE_ALLOCATED;
                transfer_fee += surcharge;
                burn_fee = REACTIVATION_BURN_FEE;
                if self.config.delegator_pays_transfer_fee {
                    threshold += surcharge;
                }
                if self.config.delegator_pays_reactivation_fee {
                    threshold += burn_fee;
                }
            }

            if entry.amount >= threshold {
                estimated_transfer_fees += transfer_fee;
                estimated_burn_fees += burn_fee;
                candidates.push(entry);
            } else {
                entry.paid = PaymentStatus::Done;
                entry.push_note("Payment amount below threshold. ");
                debug!(
                    "skipping payout to {}: {} mutez below minimum of {} mutez",
                    entry.address, entry.amount, threshold
                );
                logs.push(entry);
            }
        }

        if candidates.is_empty() {
            info!("no payment items above threshold, nothing to send");
            return Ok(PayResult {
                logs,
                attempts: 0,
                paid_amount: 0,
                future_payable_cycles: None,
                exit: None,
            });
        }

        // Projection of the payout balance over this and future cycles.
        let mut estimated_cost: u64 = candidates.iter().map(|e| e.amount).sum();
        if !self.config.delegator_pays_transfer_fee {
            estimated_cost += estimated_transfer_fees;
        }
        if !self.config.delegator_pays_reactivation_fee {
            estimated_cost += estimated_burn_fees;
        }
        info!("total estimated amount to pay out is {estimated_cost} mutez");

        let future_payable_cycles = match self.node.balance(&self.config.source) {
            Ok(balance) => {
                info!("current payout address balance is {balance} mutez");
                Some((balance / estimated_cost) as i64 - 1)
            }
            Err(err) => {
                warn!("payout balance query failed: {err}");
                None
            }
        };

        if matches!(future_payable_cycles, Some(cycles) if cycles < 0) {
            error!(
                "insufficient funds in payout address, {estimated_cost} mutez needed; nothing will be paid"
            );
            for mut entry in candidates {
                entry.paid = PaymentStatus::Fail;
                entry.push_note("Insufficient funds. ");
                logs.push(entry);
            }
            return Ok(PayResult {
                logs,
                attempts: 0,
                paid_amount: 0,
                future_payable_cycles,
                exit: Some(ExitReason::InsufficientFunds),
            });
        }

        let chunks = sort_and_chunk(candidates);
        info!("payments will be sent in {} batch(es)", chunks.len());

        let mut op_counter = OpCounter::new();
        let mut total_attempts = 0;
        let mut gross_paid = 0_u64;
        let mut delegator_fees = 0_u64;
        let mut delegate_fees = 0_u64;

        for (batch_no, mut chunk) in chunks.into_iter().enumerate() {
            info!("payment of batch {} started", batch_no + 1);
            let (attempts, status) = self.pay_single_batch(&mut chunk, &mut op_counter)?;
            info!(
                "payment of batch {} {} in {attempts} attempt(s)",
                batch_no + 1,
                if status.is_fail() { "failed" } else { "succeeded" },
            );
            total_attempts += attempts;

            for entry in &chunk {
                if entry.paid.is_paid() || entry.paid.is_injected() || entry.paid.is_done() {
                    gross_paid += entry.amount;
                    delegator_fees += entry.delegator_transaction_fee;
                    delegate_fees += entry.delegate_transaction_fee;
                }
            }
            logs.extend(chunk);
        }

        let paid_amount = gross_paid - delegator_fees + delegate_fees;
        info!(
            "total amount paid out is {paid_amount} mutez in {total_attempts} attempt(s)"
        );

        Ok(PayResult {
            logs,
            attempts: total_attempts,
            paid_amount,
            future_payable_cycles,
            exit: None,
        })
    }

    fn pay_single_batch(
        &self,
        items: &mut [RewardLog],
        op_counter: &mut OpCounter,
    ) -> Result<(u32, PaymentStatus)> {
        let mut status = PaymentStatus::Undefined;
        let mut operation_hash = None;
        let mut message = String::new();
        let mut attempts = 0;

        for attempt in 1..=MAX_BATCH_ATTEMPTS {
            match self.attempt_single_batch(items, op_counter) {
                Ok((s, hash, msg)) => {
                    status = s;
                    operation_hash = hash;
                    message = msg;
                }
                Err(PayError::CounterUnset) => return Err(PayError::CounterUnset),
                Err(err) => {
                    error!(
                        "batch payment attempt {attempt}/{MAX_BATCH_ATTEMPTS} failed: {err}"
                    );
                    status = PaymentStatus::Fail;
                    operation_hash = None;
                    message = format!("{err}. ");
                }
            }

            if self.config.dry_run || status.is_fail() {
                op_counter.rollback();
            } else {
                op_counter.commit();
            }
            // Force a counter re-read on the next attempt.
            op_counter.set(None);
            attempts += 1;

            if !status.is_fail() {
                break;
            }
            if attempt < MAX_BATCH_ATTEMPTS {
                self.wait_random_block_delay();
            }
        }

        for item in items.iter_mut() {
            if item.paid.is_undefined() {
                item.paid = status;
                item.hash = operation_hash.clone();
                item.push_note(&message);
            }
        }

        Ok((attempts, status))
    }

    fn attempt_single_batch(
        &self,
        items: &mut [RewardLog],
        op_counter: &mut OpCounter,
    ) -> Result<(PaymentStatus, Option<String>, String)> {
        if op_counter.get().is_none() {
            let counter = self.node.counter(&self.config.source)?;
            op_counter.set(Some(counter));
        }
        let base_counter = op_counter.get().ok_or(PayError::CounterUnset)?;

        let head = self.node.payment_head()?;
        let branch = head.hash.clone();
        let chain_id = head.chain_id.clone();
        let protocol = head.metadata.protocol.clone();
        debug!("branch {branch} counter {base_counter} protocol {protocol}");

        let mut contents: Vec<TransferContent> = Vec::new();
        // Index of the item backing each content, for fee attribution.
        let mut owners: Vec<usize> = Vec::new();
        let mut total_gas = 0_u64;
        let mut total_tx_fees = 0_u64;

        for (idx, item) in items.iter_mut().enumerate() {
            if !item.paid.is_undefined() {
                continue;
            }
            // Fee accounting restarts on every attempt.
            item.delegator_transaction_fee = 0;
            item.delegate_transaction_fee = 0;

            let mut gas_limit = GAS_LIMIT_ALLOCATED;
            let mut storage_limit = STORAGE_LIMIT_ALLOCATED;
            let mut tx_fee = TX_FEE_ALLOCATED;
            let mut burn_fee = 0;

            if item.is_contract_destination() {
                match self.simulate_single_operation(item, &branch, &chain_id, base_counter) {
                    Ok(Simulation::Priced { gas, fee, storage }) => {
                        gas_limit = gas;
                        tx_fee = fee;
                        storage_limit = storage;
                        burn_fee = COST_PER_BYTE * storage;

                        let total_fee = tx_fee + burn_fee;
                        if total_fee > self.config.contract_fee_ceiling {
                            info!(
                                "payment to {} needs {total_fee} mutez in fees, above the {} mutez ceiling; avoiding",
                                item.payment_address, self.config.contract_fee_ceiling
                            );
                            item.paid = PaymentStatus::Avoided;
                            item.push_note("Contract fees above configured ceiling. ");
                            continue;
                        }
                        if item.amount.saturating_sub(total_fee) < ZERO_THRESHOLD {
                            info!(
                                "payment to {} of {} mutez is below its own fees; avoiding",
                                item.payment_address, item.amount
                            );
                            item.paid = PaymentStatus::Avoided;
                            item.push_note("Contract fees exceed payment amount. ");
                            continue;
                        }
                    }
                    Ok(Simulation::Rejected { reason }) => {
                        info!(
                            "payment to {} could not be simulated ({reason}); avoiding. Consider a redirect rule to the owner address",
                            item.payment_address
                        );
                        item.paid = PaymentStatus::Avoided;
                        item.push_note(&format!("Simulation rejected: {reason}. "));
                        continue;
                    }
                    Err(err) => {
                        warn!("simulation for {} errored: {err}", item.payment_address);
                        item.paid = PaymentStatus::Fail;
                        item.push_note("Payment simulation errored. ");
                        continue;
                    }
                }
            } else if item.needs_activation {
                tx_fee += TX_FEE_NON_ALLOCATED - TX_FEE_ALLOCATED;
                gas_limit += GAS_LIMIT_NON_ALLOCATED - GAS_LIMIT_ALLOCATED;
                storage_limit += STORAGE_LIMIT_NON_ALLOCATED;
                burn_fee = REACTIVATION_BURN_FEE;
            }

            let mut amount = item.amount;
            if burn_fee > 0 {
                if self.config.delegator_pays_reactivation_fee {
                    amount = amount.saturating_sub(burn_fee);
                    item.delegator_transaction_fee += burn_fee;
                } else {
                    item.delegate_transaction_fee += burn_fee;
                }
            }
            if self.config.delegator_pays_transfer_fee {
                amount = amount.saturating_sub(tx_fee);
                item.delegator_transaction_fee += tx_fee;
            } else {
                item.delegate_transaction_fee += tx_fee;
            }

            if amount < ZERO_THRESHOLD {
                item.paid = PaymentStatus::Done;
                item.delegator_transaction_fee = 0;
                item.delegate_transaction_fee = 0;
                item.push_note("Payment amount below threshold after fees. ");
                info!(
                    "payment to {} became smaller than {ZERO_THRESHOLD} mutez after fees, skipping",
                    item.payment_address
                );
                continue;
            }

            let counter_value = op_counter.inc()?;
            total_gas += gas_limit;
            total_tx_fees += tx_fee;
            contents.push(TransferContent::transaction(
                &self.config.source,
                &item.payment_address,
                amount,
                counter_value,
                tx_fee,
                gas_limit,
                storage_limit,
            ));
            owners.push(idx);
        }

        if contents.is_empty() {
            return Ok((PaymentStatus::Done, None, String::new()));
        }

        // Dry validation of the whole batch before forging.
        debug!("running {} operations", contents.len());
        let run_request = RunOperationRequest::new(&branch, &contents, &chain_id);
        let simulated = self.node.run_operation(&run_request)?;
        for content in &simulated.contents {
            if let Some(result) = &content.metadata.operation_result {
                if result.is_failed() {
                    let message = format!(
                        "Operation validation failed: {}. ",
                        result.first_error().unwrap_or("unknown error")
                    );
                    error!("{message}");
                    return Ok((PaymentStatus::Fail, None, message));
                }
            }
        }

        // Forge, then top up the first operation's fee until the batch
        // meets the minimal-fee formula. The node prices the batch on
        // the fee sum, not per operation.
        debug!("forging {} operations", contents.len());
        let forge_request = ForgeRequest {
            branch: &branch,
            contents: &contents,
        };
        let mut forged = self.node.forge(&forge_request)?;
        let mut required = required_fee(total_gas, signed_operation_size(&forged));
        while total_tx_fees < required {
            let shortfall = required - total_tx_fees;
            debug!("topping up batch fee by {shortfall} mutez");
            contents[0].fee += shortfall;
            items[owners[0]].delegate_transaction_fee += shortfall;
            total_tx_fees = required;

            let forge_request = ForgeRequest {
                branch: &branch,
                contents: &contents,
            };
            forged = self.node.forge(&forge_request)?;
            required = required_fee(total_gas, signed_operation_size(&forged));
        }

        let signature = self.signer.sign(&forged)?;
        let raw_signature = decode_signature(&signature)?;

        debug!("preapplying the operations");
        let preapply = [PreapplyOperation {
            protocol: &protocol,
            branch: &branch,
            contents: &contents,
            signature: &signature,
        }];
        self.node.preapply(&preapply)?;

        if self.config.dry_run {
            info!("dry run, skipping injection of {} operations", contents.len());
            return Ok((PaymentStatus::Done, None, String::new()));
        }

        let level_before_injection = self.node.head()?.header.level;
        let signed_bytes = format!("{forged}{raw_signature}");
        let operation_hash = self.node.inject(&signed_bytes)?;
        info!("operation hash is {operation_hash}");

        self.wait_for_inclusion(operation_hash, level_before_injection)
    }

    /// Poll the confirmation window for the injected hash. Finding it
    /// is `Paid`; exhausting the window is `Injected` — the operation
    /// may still land, so it is never blindly retried.
    fn wait_for_inclusion(
        &self,
        operation_hash: String,
        level_before_injection: u64,
    ) -> Result<(PaymentStatus, Option<String>, String)> {
        info!(
            "waiting for operation {operation_hash} to be included, do not interrupt"
        );
        for level in level_before_injection + 1..=level_before_injection + CONFIRMATION_BLOCKS {
            let mut hashes = None;
            for _ in 0..TRIALS_PER_BLOCK {
                self.sleep_block_delay();
                match self.node.operation_hashes(level) {
                    Ok(groups) => {
                        hashes = Some(groups);
                        break;
                    }
                    Err(err) => debug!("level {level} not queryable yet: {err}"),
                }
            }
            let Some(groups) = hashes else {
                warn!("level {level} could not be queried for operation hashes");
                break;
            };
            if groups.iter().flatten().any(|h| *h == operation_hash) {
                info!("operation {operation_hash} is included at level {level}");
                return Ok((PaymentStatus::Paid, Some(operation_hash), String::new()));
            }
            debug!("operation {operation_hash} not included at level {level}");
        }

        let message = format!("Operation {operation_hash} confirmation window exhausted. ");
        warn!("{message}");
        Ok((PaymentStatus::Injected, Some(operation_hash), message))
    }

    /// Price a single contract transfer by simulation: discover gas and
    /// storage, then raise the fee until the forged operation meets the
    /// minimal-fee formula.
    fn simulate_single_operation(
        &self,
        item: &RewardLog,
        branch: &str,
        chain_id: &str,
        base_counter: u64,
    ) -> Result<Simulation> {
        let mut tx_fee = 10 * TX_FEE_ALLOCATED;
        let probe = TransferContent::transaction(
            &self.config.source,
            &item.payment_address,
            item.amount,
            base_counter + 1,
            tx_fee,
            HARD_GAS_LIMIT_PER_OPERATION,
            HARD_STORAGE_LIMIT_PER_OPERATION,
        );
        let request = RunOperationRequest::new(branch, std::slice::from_ref(&probe), chain_id);
        let response = self.node.run_operation(&request)?;
        let Some(simulated) = response.contents.first() else {
            return Err(RpcError::BadResponse {
                path: "run_operation".to_string(),
                reason: "empty contents in simulation response".to_string(),
            }
            .into());
        };

        let applied = simulated
            .metadata
            .operation_result
            .as_ref()
            .is_some_and(|r| r.is_applied());
        if !applied {
            let reason = simulated
                .metadata
                .operation_result
                .as_ref()
                .and_then(|r| r.first_error())
                .unwrap_or("operation not applied")
                .to_string();
            return Ok(Simulation::Rejected { reason });
        }

        let gas = simulated.metadata.consumed_gas() + SIMULATION_GAS_MARGIN;
        let storage = simulated.metadata.consumed_storage();
        tx_fee += (FEE_PER_GAS_UNIT * gas as f64).ceil() as u64;

        loop {
            let content = TransferContent::transaction(
                &self.config.source,
                &item.payment_address,
                item.amount,
                base_counter + 1,
                tx_fee,
                gas,
                storage,
            );
            let forged = self.node.forge(&ForgeRequest {
                branch,
                contents: std::slice::from_ref(&content),
            })?;
            let required = required_fee(gas, signed_operation_size(&forged));
            if tx_fee >= required {
                break;
            }
            tx_fee = required;
        }

        Ok(Simulation::Priced {
            gas,
            fee: tx_fee,
            storage,
        })
    }

    fn sleep_block_delay(&self) {
        if !self.config.block_delay.is_zero() {
            thread::sleep(self.config.block_delay);
        }
    }

    fn wait_random_block_delay(&self) {
        let max_secs = self.config.block_delay.as_secs();
        if max_secs == 0 {
            return;
        }
        let secs = rand::rng().random_range(1..=max_secs);
        debug!("waiting {secs}s before the next attempt");
        thread::sleep(Duration::from_secs(secs));
    }
}
