//! Cycle producer: polls the node, runs the allocator for every newly
//! payable cycle and feeds the bounded work queue.

use {
    crate::{
        config::{DaemonConfig, RewardsType, RunMode},
        exit::{is_disk_full, EXIT_DISK_FULL, EXIT_PROVIDER, EXIT_SUCCESS},
    },
    chrono::{DateTime, Utc},
    crossbeam_channel::{SendTimeoutError, Sender},
    log::{debug, error, info, warn},
    payout_calc::PhasedCalculator,
    payout_model::{PaymentBatch, QueueItem},
    payout_rpc::{NodeClient, RewardProvider},
    payout_store::{write_calculation_report, ReportPaths},
    std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    },
};

/// A head older than this counts as a node still catching up.
const BOOTSTRAP_SKEW_SECS: i64 = 120;
/// Blocks to sleep when no cycle is payable yet.
const IDLE_BACKOFF_BLOCKS: u32 = 10;
/// Consecutive provider failures tolerated before giving up on the run.
const MAX_PROVIDER_FAILURES: u32 = 10;

enum ProduceOutcome {
    Enqueued,
    ShuttingDown,
    Transient(String),
    Fatal { code: i32, message: String },
}

pub struct PaymentProducer {
    node: Arc<dyn NodeClient>,
    provider: Arc<dyn RewardProvider>,
    calculator: PhasedCalculator,
    paths: ReportPaths,
    sender: Sender<QueueItem>,
    shutdown: Arc<AtomicBool>,

    baking_address: String,
    rewards_type: RewardsType,
    run_mode: RunMode,
    initial_cycle: u64,
    release_override: i64,
    blocks_per_cycle: u64,
    frozen_deposit_cycles: u64,
    block_delay: Duration,
}

impl PaymentProducer {
    pub fn new(
        config: &DaemonConfig,
        node: Arc<dyn NodeClient>,
        provider: Arc<dyn RewardProvider>,
        calculator: PhasedCalculator,
        paths: ReportPaths,
        sender: Sender<QueueItem>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            node,
            provider,
            calculator,
            paths,
            sender,
            shutdown,
            baking_address: config.baking_address.clone(),
            rewards_type: config.rewards_type,
            run_mode: config.run_mode,
            initial_cycle: config.initial_cycle,
            release_override: config.release_override,
            blocks_per_cycle: config.network.blocks_per_cycle,
            frozen_deposit_cycles: config.network.frozen_deposit_cycles,
            block_delay: config.block_delay(),
        }
    }

    pub fn run(&self) {
        let mut payment_cycle = self.initial_cycle;
        let mut provider_failures = 0_u32;

        while !self.shutdown.load(Ordering::Relaxed) {
            let head = match self.node.head() {
                Ok(head) => head,
                Err(err) => {
                    warn!("head poll failed: {err}");
                    self.sleep_blocks(1);
                    continue;
                }
            };
            if !timestamp_is_recent(&head.header.timestamp, Utc::now()) {
                info!(
                    "node still bootstrapping, head {} is at {}",
                    head.header.level, head.header.timestamp
                );
                self.sleep_blocks(1);
                continue;
            }

            let current_cycle = head.header.level / self.blocks_per_cycle;
            let bound = match payable_bound(
                current_cycle,
                self.frozen_deposit_cycles,
                self.release_override,
            ) {
                Some(bound) => bound,
                None => {
                    debug!("no cycle payable yet at cycle {current_cycle}");
                    self.sleep_blocks(IDLE_BACKOFF_BLOCKS);
                    continue;
                }
            };
            if self.run_mode == RunMode::OneTime {
                // One-shot runs pay exactly the newest payable cycle.
                payment_cycle = payment_cycle.max(bound);
            }

            if payment_cycle > bound {
                match self.run_mode {
                    RunMode::Forever => {
                        debug!("cycle {payment_cycle} not payable before cycle {} ends", bound + 1);
                        self.sleep_blocks(IDLE_BACKOFF_BLOCKS);
                    }
                    _ => {
                        info!("all payable cycles handled, requesting shutdown");
                        self.send_exit(EXIT_SUCCESS);
                        return;
                    }
                }
                continue;
            }

            if self.paths.is_cycle_paid(payment_cycle) {
                info!("cycle {payment_cycle} already has a done report, skipping");
                payment_cycle += 1;
                continue;
            }

            match self.produce_cycle(payment_cycle) {
                ProduceOutcome::Enqueued => {
                    provider_failures = 0;
                    if self.run_mode == RunMode::OneTime {
                        self.send_exit(EXIT_SUCCESS);
                        return;
                    }
                    payment_cycle += 1;
                }
                ProduceOutcome::ShuttingDown => return,
                ProduceOutcome::Transient(message) => {
                    provider_failures += 1;
                    if provider_failures >= MAX_PROVIDER_FAILURES {
                        error!(
                            "giving up on cycle {payment_cycle} after {provider_failures} provider failures: {message}"
                        );
                        self.send_exit(EXIT_PROVIDER);
                        return;
                    }
                    warn!(
                        "cycle {payment_cycle} not produced ({provider_failures}/{MAX_PROVIDER_FAILURES}): {message}"
                    );
                    self.sleep_blocks(IDLE_BACKOFF_BLOCKS);
                }
                ProduceOutcome::Fatal { code, message } => {
                    error!("cycle {payment_cycle} cannot be produced: {message}");
                    self.send_exit(code);
                    return;
                }
            }
        }
    }

    fn produce_cycle(&self, cycle: u64) -> ProduceOutcome {
        info!("producing payments for cycle {cycle}");
        let mut model = match self.provider.rewards_for_cycle(cycle) {
            Ok(model) => model,
            Err(err) => return ProduceOutcome::Transient(err.to_string()),
        };
        model.computed_reward_amount = self.rewards_type.reward_amount(&model);
        info!(
            "cycle {cycle}: distributing {} over {} delegators",
            model.computed_reward_amount,
            model.delegators.len()
        );

        let (entries, total) = match self.calculator.calculate(&model, cycle) {
            Ok(result) => result,
            // Allocator rejections mean the provider data is unusable.
            Err(err) => {
                return ProduceOutcome::Fatal {
                    code: EXIT_PROVIDER,
                    message: err.to_string(),
                }
            }
        };

        let report = self.paths.calculation_report(cycle);
        if let Err(err) = write_calculation_report(&report, &entries, total, &self.baking_address) {
            if err.as_io().is_some_and(is_disk_full) {
                return ProduceOutcome::Fatal {
                    code: EXIT_DISK_FULL,
                    message: err.to_string(),
                };
            }
            return ProduceOutcome::Transient(format!("calculation report: {err}"));
        }

        self.enqueue(PaymentBatch::new(cycle, entries))
    }

    /// Blocking send with shutdown polling; a full queue simply delays
    /// the producer.
    fn enqueue(&self, batch: PaymentBatch) -> ProduceOutcome {
        let mut item = QueueItem::Batch(batch);
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return ProduceOutcome::ShuttingDown;
            }
            match self
                .sender
                .send_timeout(item, Duration::from_secs(1))
            {
                Ok(()) => return ProduceOutcome::Enqueued,
                Err(SendTimeoutError::Timeout(unsent)) => item = unsent,
                Err(SendTimeoutError::Disconnected(_)) => return ProduceOutcome::ShuttingDown,
            }
        }
    }

    fn send_exit(&self, code: i32) {
        if self.sender.send(QueueItem::Exit { code }).is_err() {
            debug!("consumer already gone, exit code {code} dropped");
        }
    }

    fn sleep_blocks(&self, blocks: u32) {
        let deadline = self.block_delay * blocks;
        let mut slept = Duration::ZERO;
        while slept < deadline && !self.shutdown.load(Ordering::Relaxed) {
            let slice = Duration::from_secs(1).min(deadline - slept);
            std::thread::sleep(slice);
            slept += slice;
        }
    }
}

/// Highest cycle whose rewards are unfrozen and payable, if any.
fn payable_bound(current_cycle: u64, frozen_deposit_cycles: u64, release_override: i64) -> Option<u64> {
    let bound = current_cycle as i64 - frozen_deposit_cycles as i64 - 1 - release_override;
    (bound >= 0).then_some(bound as u64)
}

fn timestamp_is_recent(timestamp: &str, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(head_time) => (now - head_time.with_timezone(&Utc)).num_seconds() <= BOOTSTRAP_SKEW_SECS,
        Err(_) => {
            warn!("unparseable head timestamp '{timestamp}'");
            false
        }
    }
}
