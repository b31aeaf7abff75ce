//! Payment consumer: drains the work queue, re-runs the destination
//! phases and hands each batch to the payment executor.
//!
//! Redirect mapping and the zero-balance gate run here rather than in
//! the producer so retry batches — parsed back from failure reports
//! with refreshed balances — go through them again. Merging does NOT:
//! the allocator merged before amounts were finalized, and report rows
//! are already one per transfer.

use {
    crate::{
        exit::{
            is_disk_full, EXIT_DISK_FULL, EXIT_INSUFFICIENT_FUNDS, EXIT_PAYMENT_FAILURES,
            EXIT_SIGNER, EXIT_SUCCESS,
        },
        notify::NotificationSink,
    },
    crossbeam_channel::{Receiver, Sender},
    log::{error, info, warn},
    payout_calc::phases::{gate_zero_balance, remap_destinations},
    payout_model::{PaymentBatch, PaymentStatus, QueueItem, RewardLog},
    payout_payer::{BatchPayer, ExitReason, PayError, PayResult},
    payout_rpc::RpcError,
    payout_store::{write_payment_report, DirMarkerStore, MarkerKey, MarkerStore, ReportPaths},
    std::{collections::HashMap, sync::Arc},
};

/// Warn the operator when projected funds drop below this many cycles.
const LOW_FUNDS_WARNING_CYCLES: i64 = 3;

/// Seam between the consumer and the concrete executor, so the loop is
/// testable without a node.
pub trait PaymentExecutor: Send {
    fn pay(&self, entries: Vec<RewardLog>) -> payout_payer::Result<PayResult>;
}

impl PaymentExecutor for BatchPayer {
    fn pay(&self, entries: Vec<RewardLog>) -> payout_payer::Result<PayResult> {
        BatchPayer::pay(self, entries)
    }
}

pub struct PaymentConsumer {
    receiver: Receiver<QueueItem>,
    payer: Box<dyn PaymentExecutor>,
    paths: ReportPaths,
    markers: DirMarkerStore,
    redirects: HashMap<String, String>,
    reactivate_zeroed: bool,
    sink: Arc<dyn NotificationSink>,
    retry_wake: Sender<()>,
}

impl PaymentConsumer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        receiver: Receiver<QueueItem>,
        payer: Box<dyn PaymentExecutor>,
        paths: ReportPaths,
        markers: DirMarkerStore,
        redirects: HashMap<String, String>,
        reactivate_zeroed: bool,
        sink: Arc<dyn NotificationSink>,
        retry_wake: Sender<()>,
    ) -> Self {
        Self {
            receiver,
            payer,
            paths,
            markers,
            redirects,
            reactivate_zeroed,
            sink,
            retry_wake,
        }
    }

    /// Drain the queue until an `Exit` sentinel (or every sender hangs
    /// up). Returns the process exit code.
    pub fn run(&self) -> i32 {
        let mut left_failures = false;
        while let Ok(item) = self.receiver.recv() {
            match item {
                QueueItem::Exit { code } => {
                    info!("exit sentinel received, code {code}");
                    if code == EXIT_SUCCESS && left_failures {
                        return EXIT_PAYMENT_FAILURES;
                    }
                    return code;
                }
                QueueItem::Batch(batch) => match self.process(batch) {
                    Ok(true) => {
                        // A clean cycle may unblock previously failed
                        // ones, so nudge the retry sweep.
                        let _ = self.retry_wake.try_send(());
                    }
                    Ok(false) => left_failures = true,
                    Err(code) => return code,
                },
            }
        }
        if left_failures {
            EXIT_PAYMENT_FAILURES
        } else {
            EXIT_SUCCESS
        }
    }

    /// One batch end to end. `Ok(success)` keeps the loop alive,
    /// `Err(code)` aborts the daemon.
    fn process(&self, batch: PaymentBatch) -> Result<bool, i32> {
        let cycle = batch.cycle;
        info!("cycle {cycle}: batch of {} entries received", batch.entries.len());

        let entries = remap_destinations(batch.entries, &self.redirects);
        let entries = gate_zero_balance(entries, self.reactivate_zeroed);
        let mut entries: Vec<RewardLog> = entries
            .into_iter()
            .filter(|entry| entry.payable || entry.paid.is_processed())
            .collect();

        // Markers close the crash window between inject and report
        // write: anything marked was paid even if no report says so.
        for entry in entries.iter_mut() {
            if !entry.payable || entry.paid.is_processed() {
                continue;
            }
            let key = self.marker_key(cycle, entry);
            match self.markers.exists(&key) {
                Ok(true) => {
                    entry.paid = PaymentStatus::Avoided;
                    entry.push_note("Marked paid by an earlier run. ");
                }
                Ok(false) => {}
                Err(err) => warn!("marker lookup failed for {}: {err}", entry.payment_address),
            }
        }

        let result = match self.payer.pay(entries) {
            Ok(result) => result,
            Err(PayError::Rpc(RpcError::SignerUnreachable(reason))) => {
                error!("cycle {cycle} halted, signer unreachable: {reason}");
                self.sink.notify(
                    "payments halted",
                    &format!("signer unreachable while paying cycle {cycle}: {reason}"),
                );
                return Err(EXIT_SIGNER);
            }
            Err(err) => {
                error!("cycle {cycle} payment aborted: {err}");
                return Ok(false);
            }
        };

        let success = result.logs.iter().all(|log| !log.paid.is_fail());
        let report = if success {
            self.paths.done_report(cycle)
        } else {
            self.paths.failed_report(cycle)
        };
        if let Err(err) = write_payment_report(&report, &result.logs) {
            // The report is the idempotency record; running on without
            // it risks paying the cycle twice.
            error!("cannot write payment report {}: {err}", report.display());
            return Err(if err.as_io().is_some_and(is_disk_full) {
                EXIT_DISK_FULL
            } else {
                EXIT_PAYMENT_FAILURES
            });
        }
        for log in result.logs.iter().filter(|log| log.payable && log.paid.is_processed()) {
            if let Err(err) = self.markers.mark(&self.marker_key(cycle, log)) {
                warn!("cannot mark {} as paid: {err}", log.payment_address);
            }
        }
        if success {
            if let Err(err) = self.paths.remove_failure_artifacts(cycle) {
                warn!("stale failure reports for cycle {cycle} not removed: {err}");
            }
        }

        let processed = result.logs.iter().filter(|log| log.paid.is_processed()).count();
        let failed = result.logs.iter().filter(|log| log.paid.is_fail()).count();
        self.sink.notify(
            &format!("cycle {cycle} payment {}", if success { "completed" } else { "failed" }),
            &format!(
                "{processed} processed, {failed} failed, {} units paid in {} attempt(s)",
                result.paid_amount, result.attempts
            ),
        );

        if matches!(result.exit, Some(ExitReason::InsufficientFunds)) {
            self.sink.notify(
                "payments halted",
                &format!("payment address cannot fund cycle {cycle}"),
            );
            return Err(EXIT_INSUFFICIENT_FUNDS);
        }
        if let Some(cycles) = result.future_payable_cycles {
            if cycles < LOW_FUNDS_WARNING_CYCLES {
                self.sink.notify(
                    "low balance",
                    &format!("remaining funds cover about {cycles} more cycle(s)"),
                );
            }
        }
        Ok(success)
    }

    fn marker_key(&self, cycle: u64, entry: &RewardLog) -> MarkerKey {
        MarkerKey {
            cycle,
            address: entry.payment_address.clone(),
            kind: entry.kind,
        }
    }
}
