//! Retry sweep over the failure reports on disk.

use {
    crossbeam_channel::{Receiver, RecvTimeoutError, Sender},
    log::{info, warn},
    payout_model::{PaymentBatch, PaymentStatus, QueueItem},
    payout_rpc::RewardProvider,
    payout_store::{parse_payment_report, paths::BUSY_SUFFIX, ReportPaths},
    std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    },
};

/// Periodic sweep interval; a consumer success wakes the sweep early.
const RETRY_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub struct RetryProducer {
    paths: ReportPaths,
    provider: Arc<dyn RewardProvider>,
    sender: Sender<QueueItem>,
    initial_cycle: u64,
    /// Also re-pay entries whose confirmation window was exhausted.
    /// Off by default: an injected operation may still land, and paying
    /// it again doubles the payout.
    retry_injected: bool,
}

impl RetryProducer {
    pub fn new(
        paths: ReportPaths,
        provider: Arc<dyn RewardProvider>,
        sender: Sender<QueueItem>,
        initial_cycle: u64,
        retry_injected: bool,
    ) -> Self {
        Self {
            paths,
            provider,
            sender,
            initial_cycle,
            retry_injected,
        }
    }

    /// Sweep once on startup, then hourly until the queue closes.
    pub fn run(&self, wake: Receiver<()>, shutdown: &AtomicBool) {
        self.scan_once();
        loop {
            match wake.recv_timeout(RETRY_INTERVAL) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            self.scan_once();
        }
    }

    /// One pass over `failed/`: enqueue every cycle that still carries
    /// retryable entries.
    pub fn scan_once(&self) {
        let cycles = match self.paths.failed_cycles(self.initial_cycle) {
            Ok(cycles) => cycles,
            Err(err) => {
                warn!("failure report scan failed: {err}");
                return;
            }
        };
        if !cycles.is_empty() {
            info!("{} cycle(s) with failure reports: {cycles:?}", cycles.len());
        }

        for cycle in cycles {
            if self.paths.is_cycle_paid(cycle) {
                info!("cycle {cycle} settled meanwhile, clearing stale failure report");
                if let Err(err) = self.paths.remove_failure_artifacts(cycle) {
                    warn!("cannot clear failure artifacts for cycle {cycle}: {err}");
                }
                continue;
            }
            let Some(report) = self.paths.existing_failed_report(cycle) else {
                continue;
            };

            let mut entries = match parse_payment_report(&report, cycle) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("cannot parse {}: {err}", report.display());
                    continue;
                }
            };
            if self.retry_injected {
                for entry in entries.iter_mut() {
                    if entry.paid.is_injected() {
                        entry.paid = PaymentStatus::Fail;
                        entry.push_note("Confirmation never observed; retried on request. ");
                    }
                }
            }
            if !entries.iter().any(|entry| entry.paid.is_fail()) {
                info!("cycle {cycle} report carries no retryable entries");
                continue;
            }

            // The zero-balance gate must see the present chain state,
            // not balances from the original failed run.
            if let Err(err) = self.provider.refresh_current_balances(&mut entries) {
                warn!("balance refresh for cycle {cycle} failed, deferring: {err}");
                continue;
            }

            if !report.to_string_lossy().ends_with(BUSY_SUFFIX) {
                if let Err(err) = self.paths.mark_busy(&report) {
                    warn!("cannot mark {} busy: {err}", report.display());
                    continue;
                }
            }
            info!("cycle {cycle} re-enqueued from {}", report.display());
            if self.sender.send(QueueItem::Batch(PaymentBatch::new(cycle, entries))).is_err() {
                return;
            }
        }
    }
}
