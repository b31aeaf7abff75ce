//! Units of handoff between the producer and consumer threads.

use crate::reward_log::RewardLog;

/// One cycle's worth of reward entries, ready for the late phases and
/// the payment executor.
#[derive(Debug, Clone)]
pub struct PaymentBatch {
    pub cycle: u64,
    pub entries: Vec<RewardLog>,
}

impl PaymentBatch {
    pub fn new(cycle: u64, entries: Vec<RewardLog>) -> Self {
        Self { cycle, entries }
    }
}

/// What travels on the work queue. Shutdown is an explicit sentinel so
/// the consumer can drain and terminate cleanly; the carried code is
/// the process exit code the supervisor reports.
#[derive(Debug, Clone)]
pub enum QueueItem {
    Batch(PaymentBatch),
    Exit { code: i32 },
}
