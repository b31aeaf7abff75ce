//! # Payout daemon
//!
//! Orchestrates the pipeline end to end: a producer thread polls the
//! node and runs the allocator for each newly payable cycle, a consumer
//! thread executes the resulting batches, and a retry thread re-feeds
//! failure reports. The three meet on a bounded queue owned by the
//! supervisor, which turns the first fatal condition into the process
//! exit code.

pub mod config;
pub mod consumer;
pub mod exit;
pub mod notify;
pub mod producer;
pub mod retry;
pub mod supervisor;

pub use {
    config::{ConfigError, DaemonConfig, RunMode},
    notify::{LogNotificationSink, NotificationSink},
    supervisor::Supervisor,
};
