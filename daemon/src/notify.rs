//! Operator notifications.
//!
//! Sinks are fire-and-forget: a notification that cannot be delivered
//! must never change a payment outcome.

use log::{info, warn};

pub trait NotificationSink: Send + Sync {
    fn notify(&self, subject: &str, message: &str);
}

/// Default sink, writes to the structured log. Failure subjects go out
/// at warn level so they survive quiet log filters.
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, subject: &str, message: &str) {
        if subject.contains("fail") || subject.contains("halt") || subject.contains("low") {
            warn!("[{subject}] {message}");
        } else {
            info!("[{subject}] {message}");
        }
    }
}
