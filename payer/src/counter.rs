//! Operation counter with commit/rollback.
//!
//! The node rejects an operation whose counter it has already seen, so
//! a failed attempt must rewind to the last committed value while a
//! successful one advances the baseline. The counter is cleared after
//! every attempt to force a re-read from the node on the next one.

use crate::error::{PayError, Result};

#[derive(Debug, Default)]
pub struct OpCounter {
    counter: Option<u64>,
    backup: Option<u64>,
}

impl OpCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed (or clear, with `None`) both the counter and its backup.
    pub fn set(&mut self, counter: Option<u64>) {
        self.counter = counter;
        self.backup = counter;
    }

    pub fn get(&self) -> Option<u64> {
        self.counter
    }

    /// Advance and return the new value.
    pub fn inc(&mut self) -> Result<u64> {
        let next = self.counter.ok_or(PayError::CounterUnset)? + 1;
        self.counter = Some(next);
        Ok(next)
    }

    /// Keep the consumed counters: the attempt's operations reached the
    /// node.
    pub fn commit(&mut self) {
        self.backup = self.counter;
    }

    /// Discard the attempt's increments.
    pub fn rollback(&mut self) {
        self.counter = self.backup;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_rewinds_to_last_commit() {
        let mut counter = OpCounter::new();
        counter.set(Some(10));

        assert_eq!(counter.inc().unwrap(), 11);
        assert_eq!(counter.inc().unwrap(), 12);
        counter.rollback();
        assert_eq!(counter.get(), Some(10));

        counter.inc().unwrap();
        counter.commit();
        counter.inc().unwrap();
        counter.rollback();
        assert_eq!(counter.get(), Some(11));
    }

    #[test]
    fn test_inc_before_set_is_an_error() {
        let mut counter = OpCounter::new();
        assert!(matches!(counter.inc(), Err(PayError::CounterUnset)));
    }
}
