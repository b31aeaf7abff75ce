//! # Report files and idempotency state
//!
//! The CSV report files are not just logs: the done-report for a cycle
//! is the idempotency source of truth. A cycle whose done report exists
//! is never paid again, and the retry pass reconstructs failed entries
//! from the failed report. The on-disk layout is the compatibility
//! default; the marker store abstracts the same guarantee behind a
//! key-value interface.
//!
//! ```text
//! <payments_root>/done/<cycle>.csv      terminal, cycle fully settled
//! <payments_root>/failed/<cycle>.csv    retry input
//! <payments_root>/failed/<cycle>.csv.BUSY   retry in progress
//! <calculations_root>/<cycle>.csv       allocator output, audit
//! ```

pub mod calculation;
pub mod error;
pub mod markers;
pub mod paths;
pub mod payment;

pub use {
    calculation::write_calculation_report,
    error::{Result, StoreError},
    markers::{DirMarkerStore, MarkerKey, MarkerStore},
    paths::ReportPaths,
    payment::{parse_payment_report, write_payment_report},
};
