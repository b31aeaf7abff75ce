//! Process exit codes, the daemon's external contract. Wrapper scripts
//! and service managers branch on these, so the values are stable.

pub const EXIT_SUCCESS: i32 = 0;
/// Some cycle ended with failed payments that were left for retry.
pub const EXIT_PAYMENT_FAILURES: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_INSUFFICIENT_FUNDS: i32 = 3;
pub const EXIT_PROVIDER: i32 = 4;
pub const EXIT_SIGNER: i32 = 5;
pub const EXIT_DISK_FULL: i32 = 6;

/// Raw errno behind "no space left on device".
const ENOSPC: i32 = 28;

pub fn is_disk_full(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(ENOSPC)
}
