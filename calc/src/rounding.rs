//! Deterministic rounding helpers.
//!
//! One rule per phase: the phase-1 pool shrink uses half-down (a
//! one-shot scalar), per-entry final amounts use plain floor with the
//! residual pushed into the last payable entry.

/// Round to the nearest integer, ties toward zero.
pub fn round_half_down(value: f64) -> u64 {
    let floor = value.floor();
    let fract = value - floor;
    if fract > 0.5 {
        floor as u64 + 1
    } else {
        floor as u64
    }
}

/// Floor a ratio × total product to minor units.
pub fn floor_amount(ratio: f64, total: u64) -> u64 {
    (ratio * total as f64).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_down_ties_go_down() {
        assert_eq!(round_half_down(2.5), 2);
        assert_eq!(round_half_down(2.500001), 3);
        assert_eq!(round_half_down(2.49), 2);
        assert_eq!(round_half_down(0.0), 0);
    }

    #[test]
    fn test_floor_amount() {
        assert_eq!(floor_amount(0.3333333, 1_000_000), 333_333);
        assert_eq!(floor_amount(1.0, 42), 42);
        assert_eq!(floor_amount(0.0, 42), 0);
    }
}
