//! Per-address service fee resolution.

use std::collections::{HashMap, HashSet};

/// Resolves the service fee rate for an origin address: the standard
/// rate, unless the address is a zero-fee supporter or carries a
/// per-address override. Supporters win over overrides.
#[derive(Debug, Clone, Default)]
pub struct ServiceFeeCalculator {
    supporters: HashSet<String>,
    overrides: HashMap<String, f64>,
    standard_rate: f64,
}

impl ServiceFeeCalculator {
    /// `standard_fee_percent` and override values are percentages
    /// (e.g. 20.0 for a 20% fee).
    pub fn new(
        supporters: HashSet<String>,
        override_percents: HashMap<String, f64>,
        standard_fee_percent: f64,
    ) -> Self {
        let overrides = override_percents
            .into_iter()
            .map(|(addr, pct)| (addr, pct / 100.0))
            .collect();
        Self {
            supporters,
            overrides,
            standard_rate: standard_fee_percent / 100.0,
        }
    }

    /// Fee rate as a fraction in `[0, 1]`.
    pub fn rate_for(&self, address: &str) -> f64 {
        if self.supporters.contains(address) {
            0.0
        } else if let Some(rate) = self.overrides.get(address) {
            *rate
        } else {
            self.standard_rate
        }
    }
}
