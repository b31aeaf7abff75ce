//! Static per-cycle payout policy: phase exclusion sets and the
//! payment redirect map. Pure data, built once from configuration.

use std::collections::{HashMap, HashSet};

/// Sentinel entry: its presence in an exclusion set activates the
/// minimum-delegation rule at that set's phase.
pub const MIN_DELEGATION_KEY: &str = "mindelegation";

/// Per-cycle policy. Addresses in `exclusion_set_balance` are skipped
/// at phase 1 (pool shrinks), `exclusion_set_ratio` at phase 2 (ratio
/// mass redistributed), `exclusion_set_fee` at phase 3 (ratio donated
/// to the founders parent). `redirects` is applied by the mapping
/// phase.
#[derive(Debug, Clone, Default)]
pub struct RulesModel {
    pub exclusion_set_balance: HashSet<String>,
    pub exclusion_set_ratio: HashSet<String>,
    pub exclusion_set_fee: HashSet<String>,
    pub redirects: HashMap<String, String>,
}

impl RulesModel {
    pub fn new(
        exclusion_set_balance: HashSet<String>,
        exclusion_set_ratio: HashSet<String>,
        exclusion_set_fee: HashSet<String>,
        redirects: HashMap<String, String>,
    ) -> Self {
        Self {
            exclusion_set_balance,
            exclusion_set_ratio,
            exclusion_set_fee,
            redirects,
        }
    }

    /// Whether the given exclusion set activates the minimum-delegation
    /// rule.
    pub fn min_delegation_active(set: &HashSet<String>) -> bool {
        set.contains(MIN_DELEGATION_KEY)
    }
}
