//! The phase pipeline driver.

use {
    crate::{
        error::{CalcError, Result},
        fee::ServiceFeeCalculator,
        phases,
        RATIO_EPSILON,
    },
    log::{debug, info},
    payout_model::{RewardLog, RewardProviderModel, RulesModel},
    std::collections::BTreeMap,
};

/// Runs the full allocation pipeline for one cycle. Construction
/// validates the configured share maps; a calculator that constructs
/// successfully cannot mis-split a parent.
#[derive(Debug, Clone)]
pub struct PhasedCalculator {
    fee_calc: ServiceFeeCalculator,
    rules: RulesModel,
    founders_map: BTreeMap<String, f64>,
    owners_map: BTreeMap<String, f64>,
    /// Minimum delegated balance, minor units. Applied only at the
    /// phase whose exclusion set carries the sentinel key.
    min_delegation: u64,
    reactivate_zeroed: bool,
}

fn validate_share_map(name: &'static str, map: &BTreeMap<String, f64>) -> Result<()> {
    if map.is_empty() {
        return Ok(());
    }
    let sum: f64 = map.values().sum();
    if (sum - 1.0).abs() > RATIO_EPSILON {
        return Err(CalcError::BadShareMap { map: name, sum });
    }
    Ok(())
}

impl PhasedCalculator {
    pub fn new(
        fee_calc: ServiceFeeCalculator,
        rules: RulesModel,
        founders_map: BTreeMap<String, f64>,
        owners_map: BTreeMap<String, f64>,
        min_delegation: u64,
        reactivate_zeroed: bool,
    ) -> Result<Self> {
        validate_share_map("founders", &founders_map)?;
        validate_share_map("owners", &owners_map)?;
        Ok(Self {
            fee_calc,
            rules,
            founders_map,
            owners_map,
            min_delegation,
            reactivate_zeroed,
        })
    }

    fn min_delegation_for(&self, set: &std::collections::HashSet<String>) -> Option<u64> {
        RulesModel::min_delegation_active(set).then_some(self.min_delegation)
    }

    fn check_closure(entries: &[RewardLog], phase: u8) -> Result<()> {
        let mut sum = 0.0;
        let mut live = 0usize;
        for entry in entries.iter().filter(|e| !e.skipped) {
            sum += entry.ratio;
            live += 1;
        }
        // An emptied-out pool carries no ratio mass at all.
        if live == 0 {
            return Ok(());
        }
        if (sum - 1.0).abs() > RATIO_EPSILON {
            return Err(CalcError::RatioClosure { phase, sum });
        }
        Ok(())
    }

    /// Run all phases for `cycle`. Returns the final entries plus the
    /// (possibly phase-1-shrunken) pool total they distribute.
    pub fn calculate(&self, provider: &RewardProviderModel, cycle: u64) -> Result<(Vec<RewardLog>, u64)> {
        let (entries, total) = phases::apportion(provider)?;
        Self::check_closure(&entries, 0)?;
        debug!("phase 0: {} entries, pool {} units", entries.len(), total);

        let (entries, total) = phases::exclude_at_balance(
            entries,
            total,
            &self.rules.exclusion_set_balance,
            self.min_delegation_for(&self.rules.exclusion_set_balance),
        );
        Self::check_closure(&entries, phases::PHASE_BALANCE_EXCLUSION)?;

        let entries = phases::exclude_at_ratio(
            entries,
            &self.rules.exclusion_set_ratio,
            self.min_delegation_for(&self.rules.exclusion_set_ratio),
        );
        Self::check_closure(&entries, phases::PHASE_RATIO_EXCLUSION)?;

        let entries = phases::apply_service_fees(
            entries,
            &self.fee_calc,
            &self.rules.exclusion_set_fee,
            self.min_delegation_for(&self.rules.exclusion_set_fee),
        );
        Self::check_closure(&entries, phases::PHASE_FEES)?;

        let entries = phases::split_parents(entries, &self.founders_map, &self.owners_map);
        Self::check_closure(&entries, 4)?;

        let entries = phases::remap_destinations(entries, &self.rules.redirects);
        let entries = phases::merge_by_destination(entries);
        Self::check_closure(&entries, 6)?;

        let entries = phases::finalize_amounts(entries, total)?;
        let mut entries = phases::gate_zero_balance(entries, self.reactivate_zeroed);

        for entry in entries.iter_mut() {
            entry.cycle = cycle;
            for parent in entry.parents.iter_mut() {
                parent.cycle = cycle;
            }
        }

        let payable = entries.iter().filter(|e| e.payable).count();
        info!(
            "cycle {cycle}: {} entries, {payable} payable, pool {total} units",
            entries.len()
        );
        Ok((entries, total))
    }
}
