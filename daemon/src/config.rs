//! Operator configuration, loaded from a single YAML file.

use {
    payout_calc::{ServiceFeeCalculator, RATIO_EPSILON},
    payout_model::{RewardProviderModel, RulesModel},
    serde::Deserialize,
    std::{
        collections::{BTreeMap, HashMap, HashSet},
        fs,
        path::{Path, PathBuf},
        time::Duration,
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("'{address}' is not a valid {role} address")]
    BadAddress { role: &'static str, address: String },
    #[error("{map} share map sums to {sum}, expected 1")]
    BadShareMap { map: &'static str, sum: f64 },
    #[error("fee percent {0} is outside 0..=100")]
    BadFeePercent(f64),
    #[error("network parameter {0} must be positive")]
    BadNetworkParameter(&'static str),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Keep producing cycles as they become payable.
    Forever,
    /// Pay the most recent payable cycle, then exit.
    OneTime,
    /// Pay every pending cycle from the initial cycle up, then exit.
    Pending,
    /// Only re-run the failed reports on disk, then exit.
    RetryFailed,
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::Forever
    }
}

/// Which reward total the allocator distributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardsType {
    /// What the protocol actually credited, equivocation losses and
    /// denunciation income included.
    Actual,
    /// What full participation would have earned: missed rewards are
    /// added back, denunciation income is not shared out.
    Ideal,
}

impl Default for RewardsType {
    fn default() -> Self {
        RewardsType::Actual
    }
}

impl RewardsType {
    pub fn reward_amount(self, model: &RewardProviderModel) -> u64 {
        match self {
            RewardsType::Actual => model.total_reward_amount,
            RewardsType::Ideal => model
                .rewards_and_fees
                .saturating_add(model.offline_losses)
                .saturating_sub(model.denunciation_rewards),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub block_delay_secs: u64,
    pub blocks_per_cycle: u64,
    /// Cycles a reward stays frozen after the cycle it was earned in.
    pub frozen_deposit_cycles: u64,
}

fn default_true() -> bool {
    true
}

fn default_contract_fee_ceiling() -> u64 {
    payout_payer::constants::DEFAULT_CONTRACT_FEE_CEILING
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    pub baking_address: String,
    /// Implicit account the payments are signed and sent from.
    pub payment_address: String,
    pub node_url: String,
    pub signer_url: String,

    #[serde(default)]
    pub founders_map: BTreeMap<String, f64>,
    #[serde(default)]
    pub owners_map: BTreeMap<String, f64>,
    pub service_fee_percent: f64,
    #[serde(default)]
    pub supporters: HashSet<String>,
    #[serde(default)]
    pub fee_overrides: HashMap<String, f64>,

    #[serde(default)]
    pub exclusion_set_balance: HashSet<String>,
    #[serde(default)]
    pub exclusion_set_ratio: HashSet<String>,
    #[serde(default)]
    pub exclusion_set_fee: HashSet<String>,
    #[serde(default)]
    pub redirects: HashMap<String, String>,
    #[serde(default)]
    pub min_delegation: u64,

    #[serde(default = "default_true")]
    pub delegator_pays_transfer_fee: bool,
    #[serde(default)]
    pub delegator_pays_reactivation_fee: bool,
    #[serde(default = "default_true")]
    pub reactivate_zeroed: bool,
    #[serde(default)]
    pub rewards_type: RewardsType,

    pub network: NetworkConfig,
    pub payments_root: PathBuf,
    pub calculations_root: PathBuf,
    pub initial_cycle: u64,
    /// Shifts the payable bound: positive delays payouts by that many
    /// cycles, negative pays earlier (private test networks).
    #[serde(default)]
    pub release_override: i64,

    #[serde(default)]
    pub run_mode: RunMode,
    #[serde(default)]
    pub retry_injected: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_contract_fee_ceiling")]
    pub contract_fee_ceiling: u64,
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    pub fn validate(&self) -> Result<()> {
        check_address("baking", &self.baking_address, false)?;
        // The signer can only hold keys for implicit accounts.
        check_address("payment", &self.payment_address, false)?;
        for address in self.founders_map.keys() {
            check_address("founder", address, true)?;
        }
        for address in self.owners_map.keys() {
            check_address("owner", address, true)?;
        }
        for address in self.redirects.values() {
            check_address("redirect target", address, true)?;
        }

        check_share_map("founders", &self.founders_map)?;
        check_share_map("owners", &self.owners_map)?;

        check_fee_percent(self.service_fee_percent)?;
        for percent in self.fee_overrides.values() {
            check_fee_percent(*percent)?;
        }

        if self.network.blocks_per_cycle == 0 {
            return Err(ConfigError::BadNetworkParameter("blocks_per_cycle"));
        }
        if self.network.block_delay_secs == 0 {
            return Err(ConfigError::BadNetworkParameter("block_delay_secs"));
        }
        Ok(())
    }

    pub fn rules(&self) -> RulesModel {
        RulesModel::new(
            self.exclusion_set_balance.clone(),
            self.exclusion_set_ratio.clone(),
            self.exclusion_set_fee.clone(),
            self.redirects.clone(),
        )
    }

    pub fn fee_calculator(&self) -> ServiceFeeCalculator {
        ServiceFeeCalculator::new(
            self.supporters.clone(),
            self.fee_overrides.clone(),
            self.service_fee_percent,
        )
    }

    pub fn block_delay(&self) -> Duration {
        Duration::from_secs(self.network.block_delay_secs)
    }
}

fn check_address(role: &'static str, address: &str, allow_contract: bool) -> Result<()> {
    let implicit = ["tz1", "tz2", "tz3"]
        .iter()
        .any(|prefix| address.starts_with(prefix));
    let contract = allow_contract && address.starts_with("KT1");
    if address.len() == 36 && (implicit || contract) {
        Ok(())
    } else {
        Err(ConfigError::BadAddress {
            role,
            address: address.to_string(),
        })
    }
}

fn check_share_map(map: &'static str, shares: &BTreeMap<String, f64>) -> Result<()> {
    if shares.is_empty() {
        return Ok(());
    }
    let sum: f64 = shares.values().sum();
    if (sum - 1.0).abs() > RATIO_EPSILON {
        return Err(ConfigError::BadShareMap { map, sum });
    }
    Ok(())
}

fn check_fee_percent(percent: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&percent) {
        return Err(ConfigError::BadFeePercent(percent));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TZ1: &str = "tz1VxS7ff4YnZRs8b4mMP4WaMVpoQjuo1rjf";
    const TZ1B: &str = "tz1YZReV1UcJjV8SHyL4Lh5qMVveh4heHwGq";
    const KT1: &str = "KT1FHAtLjG6S6tfjmrDeEySVLeP8a16T4Ngr";

    fn minimal_yaml() -> String {
        format!(
            "baking_address: {TZ1}\n\
             payment_address: {TZ1B}\n\
             node_url: http://127.0.0.1:8732\n\
             signer_url: http://127.0.0.1:6732\n\
             service_fee_percent: 10.0\n\
             network:\n\
             \x20 block_delay_secs: 8\n\
             \x20 blocks_per_cycle: 16384\n\
             \x20 frozen_deposit_cycles: 5\n\
             payments_root: /var/payouts/payments\n\
             calculations_root: /var/payouts/calculations\n\
             initial_cycle: 700\n"
        )
    }

    #[test]
    fn test_minimal_yaml_parses_with_defaults() {
        let config: DaemonConfig = serde_yaml::from_str(&minimal_yaml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.run_mode, RunMode::Forever);
        assert_eq!(config.rewards_type, RewardsType::Actual);
        assert!(config.delegator_pays_transfer_fee);
        assert!(config.reactivate_zeroed);
        assert!(!config.dry_run);
        assert_eq!(config.block_delay(), Duration::from_secs(8));
    }

    #[test]
    fn test_run_mode_and_redirects_parse() {
        let yaml = format!(
            "{}run_mode: retry_failed\nredirects:\n\x20 {TZ1}: {KT1}\n",
            minimal_yaml()
        );
        let config: DaemonConfig = serde_yaml::from_str(&yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.run_mode, RunMode::RetryFailed);
        assert_eq!(config.rules().redirects[TZ1], KT1);
    }

    #[test]
    fn test_contract_baking_address_rejected() {
        let yaml = minimal_yaml().replace(TZ1, KT1);
        let config: DaemonConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadAddress { role: "baking", .. })
        ));
    }

    #[test]
    fn test_share_map_must_sum_to_one() {
        let yaml = format!(
            "{}founders_map:\n\x20 {TZ1}: 0.5\n\x20 {KT1}: 0.4\n",
            minimal_yaml()
        );
        let config: DaemonConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadShareMap { map: "founders", .. })
        ));
    }

    #[test]
    fn test_fee_percent_bounds() {
        let yaml = minimal_yaml().replace("service_fee_percent: 10.0", "service_fee_percent: 140");
        let config: DaemonConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadFeePercent(_))
        ));
    }

    #[test]
    fn test_ideal_rewards_add_back_offline_losses() {
        let model = RewardProviderModel {
            total_reward_amount: 900,
            rewards_and_fees: 850,
            offline_losses: 150,
            denunciation_rewards: 50,
            ..Default::default()
        };
        assert_eq!(RewardsType::Actual.reward_amount(&model), 900);
        assert_eq!(RewardsType::Ideal.reward_amount(&model), 950);
    }
}
