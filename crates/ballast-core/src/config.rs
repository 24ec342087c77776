//! genesis configuration
//!
//! fixed-point values are raw integers written as strings, so a 1.5 ray
//! liquidation ratio is `"1500000000000000000000000000"`. addresses are 0x
//! hex. see `Protocol::from_config` for how the pieces are wired up.

use std::fs;
use std::path::Path;

use ballast_math::{Rad, Ray};
use serde::{Deserialize, Serialize};

use crate::collateral_pool::CollateralPoolParams;
use crate::error::{Error, Result};
use crate::types::{Address, CollateralPoolId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub owner: Address,
    pub total_debt_ceiling: Rad,
    #[serde(default = "Ray::one")]
    pub stablecoin_reference_price: Ray,
    /// seconds between shutdown and debt finalization
    #[serde(default)]
    pub cage_cool_down: u64,
    #[serde(default)]
    pub surplus_buffer: Rad,
    #[serde(default)]
    pub global_stability_fee_rate: Ray,
    #[serde(default, rename = "pool")]
    pub pools: Vec<CollateralPoolSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPoolSpec {
    pub id: CollateralPoolId,
    pub debt_ceiling: Rad,
    #[serde(default)]
    pub debt_floor: Rad,
    pub position_debt_ceiling: Rad,
    pub price_feed: Address,
    pub liquidation_ratio: Ray,
    #[serde(default = "Ray::one")]
    pub stability_fee_rate: Ray,
    pub close_factor_bps: u32,
    pub liquidator_incentive_bps: u32,
    #[serde(default)]
    pub treasury_fees_bps: u32,
    /// attach the built-in fixed spread strategy
    #[serde(default = "default_true")]
    pub fixed_spread_strategy: bool,
}

fn default_true() -> bool {
    true
}

impl CollateralPoolSpec {
    /// pool parameters, with the strategy address resolved by the caller
    pub fn params(&self, strategy: Option<Address>) -> CollateralPoolParams {
        CollateralPoolParams {
            debt_ceiling: self.debt_ceiling,
            debt_floor: self.debt_floor,
            position_debt_ceiling: self.position_debt_ceiling,
            price_feed: self.price_feed,
            liquidation_ratio: self.liquidation_ratio,
            stability_fee_rate: self.stability_fee_rate,
            close_factor_bps: self.close_factor_bps,
            liquidator_incentive_bps: self.liquidator_incentive_bps,
            treasury_fees_bps: self.treasury_fees_bps,
            strategy: if self.fixed_spread_strategy { strategy } else { None },
        }
    }
}

impl ProtocolConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.owner.is_zero() {
            return Err(Error::Config("owner is the zero address".into()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for pool in &self.pools {
            if !seen.insert(pool.id) {
                return Err(Error::Config(format!("pool {} listed twice", pool.id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: &str = r#"
owner = "0x0101010101010101010101010101010101010101010101010101010101010101"
total_debt_ceiling = "1000000000000000000000000000000000000000000000000000"
cage_cool_down = 3600

[[pool]]
id = "WXDC"
debt_ceiling = "1000000000000000000000000000000000000000000000000000"
position_debt_ceiling = "1000000000000000000000000000000000000000000000000000"
price_feed = "0x0202020202020202020202020202020202020202020202020202020202020202"
liquidation_ratio = "1500000000000000000000000000"
close_factor_bps = 5000
liquidator_incentive_bps = 10500
treasury_fees_bps = 8000
"#;

    #[test]
    fn test_parse_genesis() {
        let config = ProtocolConfig::from_toml_str(GENESIS).unwrap();
        assert_eq!(config.owner, Address::from_bytes([1u8; 32]));
        assert_eq!(config.cage_cool_down, 3600);
        assert_eq!(config.stablecoin_reference_price, Ray::one());
        assert_eq!(config.pools.len(), 1);

        let pool = &config.pools[0];
        assert_eq!(pool.id, CollateralPoolId::from_name("WXDC"));
        assert_eq!(pool.liquidation_ratio, Ray::from_raw(Ray::one().raw() * 3 / 2));
        assert_eq!(pool.stability_fee_rate, Ray::one());
        assert!(pool.debt_floor.is_zero());
        assert!(pool.fixed_spread_strategy);
    }

    #[test]
    fn test_duplicate_pool_rejected() {
        let doubled = format!("{GENESIS}{}", &GENESIS[GENESIS.find("[[pool]]").unwrap()..]);
        let result = ProtocolConfig::from_toml_str(&doubled);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_address_rejected() {
        let broken = GENESIS.replace("0x0202", "0xzz02");
        assert!(matches!(ProtocolConfig::from_toml_str(&broken), Err(Error::Config(_))));
    }
}
