//! per collateral type parameters
//!
//! one [`CollateralPool`] per collateral type. governance sets the risk
//! parameters, the fee collector advances the rate, the price oracle writes
//! the safety-margined price and the ledger keeps `total_debt_share` in step
//! with the positions.

use std::collections::BTreeMap;

use ballast_math::{Rad, Ray, Wad, BPS_DENOMINATOR, U256};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::access::{AccessControl, Authority, Role};
use crate::error::{Error, Result};
use crate::types::{Address, CollateralPoolId, Timestamp};

/// highest accepted per-second stability fee (about 50% a year)
pub const MAX_STABILITY_FEE_RATE: U256 = U256([5_926_315_489_994_005_515, 54_210_109, 0, 0]);

/// liquidator incentive bounds, in basis points
pub const MIN_LIQUIDATOR_INCENTIVE_BPS: u32 = 10_000;
pub const MAX_LIQUIDATOR_INCENTIVE_BPS: u32 = 19_000;

/// treasury share of the liquidator incentive, in basis points
pub const MAX_TREASURY_FEES_BPS: u32 = 9_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPool {
    /// sum of the debt shares of every position in the pool
    pub total_debt_share: Wad,
    /// accumulated stability fee; never decreases. zero means uninitialized
    pub debt_accumulated_rate: Ray,
    pub price_with_safety_margin: Ray,
    pub debt_ceiling: Rad,
    pub debt_floor: Rad,
    pub position_debt_ceiling: Rad,
    pub price_feed: Address,
    pub liquidation_ratio: Ray,
    /// per-second compounding factor, at least one ray
    pub stability_fee_rate: Ray,
    pub last_accumulation_time: Timestamp,
    pub adapter: Address,
    pub close_factor_bps: u32,
    pub liquidator_incentive_bps: u32,
    pub treasury_fees_bps: u32,
    pub strategy: Option<Address>,
}

impl CollateralPool {
    pub fn is_initialized(&self) -> bool {
        !self.debt_accumulated_rate.is_zero()
    }

    /// debt value of the whole pool
    pub fn total_debt_value(&self) -> Result<Rad> {
        Ok(self.total_debt_share.mul_ray(self.debt_accumulated_rate)?)
    }
}

/// parameters for [`CollateralPoolConfig::init_collateral_pool`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPoolParams {
    pub debt_ceiling: Rad,
    pub debt_floor: Rad,
    pub position_debt_ceiling: Rad,
    pub price_feed: Address,
    pub liquidation_ratio: Ray,
    pub stability_fee_rate: Ray,
    pub close_factor_bps: u32,
    pub liquidator_incentive_bps: u32,
    pub treasury_fees_bps: u32,
    pub strategy: Option<Address>,
}

/// governance-settable pool parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolParameter {
    DebtCeiling(Rad),
    DebtFloor(Rad),
    PositionDebtCeiling(Rad),
    PriceFeed(Address),
    LiquidationRatio(Ray),
    StabilityFeeRate(Ray),
    Adapter(Address),
    CloseFactorBps(u32),
    LiquidatorIncentiveBps(u32),
    TreasuryFeesBps(u32),
    Strategy(Option<Address>),
}

impl PoolParameter {
    pub fn name(&self) -> &'static str {
        match self {
            PoolParameter::DebtCeiling(_) => "debt_ceiling",
            PoolParameter::DebtFloor(_) => "debt_floor",
            PoolParameter::PositionDebtCeiling(_) => "position_debt_ceiling",
            PoolParameter::PriceFeed(_) => "price_feed",
            PoolParameter::LiquidationRatio(_) => "liquidation_ratio",
            PoolParameter::StabilityFeeRate(_) => "stability_fee_rate",
            PoolParameter::Adapter(_) => "adapter",
            PoolParameter::CloseFactorBps(_) => "close_factor_bps",
            PoolParameter::LiquidatorIncentiveBps(_) => "liquidator_incentive_bps",
            PoolParameter::TreasuryFeesBps(_) => "treasury_fees_bps",
            PoolParameter::Strategy(_) => "strategy",
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            PoolParameter::PriceFeed(addr) | PoolParameter::Adapter(addr) if addr.is_zero() => {
                Err(Error::ZeroAddress)
            }
            PoolParameter::Strategy(Some(addr)) if addr.is_zero() => Err(Error::ZeroAddress),
            PoolParameter::LiquidationRatio(ratio) if *ratio < Ray::one() => {
                Err(Error::InvalidParameter("liquidation ratio below one ray"))
            }
            PoolParameter::StabilityFeeRate(rate) => validate_stability_fee_rate(*rate),
            PoolParameter::CloseFactorBps(bps) => validate_close_factor(*bps),
            PoolParameter::LiquidatorIncentiveBps(bps) => validate_liquidator_incentive(*bps),
            PoolParameter::TreasuryFeesBps(bps) => validate_treasury_fees(*bps),
            _ => Ok(()),
        }
    }
}

fn validate_stability_fee_rate(rate: Ray) -> Result<()> {
    if rate < Ray::one() {
        return Err(Error::InvalidParameter("stability fee rate below one ray"));
    }
    if rate.raw() > MAX_STABILITY_FEE_RATE {
        return Err(Error::InvalidParameter("stability fee rate too high"));
    }
    Ok(())
}

fn validate_close_factor(bps: u32) -> Result<()> {
    if bps == 0 || bps > BPS_DENOMINATOR {
        return Err(Error::InvalidParameter("close factor out of range"));
    }
    Ok(())
}

fn validate_liquidator_incentive(bps: u32) -> Result<()> {
    if !(MIN_LIQUIDATOR_INCENTIVE_BPS..=MAX_LIQUIDATOR_INCENTIVE_BPS).contains(&bps) {
        return Err(Error::InvalidParameter("liquidator incentive out of range"));
    }
    Ok(())
}

fn validate_treasury_fees(bps: u32) -> Result<()> {
    if bps > MAX_TREASURY_FEES_BPS {
        return Err(Error::InvalidParameter("treasury fees out of range"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollateralPoolConfig {
    pools: BTreeMap<CollateralPoolId, CollateralPool>,
}

impl CollateralPoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// create a pool with rate one ray, accruing from `now`
    pub fn init_collateral_pool(
        &mut self,
        access: &AccessControl,
        caller: Address,
        pool_id: CollateralPoolId,
        adapter: Address,
        params: CollateralPoolParams,
        now: Timestamp,
    ) -> Result<()> {
        access.require_role(Role::Owner, caller)?;
        if self.pools.get(&pool_id).is_some_and(CollateralPool::is_initialized) {
            return Err(Error::CollateralPoolAlreadyInit(pool_id));
        }
        if params.price_feed.is_zero() || adapter.is_zero() {
            return Err(Error::ZeroAddress);
        }
        if params.liquidation_ratio < Ray::one() {
            return Err(Error::InvalidParameter("liquidation ratio below one ray"));
        }
        validate_stability_fee_rate(params.stability_fee_rate)?;
        validate_close_factor(params.close_factor_bps)?;
        validate_liquidator_incentive(params.liquidator_incentive_bps)?;
        validate_treasury_fees(params.treasury_fees_bps)?;

        let pool = CollateralPool {
            total_debt_share: Wad::ZERO,
            debt_accumulated_rate: Ray::one(),
            price_with_safety_margin: Ray::ZERO,
            debt_ceiling: params.debt_ceiling,
            debt_floor: params.debt_floor,
            position_debt_ceiling: params.position_debt_ceiling,
            price_feed: params.price_feed,
            liquidation_ratio: params.liquidation_ratio,
            stability_fee_rate: params.stability_fee_rate,
            last_accumulation_time: now,
            adapter,
            close_factor_bps: params.close_factor_bps,
            liquidator_incentive_bps: params.liquidator_incentive_bps,
            treasury_fees_bps: params.treasury_fees_bps,
            strategy: params.strategy,
        };
        self.pools.insert(pool_id, pool);

        info!(pool = %pool_id, "collateral pool initialized");
        Ok(())
    }

    /// governance setter (owner or gov)
    pub fn set_parameter(
        &mut self,
        access: &AccessControl,
        caller: Address,
        pool_id: CollateralPoolId,
        parameter: PoolParameter,
    ) -> Result<()> {
        access.require_any(&[Role::Owner, Role::Gov], caller)?;
        parameter.validate()?;
        let pool = self.get_mut(pool_id)?;

        match parameter {
            PoolParameter::DebtCeiling(v) => pool.debt_ceiling = v,
            PoolParameter::DebtFloor(v) => pool.debt_floor = v,
            PoolParameter::PositionDebtCeiling(v) => pool.position_debt_ceiling = v,
            PoolParameter::PriceFeed(v) => pool.price_feed = v,
            PoolParameter::LiquidationRatio(v) => pool.liquidation_ratio = v,
            PoolParameter::StabilityFeeRate(v) => pool.stability_fee_rate = v,
            PoolParameter::Adapter(v) => pool.adapter = v,
            PoolParameter::CloseFactorBps(v) => pool.close_factor_bps = v,
            PoolParameter::LiquidatorIncentiveBps(v) => pool.liquidator_incentive_bps = v,
            PoolParameter::TreasuryFeesBps(v) => pool.treasury_fees_bps = v,
            PoolParameter::Strategy(v) => pool.strategy = v,
        }
        Ok(())
    }

    /// written by the price oracle
    pub fn set_price_with_safety_margin(
        &mut self,
        authority: &Authority,
        pool_id: CollateralPoolId,
        price: Ray,
    ) -> Result<()> {
        authority.require(&[Role::PriceOracle])?;
        self.get_mut(pool_id)?.price_with_safety_margin = price;
        Ok(())
    }

    /// written by the fee collector
    pub(crate) fn set_last_accumulation_time(&mut self, pool_id: CollateralPoolId, now: Timestamp) -> Result<()> {
        self.get_mut(pool_id)?.last_accumulation_time = now;
        Ok(())
    }

    pub fn get(&self, pool_id: CollateralPoolId) -> Result<&CollateralPool> {
        self.pools
            .get(&pool_id)
            .filter(|pool| pool.is_initialized())
            .ok_or(Error::CollateralPoolNotInit(pool_id))
    }

    pub(crate) fn get_mut(&mut self, pool_id: CollateralPoolId) -> Result<&mut CollateralPool> {
        self.pools
            .get_mut(&pool_id)
            .filter(|pool| pool.is_initialized())
            .ok_or(Error::CollateralPoolNotInit(pool_id))
    }

    pub fn is_initialized(&self, pool_id: CollateralPoolId) -> bool {
        self.get(pool_id).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CollateralPoolId, &CollateralPool)> {
        self.pools.iter()
    }

    pub fn pool_ids(&self) -> impl Iterator<Item = CollateralPoolId> + '_ {
        self.pools.keys().copied()
    }
}
