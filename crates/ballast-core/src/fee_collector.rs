//! stability fee accrual
//!
//! interest is never written per position. a pool carries one
//! `debt_accumulated_rate` and every position's debt is `share * rate`, so
//! advancing the rate charges every borrower of the pool at once. the
//! accrued value is minted to the system debt engine as surplus.

use ballast_math::{Rad, Ray};
use tracing::info;

use crate::access::{AccessControl, Role};
use crate::collateral_pool::CollateralPoolConfig;
use crate::error::{Error, Result};
use crate::ledger::BookKeeper;
use crate::types::{Address, CollateralPoolId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilityFeeCollector {
    address: Address,
    /// added to every pool's per-second factor
    global_stability_fee_rate: Ray,
    system_debt_engine: Address,
}

/// result of one [`StabilityFeeCollector::collect`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    pub debt_accumulated_rate: Ray,
    pub accrued: Rad,
}

impl StabilityFeeCollector {
    pub fn new(address: Address, system_debt_engine: Address) -> Self {
        Self {
            address,
            global_stability_fee_rate: Ray::ZERO,
            system_debt_engine,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn global_stability_fee_rate(&self) -> Ray {
        self.global_stability_fee_rate
    }

    pub fn system_debt_engine(&self) -> Address {
        self.system_debt_engine
    }

    pub fn set_global_stability_fee_rate(&mut self, access: &AccessControl, caller: Address, rate: Ray) -> Result<()> {
        access.require_any(&[Role::Owner, Role::Gov], caller)?;
        self.global_stability_fee_rate = rate;
        Ok(())
    }

    pub fn set_system_debt_engine(&mut self, access: &AccessControl, caller: Address, engine: Address) -> Result<()> {
        access.require_role(Role::Owner, caller)?;
        if engine.is_zero() {
            return Err(Error::ZeroAddress);
        }
        self.system_debt_engine = engine;
        Ok(())
    }

    /// rate the pool would have at `now`, without touching state
    pub fn projected_rate(&self, pools: &CollateralPoolConfig, pool_id: CollateralPoolId, now: Timestamp) -> Result<Ray> {
        let pool = pools.get(pool_id)?;
        let elapsed = now.saturating_sub(pool.last_accumulation_time);
        let factor = self.global_stability_fee_rate.checked_add(pool.stability_fee_rate)?;
        Ok(factor.rpow(elapsed)?.rmul(pool.debt_accumulated_rate)?)
    }

    /// advance a pool's rate to `now`
    ///
    /// `rate' = factor^(now - last) * rate`. a second call at the same
    /// instant changes nothing.
    pub fn collect(
        &self,
        access: &AccessControl,
        ledger: &mut BookKeeper,
        pools: &mut CollateralPoolConfig,
        pool_id: CollateralPoolId,
        now: Timestamp,
    ) -> Result<Collection> {
        let pool = pools.get(pool_id)?;
        let previous = pool.debt_accumulated_rate;
        if now <= pool.last_accumulation_time {
            return Ok(Collection {
                debt_accumulated_rate: previous,
                accrued: Rad::ZERO,
            });
        }

        let rate = self.projected_rate(pools, pool_id, now)?;
        // rounding may not take the rate below where it was
        let rate_delta = rate.saturating_sub(previous);

        let authority = access.authorize(self.address, &[Role::StabilityFeeCollector])?;
        let accrued = ledger.accrue_stability_fee(&authority, pools, pool_id, self.system_debt_engine, rate_delta)?;
        pools.set_last_accumulation_time(pool_id, now)?;
        let debt_accumulated_rate = pools.get(pool_id)?.debt_accumulated_rate;

        info!(pool = %pool_id, rate = %debt_accumulated_rate, %accrued, "stability fee collected");
        Ok(Collection {
            debt_accumulated_rate,
            accrued,
        })
    }
}
