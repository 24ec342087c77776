//! emergency shutdown and final settlement
//!
//! ```text
//!   cage()                      freeze ledger, liquidations, oracle, adapters
//!   cage_collateral_pool(pool)  fix the collateral price of each pool
//!   accumulate_bad_debt(pos)    pull debt-backing collateral into custody
//!   redeem_locked_collateral    owners of debt-free positions take the rest
//!   finalize_debt()             after the cool down, with the surplus netted
//!   finalize_cash_price(pool)   collateral per stablecoin, per pool
//!   accumulate_stablecoin(n)    holders hand in stablecoin once
//!   redeem_stablecoin(pool, n)  and draw collateral from every pool
//! ```
//!
//! the cash price splits each pool's custody pro rata across all
//! outstanding stablecoin, so total redemptions never exceed custody.

use std::collections::BTreeMap;

use ballast_math::{ops, Rad, Ray, Wad, RAY};
use tracing::info;

use crate::access::{AccessControl, Role};
use crate::adapter::CollateralTokenAdapter;
use crate::collateral_pool::CollateralPoolConfig;
use crate::error::{Error, Result};
use crate::ledger::BookKeeper;
use crate::liquidation::LiquidationEngine;
use crate::price::{PriceFeedRegistry, PriceOracle};
use crate::system_debt_engine::SystemDebtEngine;
use crate::types::{Address, CollateralPoolId, Timestamp};

/// components frozen by [`ShowStopper::cage`]
pub struct ShutdownTargets<'a> {
    pub ledger: &'a mut BookKeeper,
    pub liquidation_engine: &'a mut LiquidationEngine,
    pub system_debt_engine: &'a mut SystemDebtEngine,
    pub oracle: &'a mut PriceOracle,
    pub adapters: Vec<&'a mut CollateralTokenAdapter>,
}

/// what [`ShowStopper::accumulate_bad_debt`] took from one position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadDebtAccumulation {
    pub collateral: Wad,
    pub debt_share: Wad,
    /// debt the collateral did not cover, in collateral units
    pub shortfall: Wad,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowStopper {
    address: Address,
    system_debt_engine: Address,
    live: bool,
    cage_time: Option<Timestamp>,
    cage_cool_down: u64,
    /// total stablecoin outstanding at finalization
    debt: Option<Rad>,
    cage_price: BTreeMap<CollateralPoolId, Ray>,
    total_debt_share: BTreeMap<CollateralPoolId, Wad>,
    bad_debt_accumulator: BTreeMap<CollateralPoolId, Wad>,
    final_cash_price: BTreeMap<CollateralPoolId, Ray>,
    stablecoin_accumulator: BTreeMap<Address, Wad>,
    redeemed_stablecoin_amount: BTreeMap<(CollateralPoolId, Address), Wad>,
}

impl ShowStopper {
    pub fn new(address: Address, system_debt_engine: Address) -> Self {
        Self {
            address,
            system_debt_engine,
            live: true,
            cage_time: None,
            cage_cool_down: 0,
            debt: None,
            cage_price: BTreeMap::new(),
            total_debt_share: BTreeMap::new(),
            bad_debt_accumulator: BTreeMap::new(),
            final_cash_price: BTreeMap::new(),
            stablecoin_accumulator: BTreeMap::new(),
            redeemed_stablecoin_amount: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn cage_time(&self) -> Option<Timestamp> {
        self.cage_time
    }

    pub fn cage_cool_down(&self) -> u64 {
        self.cage_cool_down
    }

    pub fn debt(&self) -> Option<Rad> {
        self.debt
    }

    pub fn cage_price(&self, pool: CollateralPoolId) -> Option<Ray> {
        self.cage_price.get(&pool).copied()
    }

    pub fn total_debt_share(&self, pool: CollateralPoolId) -> Option<Wad> {
        self.total_debt_share.get(&pool).copied()
    }

    pub fn bad_debt_accumulator(&self, pool: CollateralPoolId) -> Wad {
        self.bad_debt_accumulator.get(&pool).copied().unwrap_or_default()
    }

    pub fn final_cash_price(&self, pool: CollateralPoolId) -> Option<Ray> {
        self.final_cash_price.get(&pool).copied()
    }

    pub fn stablecoin_accumulator(&self, account: Address) -> Wad {
        self.stablecoin_accumulator.get(&account).copied().unwrap_or_default()
    }

    pub fn redeemed_stablecoin_amount(&self, pool: CollateralPoolId, account: Address) -> Wad {
        self.redeemed_stablecoin_amount
            .get(&(pool, account))
            .copied()
            .unwrap_or_default()
    }

    fn require_caged(&self) -> Result<()> {
        if self.live {
            Err(Error::StillLive)
        } else {
            Ok(())
        }
    }

    fn require_cage_price(&self, pool: CollateralPoolId) -> Result<Ray> {
        self.cage_price(pool).ok_or(Error::CagePriceNotSet(pool))
    }

    /// owner only, before shutdown
    pub fn set_cage_cool_down(&mut self, access: &AccessControl, caller: Address, seconds: u64) -> Result<()> {
        access.require_role(Role::Owner, caller)?;
        if !self.live {
            return Err(Error::NotLive);
        }
        self.cage_cool_down = seconds;
        Ok(())
    }

    /// shut the system down. owner only, once
    pub fn cage(
        &mut self,
        access: &AccessControl,
        caller: Address,
        targets: ShutdownTargets<'_>,
        now: Timestamp,
    ) -> Result<()> {
        access.require_role(Role::Owner, caller)?;
        if !self.live {
            return Err(Error::NotLive);
        }
        let authority = access.authorize(self.address, &[Role::ShowStopper])?;

        targets.ledger.cage(&authority)?;
        targets.liquidation_engine.cage(&authority)?;
        targets.system_debt_engine.cage(&authority, targets.ledger)?;
        targets.oracle.cage(&authority)?;
        for adapter in targets.adapters {
            adapter.cage(&authority)?;
        }

        self.live = false;
        self.cage_time = Some(now);
        info!(at = now, "system caged");
        Ok(())
    }

    /// fix the collateral per stablecoin rate of `pool` at the feed price
    ///
    /// also snapshots the pool's total debt share for the cash price.
    pub fn cage_collateral_pool(
        &mut self,
        access: &AccessControl,
        caller: Address,
        pools: &CollateralPoolConfig,
        feeds: &PriceFeedRegistry,
        oracle: &PriceOracle,
        pool_id: CollateralPoolId,
    ) -> Result<Ray> {
        access.require_role(Role::Owner, caller)?;
        self.require_caged()?;
        if self.cage_price.contains_key(&pool_id) {
            return Err(Error::CagePriceAlreadySet(pool_id));
        }
        let pool = pools.get(pool_id)?;
        let price = feeds.get(pool.price_feed)?.read_price();
        if price.is_zero() {
            return Err(Error::InvalidPrice);
        }
        let cage_price = Ray::from_raw(ops::wdiv(oracle.stablecoin_reference_price().raw(), price.raw())?);

        self.cage_price.insert(pool_id, cage_price);
        self.total_debt_share.insert(pool_id, pool.total_debt_share);
        info!(pool = %pool_id, %cage_price, total_debt_share = %pool.total_debt_share, "collateral pool caged");
        Ok(cage_price)
    }

    /// move the collateral backing a position's debt into custody
    ///
    /// the position's whole debt goes to the system debt engine as bad
    /// debt; debt the collateral cannot cover is tracked as the pool's gap.
    pub fn accumulate_bad_debt(
        &mut self,
        access: &AccessControl,
        ledger: &mut BookKeeper,
        pools: &mut CollateralPoolConfig,
        pool_id: CollateralPoolId,
        position_address: Address,
    ) -> Result<BadDebtAccumulation> {
        let cage_price = self.require_cage_price(pool_id)?;
        let rate = pools.get(pool_id)?.debt_accumulated_rate;
        let position = ledger.position(pool_id, position_address);

        let owed = position.debt_share.rmul(rate)?.rmul(cage_price)?;
        let collateral = position.locked_collateral.min(owed);
        let shortfall = owed.checked_sub(collateral)?;
        let gap = self.bad_debt_accumulator(pool_id).checked_add(shortfall)?;

        let authority = access.authorize(self.address, &[Role::ShowStopper])?;
        ledger.confiscate_position(
            &authority,
            pools,
            pool_id,
            position_address,
            self.address,
            self.system_debt_engine,
            collateral.to_neg_delta()?,
            position.debt_share.to_neg_delta()?,
        )?;
        self.bad_debt_accumulator.insert(pool_id, gap);

        info!(pool = %pool_id, position = %position_address, %collateral, %shortfall, "bad debt accumulated");
        Ok(BadDebtAccumulation {
            collateral,
            debt_share: position.debt_share,
            shortfall,
        })
    }

    /// hand the remaining collateral of a debt-free position to `receiver`
    #[allow(clippy::too_many_arguments)]
    pub fn redeem_locked_collateral(
        &self,
        access: &AccessControl,
        ledger: &mut BookKeeper,
        pools: &mut CollateralPoolConfig,
        caller: Address,
        pool_id: CollateralPoolId,
        position_address: Address,
        receiver: Address,
    ) -> Result<Wad> {
        self.require_caged()?;
        let position = ledger.position(pool_id, position_address);
        if !position.debt_share.is_zero() {
            return Err(Error::PositionDebtNotZero);
        }
        if !ledger.is_allowed(position_address, caller) {
            return Err(Error::OwnerNotAllowed);
        }
        let authority = access.authorize(self.address, &[Role::ShowStopper])?;
        ledger.confiscate_position(
            &authority,
            pools,
            pool_id,
            position_address,
            receiver,
            self.system_debt_engine,
            position.locked_collateral.to_neg_delta()?,
            0,
        )?;
        info!(pool = %pool_id, position = %position_address, %receiver, amount = %position.locked_collateral, "locked collateral redeemed");
        Ok(position.locked_collateral)
    }

    /// fix the stablecoin supply that cash prices are computed against
    pub fn finalize_debt(&mut self, ledger: &BookKeeper, now: Timestamp) -> Result<Rad> {
        self.require_caged()?;
        if self.debt.is_some() {
            return Err(Error::DebtAlreadyFinalized);
        }
        if !ledger.stablecoin(self.system_debt_engine).is_zero() {
            return Err(Error::SurplusNotZero);
        }
        let ready_at = self.cage_time.unwrap_or_default().saturating_add(self.cage_cool_down);
        if now < ready_at {
            return Err(Error::CoolDownNotElapsed);
        }
        let debt = ledger.total_stablecoin_issued();
        self.debt = Some(debt);
        info!(%debt, at = now, "debt finalized");
        Ok(debt)
    }

    /// collateral paid per unit of stablecoin for `pool`
    ///
    /// `(debt_in_collateral - gap) * RAY / (debt / RAY)`
    pub fn finalize_cash_price(&mut self, pools: &CollateralPoolConfig, pool_id: CollateralPoolId) -> Result<Ray> {
        let debt = self.debt.ok_or(Error::DebtNotFinalized)?;
        if self.final_cash_price.contains_key(&pool_id) {
            return Err(Error::CashPriceAlreadySet(pool_id));
        }
        let cage_price = self.require_cage_price(pool_id)?;
        let rate = pools.get(pool_id)?.debt_accumulated_rate;
        let total_debt_share = self.total_debt_share(pool_id).unwrap_or_default();

        let debt_in_collateral = total_debt_share.rmul(rate)?.rmul(cage_price)?;
        let backed = debt_in_collateral.checked_sub(self.bad_debt_accumulator(pool_id))?;
        let cash_price = Ray::from_raw(ops::mul_div(backed.raw(), RAY, debt.to_wad().raw())?);

        self.final_cash_price.insert(pool_id, cash_price);
        info!(pool = %pool_id, %cash_price, "final cash price set");
        Ok(cash_price)
    }

    /// lock stablecoin for redemption. the caller must have whitelisted the
    /// show stopper in the ledger
    pub fn accumulate_stablecoin(&mut self, ledger: &mut BookKeeper, caller: Address, amount: Wad) -> Result<()> {
        if self.debt.is_none() {
            return Err(Error::DebtNotFinalized);
        }
        let accumulated = self.stablecoin_accumulator(caller).checked_add(amount)?;
        ledger.move_stablecoin(self.address, caller, self.system_debt_engine, amount.to_rad()?)?;
        self.stablecoin_accumulator.insert(caller, accumulated);
        info!(account = %caller, %amount, "stablecoin accumulated");
        Ok(())
    }

    /// draw `pool` collateral for `amount` of accumulated stablecoin
    pub fn redeem_stablecoin(
        &mut self,
        ledger: &mut BookKeeper,
        caller: Address,
        pool_id: CollateralPoolId,
        amount: Wad,
    ) -> Result<Wad> {
        let cash_price = self.final_cash_price(pool_id).ok_or(Error::CashPriceNotSet(pool_id))?;
        let redeemed = self.redeemed_stablecoin_amount(pool_id, caller).checked_add(amount)?;
        if redeemed > self.stablecoin_accumulator(caller) {
            return Err(Error::InsufficientStablecoinAccumulatorBalance);
        }
        let collateral = amount.rmul(cash_price)?;
        ledger.move_collateral(self.address, pool_id, self.address, caller, collateral)?;
        self.redeemed_stablecoin_amount.insert((pool_id, caller), redeemed);
        info!(pool = %pool_id, account = %caller, %amount, %collateral, "stablecoin redeemed");
        Ok(collateral)
    }
}
