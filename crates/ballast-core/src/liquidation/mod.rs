//! liquidation engine
//!
//! the engine decides whether a position may be liquidated and hands the
//! arithmetic to the strategy configured on the pool:
//!
//! ```text
//!   liquidate(request)
//!     ├─ whitelist, live, paused, non-zero request
//!     ├─ pool strategy registered
//!     ├─ position unsafe, price healthy
//!     ├─ strategy.execute            seize, pay, fee
//!     ├─ debt went down, engine got paid
//!     └─ collateral gone, debt left  -> remainder booked as bad debt
//! ```
//!
//! everything after the entry checks runs inside [`with_rollback`], so a
//! failing strategy or post-check leaves no trace.

pub mod fixed_spread;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use ballast_math::{Rad, Wad, U256};
use tracing::{info, warn};

use crate::access::{AccessControl, Authority, Role};
use crate::collateral_pool::CollateralPoolConfig;
use crate::error::{Error, Result};
use crate::ledger::{with_rollback, BookKeeper};
use crate::price::{PriceFeedRegistry, PriceOracle};
use crate::types::{Address, CollateralPoolId, Timestamp};

pub use fixed_spread::{calculate_liquidation, FixedSpreadLiquidationStrategy, LiquidationInfo};

/// one liquidation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationRequest {
    pub pool: CollateralPoolId,
    pub position: Address,
    /// upper bound on debt share to clear; the close factor may cut it
    pub debt_share_to_repay: Wad,
    /// slippage guard on the seized amount
    pub max_collateral_to_seize: Wad,
    pub collateral_recipient: Address,
}

impl LiquidationRequest {
    /// request without a seizure cap
    pub fn new(pool: CollateralPoolId, position: Address, debt_share_to_repay: Wad, collateral_recipient: Address) -> Self {
        Self {
            pool,
            position,
            debt_share_to_repay,
            max_collateral_to_seize: Wad::from_raw(U256::MAX),
            collateral_recipient,
        }
    }

    pub fn with_max_collateral(mut self, max: Wad) -> Self {
        self.max_collateral_to_seize = max;
        self
    }
}

/// what one successful liquidation did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiquidationOutcome {
    pub debt_share_liquidated: Wad,
    pub debt_value_repaid: Rad,
    pub collateral_seized: Wad,
    pub treasury_fee: Wad,
    /// debt left on a position with no collateral, written off
    pub bad_debt: Rad,
}

/// collaborators a strategy may touch
pub struct LiquidationContext<'a> {
    pub access: &'a AccessControl,
    pub ledger: &'a mut BookKeeper,
    pub pools: &'a mut CollateralPoolConfig,
    pub feeds: &'a PriceFeedRegistry,
    pub oracle: &'a PriceOracle,
    pub system_debt_engine: Address,
    pub now: Timestamp,
}

/// execution arithmetic of a liquidation
pub trait LiquidationStrategy: Send + Sync + fmt::Debug {
    /// ledger identity of the strategy; liquidators whitelist it
    fn address(&self) -> Address;

    fn execute(
        &self,
        ctx: &mut LiquidationContext<'_>,
        liquidator: Address,
        request: &LiquidationRequest,
    ) -> Result<LiquidationOutcome>;
}

#[derive(Debug, Clone)]
pub struct LiquidationEngine {
    address: Address,
    live: bool,
    paused: bool,
    system_debt_engine: Address,
    liquidator_whitelist: BTreeSet<Address>,
    strategies: BTreeMap<Address, Arc<dyn LiquidationStrategy>>,
}

impl LiquidationEngine {
    pub fn new(address: Address, system_debt_engine: Address) -> Self {
        Self {
            address,
            live: true,
            paused: false,
            system_debt_engine,
            liquidator_whitelist: BTreeSet::new(),
            strategies: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn system_debt_engine(&self) -> Address {
        self.system_debt_engine
    }

    pub fn is_whitelisted(&self, liquidator: Address) -> bool {
        self.liquidator_whitelist.contains(&liquidator)
    }

    pub fn whitelist_liquidator(&mut self, access: &AccessControl, caller: Address, liquidator: Address) -> Result<()> {
        access.require_any(&[Role::Owner, Role::Gov], caller)?;
        if liquidator.is_zero() {
            return Err(Error::ZeroAddress);
        }
        self.liquidator_whitelist.insert(liquidator);
        Ok(())
    }

    pub fn blacklist_liquidator(&mut self, access: &AccessControl, caller: Address, liquidator: Address) -> Result<()> {
        access.require_any(&[Role::Owner, Role::Gov], caller)?;
        self.liquidator_whitelist.remove(&liquidator);
        Ok(())
    }

    /// register a strategy pools can point at by address
    pub fn register_strategy(
        &mut self,
        access: &AccessControl,
        caller: Address,
        strategy: Arc<dyn LiquidationStrategy>,
    ) -> Result<()> {
        access.require_role(Role::Owner, caller)?;
        let address = strategy.address();
        if address.is_zero() {
            return Err(Error::ZeroAddress);
        }
        self.strategies.insert(address, strategy);
        Ok(())
    }

    pub fn strategy(&self, address: Address) -> Result<&Arc<dyn LiquidationStrategy>> {
        self.strategies.get(&address).ok_or(Error::UnknownStrategy)
    }

    /// owner or gov
    pub fn pause(&mut self, access: &AccessControl, caller: Address) -> Result<()> {
        access.require_any(&[Role::Owner, Role::Gov], caller)?;
        self.paused = true;
        Ok(())
    }

    pub fn unpause(&mut self, access: &AccessControl, caller: Address) -> Result<()> {
        access.require_any(&[Role::Owner, Role::Gov], caller)?;
        self.paused = false;
        Ok(())
    }

    /// owner or show stopper
    pub fn cage(&mut self, authority: &Authority) -> Result<()> {
        authority.require(&[Role::Owner, Role::ShowStopper])?;
        self.live = false;
        Ok(())
    }

    pub fn uncage(&mut self, authority: &Authority) -> Result<()> {
        authority.require(&[Role::Owner, Role::ShowStopper])?;
        self.live = true;
        Ok(())
    }

    /// liquidate one position, all or nothing
    #[allow(clippy::too_many_arguments)]
    pub fn liquidate(
        &self,
        access: &AccessControl,
        ledger: &mut BookKeeper,
        pools: &mut CollateralPoolConfig,
        feeds: &PriceFeedRegistry,
        oracle: &PriceOracle,
        caller: Address,
        request: &LiquidationRequest,
        now: Timestamp,
    ) -> Result<LiquidationOutcome> {
        if !self.is_whitelisted(caller) {
            return Err(Error::NotWhitelisted);
        }
        if !self.live {
            return Err(Error::NotLive);
        }
        if self.paused {
            return Err(Error::Paused);
        }
        if request.debt_share_to_repay.is_zero() {
            return Err(Error::ZeroDebtValue);
        }

        let pool = pools.get(request.pool)?;
        let strategy = self.strategy(pool.strategy.ok_or(Error::NotSetStrategy)?)?.clone();
        let rate = pool.debt_accumulated_rate;

        let before = ledger.position(request.pool, request.position);
        let debt_value = before.debt_share.mul_ray(rate)?;
        if before.locked_collateral.mul_ray(pool.price_with_safety_margin)? >= debt_value {
            return Err(Error::PositionSafe);
        }
        feeds.require_healthy(pools, request.pool, now)?;

        let engine_address = self.address;
        let system_debt_engine = self.system_debt_engine;
        let outcome = with_rollback(ledger, pools, |ledger, pools| {
            let paid_before = ledger.stablecoin(system_debt_engine);
            let mut ctx = LiquidationContext {
                access,
                ledger: &mut *ledger,
                pools: &mut *pools,
                feeds,
                oracle,
                system_debt_engine,
                now,
            };
            let mut outcome = strategy.execute(&mut ctx, caller, request)?;

            let after = ledger.position(request.pool, request.position);
            if after.debt_share >= before.debt_share {
                return Err(Error::DebtNotLiquidated);
            }
            let removed = before.debt_share.checked_sub(after.debt_share)?.mul_ray(rate)?;
            let paid = ledger.stablecoin(system_debt_engine).saturating_sub(paid_before);
            if paid < removed {
                return Err(Error::PaymentNotReceived);
            }

            if after.locked_collateral.is_zero() && !after.debt_share.is_zero() {
                let authority = access.authorize(engine_address, &[Role::LiquidationEngine])?;
                ledger.confiscate_position(
                    &authority,
                    pools,
                    request.pool,
                    request.position,
                    system_debt_engine,
                    system_debt_engine,
                    0,
                    after.debt_share.to_neg_delta()?,
                )?;
                outcome.bad_debt = after.debt_share.mul_ray(rate)?;
                warn!(pool = %request.pool, position = %request.position, bad_debt = %outcome.bad_debt, "position closed with bad debt");
            }
            Ok(outcome)
        })?;

        info!(
            pool = %request.pool,
            position = %request.position,
            liquidator = %caller,
            debt_share = %outcome.debt_share_liquidated,
            collateral = %outcome.collateral_seized,
            "position liquidated"
        );
        Ok(outcome)
    }

    /// run each request on its own; one failure does not stop the rest
    #[allow(clippy::too_many_arguments)]
    pub fn batch_liquidate(
        &self,
        access: &AccessControl,
        ledger: &mut BookKeeper,
        pools: &mut CollateralPoolConfig,
        feeds: &PriceFeedRegistry,
        oracle: &PriceOracle,
        caller: Address,
        requests: &[LiquidationRequest],
        now: Timestamp,
    ) -> Vec<Result<LiquidationOutcome>> {
        requests
            .iter()
            .map(|request| {
                let result = self.liquidate(access, ledger, pools, feeds, oracle, caller, request, now);
                if let Err(e) = &result {
                    warn!(pool = %request.pool, position = %request.position, error = %e, "liquidation in batch failed");
                }
                result
            })
            .collect()
    }
}
