//! fixed spread liquidation
//!
//! the liquidator repays debt at the feed price and receives collateral
//! worth `incentive` basis points of it. part of the bonus goes to the
//! treasury (the system debt engine).
//!
//! ```text
//!   share     = min(requested, debt_share * close_factor)
//!   value     = share * rate                       (rad)
//!   seized    = value * incentive / price          (wad)
//!   bonus     = seized - seized / incentive
//!   fee       = bonus * treasury_fees
//! ```
//!
//! a remainder below the debt floor is closed in full. a seizure larger
//! than the locked collateral is cut to the collateral and the repaid share
//! shrinks with it, rounded up to whole wei; whatever debt stays behind is
//! the engine's to write off.

use ballast_math::{Rad, Ray, Wad};
use tracing::debug;

use super::{LiquidationContext, LiquidationOutcome, LiquidationRequest, LiquidationStrategy};
use crate::access::Role;
use crate::collateral_pool::CollateralPool;
use crate::error::{Error, Result};
use crate::ledger::Position;
use crate::types::Address;

/// result of [`calculate_liquidation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationInfo {
    pub position_debt_value: Rad,
    /// close factor cap on the share cleared in one call
    pub max_debt_share: Wad,
    pub debt_share_to_liquidate: Wad,
    pub debt_value_to_repay: Rad,
    pub collateral_to_seize: Wad,
    pub treasury_fee: Wad,
}

/// liquidation arithmetic, truncating at every division
///
/// `collateral_price` is the feed price in ray, not the safety-margined one.
pub fn calculate_liquidation(
    pool: &CollateralPool,
    position: Position,
    requested_debt_share: Wad,
    collateral_price: Ray,
) -> Result<LiquidationInfo> {
    if collateral_price.is_zero() {
        return Err(Error::InvalidPrice);
    }
    let rate = pool.debt_accumulated_rate;
    let incentive = pool.liquidator_incentive_bps;

    let position_debt_value = position.debt_share.mul_ray(rate)?;
    let max_debt_share = position.debt_share.mul_bps(pool.close_factor_bps)?;
    let mut debt_share = requested_debt_share.min(max_debt_share);
    let mut debt_value = debt_share.mul_ray(rate)?;

    let remaining = position_debt_value.saturating_sub(debt_value);
    if !remaining.is_zero() && remaining < pool.debt_floor {
        debt_share = position.debt_share;
        debt_value = position_debt_value;
    }

    let mut collateral = debt_value.mul_bps(incentive)?.div_ray(collateral_price)?;
    if collateral > position.locked_collateral {
        // share rounds up so a few wei of collateral still clear some debt
        collateral = position.locked_collateral;
        let covered = collateral.mul_ray(collateral_price)?.div_bps(incentive)?;
        debt_share = covered.div_ray_up(rate)?.min(position.debt_share);
        debt_value = debt_share.mul_ray(rate)?;
    }

    let bonus = collateral.checked_sub(collateral.div_bps(incentive)?)?;
    let treasury_fee = bonus.mul_bps(pool.treasury_fees_bps)?;

    Ok(LiquidationInfo {
        position_debt_value,
        max_debt_share,
        debt_share_to_liquidate: debt_share,
        debt_value_to_repay: debt_value,
        collateral_to_seize: collateral,
        treasury_fee,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSpreadLiquidationStrategy {
    address: Address,
}

impl FixedSpreadLiquidationStrategy {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl LiquidationStrategy for FixedSpreadLiquidationStrategy {
    fn address(&self) -> Address {
        self.address
    }

    fn execute(
        &self,
        ctx: &mut LiquidationContext<'_>,
        liquidator: Address,
        request: &LiquidationRequest,
    ) -> Result<LiquidationOutcome> {
        let pool = ctx.pools.get(request.pool)?.clone();
        let position = ctx.ledger.position(request.pool, request.position);

        let (price, ok) = ctx.feeds.get(pool.price_feed)?.peek_price(ctx.now);
        if !ok {
            return Err(Error::PriceNotHealthy);
        }
        let collateral_price = ctx.oracle.collateral_price(price)?;
        let info = calculate_liquidation(&pool, position, request.debt_share_to_repay, collateral_price)?;

        if info.collateral_to_seize.is_zero() {
            return Err(Error::ZeroCollateralAmount);
        }
        if info.collateral_to_seize > request.max_collateral_to_seize {
            return Err(Error::ExceedsMaxCollateralToSeize);
        }
        if !ctx.ledger.is_allowed(liquidator, self.address) {
            return Err(Error::OwnerNotAllowed);
        }
        if ctx.ledger.stablecoin(liquidator) < info.debt_value_to_repay {
            return Err(Error::InsufficientStablecoin);
        }

        let authority = ctx.access.authorize(self.address, &[Role::LiquidationEngine])?;
        ctx.ledger.confiscate_position(
            &authority,
            ctx.pools,
            request.pool,
            request.position,
            self.address,
            ctx.system_debt_engine,
            info.collateral_to_seize.to_neg_delta()?,
            info.debt_share_to_liquidate.to_neg_delta()?,
        )?;

        let to_recipient = info.collateral_to_seize.checked_sub(info.treasury_fee)?;
        ctx.ledger
            .move_collateral(self.address, request.pool, self.address, request.collateral_recipient, to_recipient)?;
        if !info.treasury_fee.is_zero() {
            ctx.ledger.move_collateral(
                self.address,
                request.pool,
                self.address,
                ctx.system_debt_engine,
                info.treasury_fee,
            )?;
        }
        ctx.ledger
            .move_stablecoin(self.address, liquidator, ctx.system_debt_engine, info.debt_value_to_repay)?;

        debug!(
            pool = %request.pool,
            position = %request.position,
            price = %collateral_price,
            share = %info.debt_share_to_liquidate,
            seized = %info.collateral_to_seize,
            fee = %info.treasury_fee,
            "fixed spread executed"
        );
        Ok(LiquidationOutcome {
            debt_share_liquidated: info.debt_share_to_liquidate,
            debt_value_repaid: info.debt_value_to_repay,
            collateral_seized: info.collateral_to_seize,
            treasury_fee: info.treasury_fee,
            bad_debt: Rad::ZERO,
        })
    }
}
