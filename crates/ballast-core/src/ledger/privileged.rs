//! capability-gated ledger writes
//!
//! these paths skip the safety, floor and ceiling checks of the normal
//! surface. each one takes an [`Authority`] and accepts only the roles listed
//! next to it; the double-entry identities still hold after every call.

use ballast_math::{Rad, Ray, Wad};
use tracing::{debug, info};

use super::{BookKeeper, Position};
use crate::access::{Authority, Role};
use crate::collateral_pool::CollateralPoolConfig;
use crate::error::{Error, Result};
use crate::types::{Address, CollateralPoolId};

impl BookKeeper {
    /// credit or debit free collateral. adapters only
    pub fn add_collateral(
        &mut self,
        authority: &Authority,
        pool_id: CollateralPoolId,
        owner: Address,
        amount: i128,
    ) -> Result<()> {
        authority.require(&[Role::Adapter])?;
        let balance = self
            .collateral_token(pool_id, owner)
            .add_signed(amount)
            .map_err(|_| Error::InsufficientCollateral)?;
        self.collateral_token.insert((pool_id, owner), balance);
        debug!(pool = %pool_id, %owner, amount, "collateral added");
        Ok(())
    }

    /// forced change of a position with no safety check
    ///
    /// negative deltas seize: collateral goes to `collateral_creditor`'s free
    /// balance and the debt value removed is booked as `debtor`'s bad debt.
    /// liquidation engine and show stopper only.
    #[allow(clippy::too_many_arguments)]
    pub fn confiscate_position(
        &mut self,
        authority: &Authority,
        pools: &mut CollateralPoolConfig,
        pool_id: CollateralPoolId,
        position_address: Address,
        collateral_creditor: Address,
        debtor: Address,
        collateral_delta: i128,
        debt_share_delta: i128,
    ) -> Result<()> {
        authority.require(&[Role::LiquidationEngine, Role::ShowStopper])?;
        let pool = pools.get(pool_id)?;
        let rate = pool.debt_accumulated_rate;

        let current = self.position(pool_id, position_address);
        let position = Position {
            locked_collateral: current
                .locked_collateral
                .add_signed(collateral_delta)
                .map_err(|_| Error::InsufficientCollateral)?,
            debt_share: current.debt_share.add_signed(debt_share_delta)?,
        };
        let total_debt_share = pool.total_debt_share.add_signed(debt_share_delta)?;
        let debt_value = Wad::from_raw(debt_share_delta.unsigned_abs().into()).mul_ray(rate)?;

        let creditor_balance = self
            .collateral_token(pool_id, collateral_creditor)
            .sub_signed(collateral_delta)
            .map_err(|_| Error::InsufficientCollateral)?;
        let (bad_debt, unbacked) = if debt_share_delta <= 0 {
            (
                self.system_bad_debt(debtor).checked_add(debt_value)?,
                self.total_unbacked_stablecoin.checked_add(debt_value)?,
            )
        } else {
            (
                self.system_bad_debt(debtor)
                    .checked_sub(debt_value)
                    .map_err(|_| Error::InsufficientBadDebt)?,
                self.total_unbacked_stablecoin.checked_sub(debt_value)?,
            )
        };

        pools.get_mut(pool_id)?.total_debt_share = total_debt_share;
        self.positions.insert((pool_id, position_address), position);
        self.collateral_token.insert((pool_id, collateral_creditor), creditor_balance);
        self.system_bad_debt.insert(debtor, bad_debt);
        self.total_unbacked_stablecoin = unbacked;

        debug!(
            pool = %pool_id,
            position = %position_address,
            collateral_delta,
            debt_share_delta,
            %debt_value,
            "position confiscated"
        );
        Ok(())
    }

    /// create a matching bad debt / stablecoin pair. owner or mintable role
    pub fn mint_unbacked_stablecoin(
        &mut self,
        authority: &Authority,
        debt_dst: Address,
        coin_dst: Address,
        value: Rad,
    ) -> Result<()> {
        authority.require(&[Role::Owner, Role::Mintable])?;
        let bad_debt = self.system_bad_debt(debt_dst).checked_add(value)?;
        let stablecoin = self.stablecoin(coin_dst).checked_add(value)?;
        let unbacked = self.total_unbacked_stablecoin.checked_add(value)?;
        let issued = self.total_stablecoin_issued.checked_add(value)?;

        self.system_bad_debt.insert(debt_dst, bad_debt);
        self.stablecoin.insert(coin_dst, stablecoin);
        self.total_unbacked_stablecoin = unbacked;
        self.total_stablecoin_issued = issued;
        debug!(%debt_dst, %coin_dst, %value, "unbacked stablecoin minted");
        Ok(())
    }

    /// raise a pool's rate by `rate_delta` and credit the resulting
    /// interest to `recipient`. stability fee collector only
    pub fn accrue_stability_fee(
        &mut self,
        authority: &Authority,
        pools: &mut CollateralPoolConfig,
        pool_id: CollateralPoolId,
        recipient: Address,
        rate_delta: Ray,
    ) -> Result<Rad> {
        authority.require(&[Role::StabilityFeeCollector])?;
        if !self.live {
            return Err(Error::NotLive);
        }
        let pool = pools.get(pool_id)?;
        let rate = pool.debt_accumulated_rate.checked_add(rate_delta)?;
        let accrued = pool.total_debt_share.mul_ray(rate_delta)?;
        let balance = self.stablecoin(recipient).checked_add(accrued)?;
        let issued = self.total_stablecoin_issued.checked_add(accrued)?;

        pools.get_mut(pool_id)?.debt_accumulated_rate = rate;
        self.stablecoin.insert(recipient, balance);
        self.total_stablecoin_issued = issued;
        Ok(accrued)
    }

    /// owner or show stopper
    pub fn cage(&mut self, authority: &Authority) -> Result<()> {
        authority.require(&[Role::Owner, Role::ShowStopper])?;
        if self.live {
            self.live = false;
            info!("book keeper caged");
        }
        Ok(())
    }

    /// owner or show stopper
    pub fn uncage(&mut self, authority: &Authority) -> Result<()> {
        authority.require(&[Role::Owner, Role::ShowStopper])?;
        if !self.live {
            self.live = true;
            info!("book keeper uncaged");
        }
        Ok(())
    }
}
