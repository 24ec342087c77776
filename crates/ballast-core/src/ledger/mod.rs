//! the book keeper: single source of truth for balances
//!
//! ```text
//!   positions[(pool, slot)]        locked collateral + debt share    (wad)
//!   collateral_token[(pool, who)]  free collateral                   (wad)
//!   stablecoin[who]                internal stablecoin credit        (rad)
//!   system_bad_debt[who]           unbacked debt                     (rad)
//! ```
//!
//! double entry: every credit has a matching debit, so
//!
//! ```text
//!   Σ stablecoin      == total_stablecoin_issued
//!   Σ system_bad_debt == total_unbacked_stablecoin
//!   total_stablecoin_issued == Σ pool debt + total_unbacked_stablecoin
//! ```
//!
//! this module holds the safety-checked surface. forced writes used by
//! liquidation, fee accrual and global settlement live in [`privileged`] and
//! need an [`Authority`](crate::access::Authority).

pub mod privileged;

use std::collections::{BTreeMap, BTreeSet};

use ballast_math::{Rad, Wad};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::access::{AccessControl, Role};
use crate::collateral_pool::CollateralPoolConfig;
use crate::error::{Ceiling, Error, Result};
use crate::types::{Address, CollateralPoolId};

/// run `f` against the ledger and pools as one unit
///
/// on error both are restored to their state before the call. used where a
/// pluggable collaborator (a liquidation strategy) writes through several
/// ledger entry points and its result is only checked afterwards.
pub fn with_rollback<T>(
    ledger: &mut BookKeeper,
    pools: &mut CollateralPoolConfig,
    f: impl FnOnce(&mut BookKeeper, &mut CollateralPoolConfig) -> Result<T>,
) -> Result<T> {
    let ledger_checkpoint = ledger.clone();
    let pools_checkpoint = pools.clone();
    let result = f(ledger, pools);
    if result.is_err() {
        *ledger = ledger_checkpoint;
        *pools = pools_checkpoint;
    }
    result
}

/// balances of one ledger slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub locked_collateral: Wad,
    pub debt_share: Wad,
}

impl Position {
    pub fn is_empty(&self) -> bool {
        self.locked_collateral.is_zero() && self.debt_share.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookKeeper {
    live: bool,
    positions: BTreeMap<(CollateralPoolId, Address), Position>,
    collateral_token: BTreeMap<(CollateralPoolId, Address), Wad>,
    stablecoin: BTreeMap<Address, Rad>,
    system_bad_debt: BTreeMap<Address, Rad>,
    /// owner -> addresses allowed to act on the owner's balances
    position_whitelist: BTreeMap<Address, BTreeSet<Address>>,
    total_stablecoin_issued: Rad,
    total_unbacked_stablecoin: Rad,
    total_debt_ceiling: Rad,
}

impl Default for BookKeeper {
    fn default() -> Self {
        Self::new()
    }
}

impl BookKeeper {
    pub fn new() -> Self {
        Self {
            live: true,
            positions: BTreeMap::new(),
            collateral_token: BTreeMap::new(),
            stablecoin: BTreeMap::new(),
            system_bad_debt: BTreeMap::new(),
            position_whitelist: BTreeMap::new(),
            total_stablecoin_issued: Rad::ZERO,
            total_unbacked_stablecoin: Rad::ZERO,
            total_debt_ceiling: Rad::ZERO,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn position(&self, pool: CollateralPoolId, address: Address) -> Position {
        self.positions.get(&(pool, address)).copied().unwrap_or_default()
    }

    pub fn collateral_token(&self, pool: CollateralPoolId, owner: Address) -> Wad {
        self.collateral_token.get(&(pool, owner)).copied().unwrap_or_default()
    }

    pub fn stablecoin(&self, owner: Address) -> Rad {
        self.stablecoin.get(&owner).copied().unwrap_or_default()
    }

    pub fn system_bad_debt(&self, owner: Address) -> Rad {
        self.system_bad_debt.get(&owner).copied().unwrap_or_default()
    }

    pub fn total_stablecoin_issued(&self) -> Rad {
        self.total_stablecoin_issued
    }

    pub fn total_unbacked_stablecoin(&self) -> Rad {
        self.total_unbacked_stablecoin
    }

    pub fn total_debt_ceiling(&self) -> Rad {
        self.total_debt_ceiling
    }

    /// every slot of a pool, in address order
    pub fn positions_in_pool(&self, pool: CollateralPoolId) -> impl Iterator<Item = (Address, Position)> + '_ {
        self.positions
            .iter()
            .filter(move |((p, _), _)| *p == pool)
            .map(|((_, addr), position)| (*addr, *position))
    }

    /// `owner == caller` or `caller` whitelisted by `owner`
    pub fn is_allowed(&self, owner: Address, caller: Address) -> bool {
        owner == caller
            || self
                .position_whitelist
                .get(&owner)
                .is_some_and(|set| set.contains(&caller))
    }

    fn require_allowed(&self, owner: Address, caller: Address) -> Result<()> {
        if self.is_allowed(owner, caller) {
            Ok(())
        } else {
            Err(Error::OwnerNotAllowed)
        }
    }

    /// let `target` act on the caller's balances
    pub fn whitelist(&mut self, caller: Address, target: Address) {
        self.position_whitelist.entry(caller).or_default().insert(target);
    }

    pub fn blacklist(&mut self, caller: Address, target: Address) {
        if let Some(set) = self.position_whitelist.get_mut(&caller) {
            set.remove(&target);
            if set.is_empty() {
                self.position_whitelist.remove(&caller);
            }
        }
    }

    /// register an empty slot so it shows up in pool enumeration
    pub(crate) fn open_slot(&mut self, pool: CollateralPoolId, address: Address) {
        self.positions.entry((pool, address)).or_default();
    }

    pub fn set_total_debt_ceiling(&mut self, access: &AccessControl, caller: Address, value: Rad) -> Result<()> {
        access.require_any(&[Role::Owner, Role::Gov], caller)?;
        self.total_debt_ceiling = value;
        Ok(())
    }

    /// transfer free collateral
    pub fn move_collateral(
        &mut self,
        caller: Address,
        pool: CollateralPoolId,
        src: Address,
        dst: Address,
        amount: Wad,
    ) -> Result<()> {
        self.require_allowed(src, caller)?;
        let src_balance = self
            .collateral_token(pool, src)
            .checked_sub(amount)
            .map_err(|_| Error::InsufficientCollateral)?;
        if src == dst {
            return Ok(());
        }
        let dst_balance = self.collateral_token(pool, dst).checked_add(amount)?;

        self.collateral_token.insert((pool, src), src_balance);
        self.collateral_token.insert((pool, dst), dst_balance);
        debug!(pool = %pool, %src, %dst, %amount, "collateral moved");
        Ok(())
    }

    /// transfer internal stablecoin
    pub fn move_stablecoin(&mut self, caller: Address, src: Address, dst: Address, value: Rad) -> Result<()> {
        self.require_allowed(src, caller)?;
        let src_balance = self
            .stablecoin(src)
            .checked_sub(value)
            .map_err(|_| Error::InsufficientStablecoin)?;
        if src == dst {
            return Ok(());
        }
        let dst_balance = self.stablecoin(dst).checked_add(value)?;

        self.stablecoin.insert(src, src_balance);
        self.stablecoin.insert(dst, dst_balance);
        debug!(%src, %dst, %value, "stablecoin moved");
        Ok(())
    }

    /// lock or free collateral and draw or wipe debt on one slot
    ///
    /// collateral comes from (or returns to) `collateral_owner`'s free
    /// balance, stablecoin is credited to (or burned from)
    /// `stablecoin_owner`. a change that only adds collateral and/or repays
    /// debt is never rejected for safety.
    #[allow(clippy::too_many_arguments)]
    pub fn adjust_position(
        &mut self,
        pools: &mut CollateralPoolConfig,
        caller: Address,
        pool_id: CollateralPoolId,
        position_address: Address,
        collateral_owner: Address,
        stablecoin_owner: Address,
        collateral_delta: i128,
        debt_share_delta: i128,
    ) -> Result<()> {
        if !self.live {
            return Err(Error::NotLive);
        }
        let pool = pools.get(pool_id)?;
        let rate = pool.debt_accumulated_rate;

        let risk_increasing = debt_share_delta > 0 || collateral_delta < 0;
        if risk_increasing {
            self.require_allowed(position_address, caller)?;
        }
        if collateral_delta > 0 {
            self.require_allowed(collateral_owner, caller)?;
        }
        if debt_share_delta < 0 {
            self.require_allowed(stablecoin_owner, caller)?;
        }

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
        let total_stablecoin_issued = if debt_share_delta >= 0 {
            self.total_stablecoin_issued.checked_add(debt_value)?
        } else {
            self.total_stablecoin_issued.checked_sub(debt_value)?
        };
        let position_debt_value = position.debt_share.mul_ray(rate)?;

        if debt_share_delta > 0 {
            if total_debt_share.mul_ray(rate)? > pool.debt_ceiling {
                return Err(Error::CeilingExceeded(Ceiling::Pool));
            }
            if total_stablecoin_issued > self.total_debt_ceiling {
                return Err(Error::CeilingExceeded(Ceiling::Global));
            }
            if position_debt_value > pool.position_debt_ceiling {
                return Err(Error::CeilingExceeded(Ceiling::Position));
            }
        }

        if risk_increasing && position_debt_value > position.locked_collateral.mul_ray(pool.price_with_safety_margin)? {
            return Err(Error::NotSafe);
        }

        if !position.debt_share.is_zero() && position_debt_value < pool.debt_floor {
            return Err(Error::BelowFloor);
        }

        let collateral_balance = self
            .collateral_token(pool_id, collateral_owner)
            .sub_signed(collateral_delta)
            .map_err(|_| Error::InsufficientCollateral)?;
        let stablecoin_balance = if debt_share_delta >= 0 {
            self.stablecoin(stablecoin_owner).checked_add(debt_value)?
        } else {
            self.stablecoin(stablecoin_owner)
                .checked_sub(debt_value)
                .map_err(|_| Error::InsufficientStablecoin)?
        };

        pools.get_mut(pool_id)?.total_debt_share = total_debt_share;
        self.positions.insert((pool_id, position_address), position);
        self.collateral_token.insert((pool_id, collateral_owner), collateral_balance);
        self.stablecoin.insert(stablecoin_owner, stablecoin_balance);
        self.total_stablecoin_issued = total_stablecoin_issued;

        debug!(
            pool = %pool_id,
            position = %position_address,
            collateral_delta,
            debt_share_delta,
            locked = %position.locked_collateral,
            debt_share = %position.debt_share,
            "position adjusted"
        );
        Ok(())
    }

    /// move locked collateral and debt between two slots of one pool
    ///
    /// the caller must be allowed on both slots and both results must be
    /// safe and either debt free or above the floor.
    #[allow(clippy::too_many_arguments)]
    pub fn move_position(
        &mut self,
        pools: &CollateralPoolConfig,
        caller: Address,
        pool_id: CollateralPoolId,
        src: Address,
        dst: Address,
        collateral_delta: i128,
        debt_share_delta: i128,
    ) -> Result<()> {
        let pool = pools.get(pool_id)?;
        self.require_allowed(src, caller)?;
        self.require_allowed(dst, caller)?;
        if src == dst {
            return Ok(());
        }

        let from = self.position(pool_id, src);
        let to = self.position(pool_id, dst);
        let from = Position {
            locked_collateral: from
                .locked_collateral
                .sub_signed(collateral_delta)
                .map_err(|_| Error::InsufficientCollateral)?,
            debt_share: from.debt_share.sub_signed(debt_share_delta)?,
        };
        let to = Position {
            locked_collateral: to
                .locked_collateral
                .add_signed(collateral_delta)
                .map_err(|_| Error::InsufficientCollateral)?,
            debt_share: to.debt_share.add_signed(debt_share_delta)?,
        };

        for position in [&from, &to] {
            let debt_value = position.debt_share.mul_ray(pool.debt_accumulated_rate)?;
            if debt_value > position.locked_collateral.mul_ray(pool.price_with_safety_margin)? {
                return Err(Error::NotSafe);
            }
            if !position.debt_share.is_zero() && debt_value < pool.debt_floor {
                return Err(Error::BelowFloor);
            }
        }

        self.positions.insert((pool_id, src), from);
        self.positions.insert((pool_id, dst), to);
        debug!(pool = %pool_id, %src, %dst, collateral_delta, debt_share_delta, "position moved");
        Ok(())
    }

    /// net the caller's own stablecoin against its own bad debt
    pub fn settle_system_bad_debt(&mut self, caller: Address, value: Rad) -> Result<()> {
        let bad_debt = self
            .system_bad_debt(caller)
            .checked_sub(value)
            .map_err(|_| Error::InsufficientBadDebt)?;
        let stablecoin = self
            .stablecoin(caller)
            .checked_sub(value)
            .map_err(|_| Error::InsufficientStablecoin)?;
        let unbacked = self.total_unbacked_stablecoin.checked_sub(value)?;
        let issued = self.total_stablecoin_issued.checked_sub(value)?;

        self.system_bad_debt.insert(caller, bad_debt);
        self.stablecoin.insert(caller, stablecoin);
        self.total_unbacked_stablecoin = unbacked;
        self.total_stablecoin_issued = issued;
        debug!(account = %caller, %value, "system bad debt settled");
        Ok(())
    }

    /// double-entry check over every balance
    pub fn check_conservation(&self, pools: &CollateralPoolConfig) -> bool {
        self.conservation_violation(pools).is_none()
    }

    /// first broken conservation identity, if any
    pub fn conservation_violation(&self, pools: &CollateralPoolConfig) -> Option<String> {
        self.check_identities(pools).err()
    }

    fn check_identities(&self, pools: &CollateralPoolConfig) -> std::result::Result<(), String> {
        let overflow = |_| "overflow while summing balances".to_string();

        let stablecoin = self
            .stablecoin
            .values()
            .try_fold(Rad::ZERO, |acc, v| acc.checked_add(*v))
            .map_err(overflow)?;
        if stablecoin != self.total_stablecoin_issued {
            return Err(format!(
                "stablecoin balances {stablecoin} != issued {}",
                self.total_stablecoin_issued
            ));
        }

        let bad_debt = self
            .system_bad_debt
            .values()
            .try_fold(Rad::ZERO, |acc, v| acc.checked_add(*v))
            .map_err(overflow)?;
        if bad_debt != self.total_unbacked_stablecoin {
            return Err(format!(
                "bad debt balances {bad_debt} != unbacked {}",
                self.total_unbacked_stablecoin
            ));
        }

        let mut backed = Rad::ZERO;
        for (pool_id, pool) in pools.iter() {
            let shares = self
                .positions_in_pool(*pool_id)
                .try_fold(Wad::ZERO, |acc, (_, p)| acc.checked_add(p.debt_share))
                .map_err(overflow)?;
            if shares != pool.total_debt_share {
                return Err(format!(
                    "pool {pool_id} positions hold {shares} shares, pool records {}",
                    pool.total_debt_share
                ));
            }
            let debt = pool.total_debt_value().map_err(|e| e.to_string())?;
            backed = backed.checked_add(debt).map_err(overflow)?;
        }

        let expected = backed
            .checked_add(self.total_unbacked_stablecoin)
            .map_err(overflow)?;
        if expected != self.total_stablecoin_issued {
            return Err(format!(
                "pool debt {backed} + unbacked {} != issued {}",
                self.total_unbacked_stablecoin, self.total_stablecoin_issued
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collateral_pool::{CollateralPoolParams, PoolParameter};
    use ballast_math::Ray;

    struct Fixture {
        access: AccessControl,
        owner: Address,
        pools: CollateralPoolConfig,
        ledger: BookKeeper,
        pool: CollateralPoolId,
        alice: Address,
    }

    fn wad(n: u128) -> Wad {
        Wad::from_units(n).unwrap()
    }

    fn rad(n: u128) -> Rad {
        Rad::from_units(n).unwrap()
    }

    fn fixture() -> Fixture {
        let owner = Address::system("owner");
        let mut access = AccessControl::new(owner);
        let adapter = Address::system("adapter");
        access.grant_unchecked(Role::Adapter, adapter);
        access.grant_unchecked(Role::PriceOracle, owner);

        let pool = CollateralPoolId::from_name("WXDC");
        let mut pools = CollateralPoolConfig::new();
        pools
            .init_collateral_pool(
                &access,
                owner,
                pool,
                adapter,
                CollateralPoolParams {
                    debt_ceiling: rad(1_000),
                    debt_floor: Rad::ZERO,
                    position_debt_ceiling: rad(1_000),
                    price_feed: Address::system("feed"),
                    liquidation_ratio: Ray::one(),
                    stability_fee_rate: Ray::one(),
                    close_factor_bps: 10_000,
                    liquidator_incentive_bps: 10_000,
                    treasury_fees_bps: 0,
                    strategy: None,
                },
                0,
            )
            .unwrap();
        let oracle = access.authorize(owner, &[Role::PriceOracle]).unwrap();
        pools.set_price_with_safety_margin(&oracle, pool, Ray::one()).unwrap();

        let mut ledger = BookKeeper::new();
        ledger.set_total_debt_ceiling(&access, owner, rad(10_000)).unwrap();

        let alice = Address::system("alice");
        let auth = access.authorize(adapter, &[Role::Adapter]).unwrap();
        ledger.add_collateral(&auth, pool, alice, wad(10).to_delta().unwrap()).unwrap();

        Fixture {
            access,
            owner,
            pools,
            ledger,
            pool,
            alice,
        }
    }

    fn delta(n: u128) -> i128 {
        wad(n).to_delta().unwrap()
    }

    #[test]
    fn test_lock_and_draw() {
        let mut f = fixture();
        let a = f.alice;
        f.ledger
            .adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(2), delta(1))
            .unwrap();

        let p = f.ledger.position(f.pool, a);
        assert_eq!(p.locked_collateral, wad(2));
        assert_eq!(p.debt_share, wad(1));
        assert_eq!(f.ledger.collateral_token(f.pool, a), wad(8));
        assert_eq!(f.ledger.stablecoin(a), rad(1));
        assert_eq!(f.pools.get(f.pool).unwrap().total_debt_share, wad(1));
        assert!(f.ledger.check_conservation(&f.pools));
    }

    #[test]
    fn test_unsafe_draw_rejected() {
        let mut f = fixture();
        let a = f.alice;
        f.ledger
            .adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(1), delta(1))
            .unwrap();
        let before = f.ledger.clone();
        let result = f.ledger.adjust_position(&mut f.pools, a, f.pool, a, a, a, 0, delta(1));
        assert!(matches!(result, Err(Error::NotSafe)));
        assert_eq!(f.ledger, before);
    }

    #[test]
    fn test_repay_never_fails_safety() {
        let mut f = fixture();
        let a = f.alice;
        f.ledger
            .adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(2), delta(2))
            .unwrap();
        // price crash makes the position unsafe
        let oracle = f.access.authorize(f.owner, &[Role::PriceOracle]).unwrap();
        f.pools
            .set_price_with_safety_margin(&oracle, f.pool, Ray::from_raw(Ray::one().raw() / 2))
            .unwrap();

        f.ledger
            .adjust_position(&mut f.pools, a, f.pool, a, a, a, 0, -delta(1))
            .unwrap();
        f.ledger
            .adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(1), 0)
            .unwrap();
        let result = f.ledger.adjust_position(&mut f.pools, a, f.pool, a, a, a, -delta(2), 0);
        assert!(matches!(result, Err(Error::NotSafe)));
    }

    #[test]
    fn test_ceilings() {
        let mut f = fixture();
        let a = f.alice;
        f.pools
            .set_parameter(&f.access, f.owner, f.pool, PoolParameter::DebtCeiling(rad(1)))
            .unwrap();
        let result = f.ledger.adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(5), delta(2));
        assert!(matches!(result, Err(Error::CeilingExceeded(Ceiling::Pool))));

        f.pools
            .set_parameter(&f.access, f.owner, f.pool, PoolParameter::DebtCeiling(rad(1_000)))
            .unwrap();
        f.ledger.set_total_debt_ceiling(&f.access, f.owner, rad(1)).unwrap();
        let result = f.ledger.adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(5), delta(2));
        assert!(matches!(result, Err(Error::CeilingExceeded(Ceiling::Global))));

        f.ledger.set_total_debt_ceiling(&f.access, f.owner, rad(1_000)).unwrap();
        f.pools
            .set_parameter(&f.access, f.owner, f.pool, PoolParameter::PositionDebtCeiling(rad(1)))
            .unwrap();
        let result = f.ledger.adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(5), delta(2));
        assert!(matches!(result, Err(Error::CeilingExceeded(Ceiling::Position))));
    }

    #[test]
    fn test_debt_floor() {
        let mut f = fixture();
        let a = f.alice;
        f.pools
            .set_parameter(&f.access, f.owner, f.pool, PoolParameter::DebtFloor(rad(2)))
            .unwrap();
        let result = f.ledger.adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(5), delta(1));
        assert!(matches!(result, Err(Error::BelowFloor)));

        f.ledger
            .adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(5), delta(3))
            .unwrap();
        // paying down to exactly zero is fine, to dust is not
        let result = f.ledger.adjust_position(&mut f.pools, a, f.pool, a, a, a, 0, -delta(2));
        assert!(matches!(result, Err(Error::BelowFloor)));
        f.ledger
            .adjust_position(&mut f.pools, a, f.pool, a, a, a, 0, -delta(3))
            .unwrap();
    }

    #[test]
    fn test_foreign_caller_rejected() {
        let mut f = fixture();
        let a = f.alice;
        let mallory = Address::system("mallory");
        let result = f.ledger.adjust_position(&mut f.pools, mallory, f.pool, a, a, a, delta(1), 0);
        assert!(matches!(result, Err(Error::OwnerNotAllowed)));

        f.ledger.whitelist(a, mallory);
        f.ledger
            .adjust_position(&mut f.pools, mallory, f.pool, a, a, a, delta(1), 0)
            .unwrap();

        f.ledger.blacklist(a, mallory);
        let result = f.ledger.move_collateral(mallory, f.pool, a, mallory, wad(1));
        assert!(matches!(result, Err(Error::OwnerNotAllowed)));
    }

    #[test]
    fn test_not_live() {
        let mut f = fixture();
        let a = f.alice;
        let auth = f.access.authorize(f.owner, &[Role::Owner]).unwrap();
        f.ledger.cage(&auth).unwrap();
        let result = f.ledger.adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(1), 0);
        assert!(matches!(result, Err(Error::NotLive)));
    }

    #[test]
    fn test_move_position_requires_both_sides_safe() {
        let mut f = fixture();
        let a = f.alice;
        let b = Address::system("bob");
        f.ledger
            .adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(4), delta(2))
            .unwrap();
        f.ledger.whitelist(b, a);

        // debt without collateral on the destination
        let result = f.ledger.move_position(&f.pools, a, f.pool, a, b, 0, delta(1));
        assert!(matches!(result, Err(Error::NotSafe)));

        f.ledger
            .move_position(&f.pools, a, f.pool, a, b, delta(2), delta(1))
            .unwrap();
        assert_eq!(f.ledger.position(f.pool, a).locked_collateral, wad(2));
        assert_eq!(f.ledger.position(f.pool, b).debt_share, wad(1));
        assert!(f.ledger.check_conservation(&f.pools));
    }

    #[test]
    fn test_move_stablecoin_balance_checked() {
        let mut f = fixture();
        let a = f.alice;
        let b = Address::system("bob");
        f.ledger
            .adjust_position(&mut f.pools, a, f.pool, a, a, a, delta(4), delta(2))
            .unwrap();

        let result = f.ledger.move_stablecoin(a, a, b, rad(3));
        assert!(matches!(result, Err(Error::InsufficientStablecoin)));
        f.ledger.move_stablecoin(a, a, b, rad(2)).unwrap();
        assert_eq!(f.ledger.stablecoin(b), rad(2));
        assert!(f.ledger.stablecoin(a).is_zero());
    }
}
