//! token adapters
//!
//! the ledger never sees external tokens. a collateral adapter takes custody
//! of the host's tokens and credits ledger collateral one to one; the
//! stablecoin adapter swaps internal stablecoin (rad) for the external token
//! (wad) at `1 wad = 1e27 rad`. moving the external tokens themselves is the
//! host's job; the adapters only keep the books on this side.

use ballast_math::Wad;
use tracing::debug;

use crate::access::{AccessControl, Authority, Role};
use crate::error::{Error, Result};
use crate::ledger::BookKeeper;
use crate::types::{Address, CollateralPoolId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralTokenAdapter {
    address: Address,
    pool: CollateralPoolId,
    live: bool,
    /// external tokens held on behalf of ledger balances
    total_custody: Wad,
}

impl CollateralTokenAdapter {
    pub fn new(pool: CollateralPoolId) -> Self {
        Self {
            address: Address::collateral_adapter(pool),
            pool,
            live: true,
            total_custody: Wad::ZERO,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn pool(&self) -> CollateralPoolId {
        self.pool
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn total_custody(&self) -> Wad {
        self.total_custody
    }

    /// credit `amount` of ledger collateral to `usr` for tokens the host
    /// took from `caller`
    pub fn deposit(
        &mut self,
        access: &AccessControl,
        ledger: &mut BookKeeper,
        caller: Address,
        usr: Address,
        amount: Wad,
    ) -> Result<()> {
        if !self.live {
            return Err(Error::NotLive);
        }
        if usr.is_zero() {
            return Err(Error::ZeroAddress);
        }
        let custody = self.total_custody.checked_add(amount)?;
        let authority = access.authorize(self.address, &[Role::Adapter])?;
        ledger.add_collateral(&authority, self.pool, usr, amount.to_delta()?)?;
        self.total_custody = custody;
        debug!(pool = %self.pool, %caller, %usr, %amount, "collateral deposited");
        Ok(())
    }

    /// debit the caller's free collateral; the host releases the tokens to
    /// `usr`. open after shutdown so redeemed collateral can leave
    pub fn withdraw(
        &mut self,
        access: &AccessControl,
        ledger: &mut BookKeeper,
        caller: Address,
        usr: Address,
        amount: Wad,
    ) -> Result<()> {
        if usr.is_zero() {
            return Err(Error::ZeroAddress);
        }
        let custody = self
            .total_custody
            .checked_sub(amount)
            .map_err(|_| Error::InsufficientCollateral)?;
        let authority = access.authorize(self.address, &[Role::Adapter])?;
        ledger.add_collateral(&authority, self.pool, caller, amount.to_neg_delta()?)?;
        self.total_custody = custody;
        debug!(pool = %self.pool, %caller, %usr, %amount, "collateral withdrawn");
        Ok(())
    }

    /// stop deposits. owner or show stopper
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
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StablecoinAdapter {
    address: Address,
}

impl StablecoinAdapter {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// credit `usr` with internal stablecoin for external tokens the host
    /// burned from `caller`
    pub fn deposit(&self, ledger: &mut BookKeeper, caller: Address, usr: Address, amount: Wad) -> Result<()> {
        if usr.is_zero() {
            return Err(Error::ZeroAddress);
        }
        ledger.move_stablecoin(self.address, self.address, usr, amount.to_rad()?)?;
        debug!(%caller, %usr, %amount, "stablecoin deposited");
        Ok(())
    }

    /// take internal stablecoin from the caller; the host mints external
    /// tokens to `usr`. the caller must have whitelisted the adapter
    pub fn withdraw(&self, ledger: &mut BookKeeper, caller: Address, usr: Address, amount: Wad) -> Result<()> {
        if usr.is_zero() {
            return Err(Error::ZeroAddress);
        }
        ledger.move_stablecoin(self.address, caller, self.address, amount.to_rad()?)?;
        debug!(%caller, %usr, %amount, "stablecoin withdrawn");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast_math::Rad;

    fn wad(n: u128) -> Wad {
        Wad::from_units(n).unwrap()
    }

    #[test]
    fn test_collateral_round_trip_tracks_custody() {
        let owner = Address::system("owner");
        let pool = CollateralPoolId::from_name("WXDC");
        let mut adapter = CollateralTokenAdapter::new(pool);
        let mut access = AccessControl::new(owner);
        access.grant_unchecked(Role::Adapter, adapter.address());
        let mut ledger = BookKeeper::new();
        let alice = Address::system("alice");

        adapter.deposit(&access, &mut ledger, alice, alice, wad(5)).unwrap();
        assert_eq!(ledger.collateral_token(pool, alice), wad(5));
        assert_eq!(adapter.total_custody(), wad(5));

        let result = adapter.withdraw(&access, &mut ledger, alice, alice, wad(6));
        assert!(matches!(result, Err(Error::InsufficientCollateral)));
        adapter.withdraw(&access, &mut ledger, alice, alice, wad(2)).unwrap();
        assert_eq!(ledger.collateral_token(pool, alice), wad(3));
        assert_eq!(adapter.total_custody(), wad(3));
    }

    #[test]
    fn test_caged_adapter_refuses_deposits() {
        let owner = Address::system("owner");
        let pool = CollateralPoolId::from_name("WXDC");
        let mut adapter = CollateralTokenAdapter::new(pool);
        let mut access = AccessControl::new(owner);
        access.grant_unchecked(Role::Adapter, adapter.address());
        let mut ledger = BookKeeper::new();

        let auth = access.authorize(owner, &[Role::Owner]).unwrap();
        adapter.cage(&auth).unwrap();
        let result = adapter.deposit(&access, &mut ledger, owner, owner, wad(1));
        assert!(matches!(result, Err(Error::NotLive)));
    }

    #[test]
    fn test_stablecoin_withdraw_needs_whitelist() {
        let owner = Address::system("owner");
        let access = AccessControl::new(owner);
        let adapter = StablecoinAdapter::new(Address::system("stablecoin-adapter"));
        let mut ledger = BookKeeper::new();
        let alice = Address::system("alice");
        let auth = access.authorize(owner, &[Role::Owner]).unwrap();
        ledger
            .mint_unbacked_stablecoin(&auth, owner, alice, Rad::from_units(3).unwrap())
            .unwrap();

        let result = adapter.withdraw(&mut ledger, alice, alice, wad(1));
        assert!(matches!(result, Err(Error::OwnerNotAllowed)));

        ledger.whitelist(alice, adapter.address());
        adapter.withdraw(&mut ledger, alice, alice, wad(1)).unwrap();
        assert_eq!(ledger.stablecoin(alice), Rad::from_units(2).unwrap());

        adapter.deposit(&mut ledger, alice, alice, wad(1)).unwrap();
        assert_eq!(ledger.stablecoin(alice), Rad::from_units(3).unwrap());
    }
}
