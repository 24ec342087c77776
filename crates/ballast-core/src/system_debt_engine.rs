//! protocol surplus and bad debt account
//!
//! stability fees, liquidation repayments and treasury collateral land on
//! the engine's ledger address, and confiscated debt is booked against it.
//! netting the two is open to anyone; taking surplus out is an owner call.

use ballast_math::{Rad, Wad};
use tracing::info;

use crate::access::{AccessControl, Authority, Role};
use crate::error::{Error, Result};
use crate::ledger::BookKeeper;
use crate::types::{Address, CollateralPoolId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemDebtEngine {
    address: Address,
    live: bool,
    /// stablecoin kept back when surplus is withdrawn
    surplus_buffer: Rad,
}

impl SystemDebtEngine {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            live: true,
            surplus_buffer: Rad::ZERO,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn surplus_buffer(&self) -> Rad {
        self.surplus_buffer
    }

    pub fn surplus(&self, ledger: &BookKeeper) -> Rad {
        ledger.stablecoin(self.address)
    }

    pub fn bad_debt(&self, ledger: &BookKeeper) -> Rad {
        ledger.system_bad_debt(self.address)
    }

    pub fn set_surplus_buffer(&mut self, access: &AccessControl, caller: Address, value: Rad) -> Result<()> {
        access.require_any(&[Role::Owner, Role::Gov], caller)?;
        self.surplus_buffer = value;
        Ok(())
    }

    /// burn `value` of the engine's surplus against its bad debt
    pub fn settle_system_bad_debt(&self, ledger: &mut BookKeeper, value: Rad) -> Result<()> {
        ledger.settle_system_bad_debt(self.address, value)?;
        info!(%value, "system bad debt settled");
        Ok(())
    }

    /// treasury collateral out of the engine. owner only
    pub fn withdraw_collateral_surplus(
        &self,
        access: &AccessControl,
        ledger: &mut BookKeeper,
        caller: Address,
        pool: CollateralPoolId,
        to: Address,
        amount: Wad,
    ) -> Result<()> {
        access.require_role(Role::Owner, caller)?;
        if to.is_zero() {
            return Err(Error::ZeroAddress);
        }
        ledger.move_collateral(self.address, pool, self.address, to, amount)?;
        info!(pool = %pool, %to, %amount, "collateral surplus withdrawn");
        Ok(())
    }

    /// stablecoin out of the engine, keeping the buffer. owner only
    ///
    /// refused while any bad debt is still on the books.
    pub fn withdraw_stablecoin_surplus(
        &self,
        access: &AccessControl,
        ledger: &mut BookKeeper,
        caller: Address,
        to: Address,
        value: Rad,
    ) -> Result<()> {
        access.require_role(Role::Owner, caller)?;
        if !self.live {
            return Err(Error::NotLive);
        }
        if to.is_zero() {
            return Err(Error::ZeroAddress);
        }
        if !self.bad_debt(ledger).is_zero() {
            return Err(Error::BadDebtRemaining);
        }
        let left = self
            .surplus(ledger)
            .checked_sub(value)
            .map_err(|_| Error::InsufficientSurplus)?;
        if left < self.surplus_buffer {
            return Err(Error::InsufficientSurplus);
        }
        ledger.move_stablecoin(self.address, self.address, to, value)?;
        info!(%to, %value, "stablecoin surplus withdrawn");
        Ok(())
    }

    /// net what can be netted and stop withdrawals. show stopper or owner
    pub fn cage(&mut self, authority: &Authority, ledger: &mut BookKeeper) -> Result<Rad> {
        authority.require(&[Role::Owner, Role::ShowStopper])?;
        let netted = self.surplus(ledger).min(self.bad_debt(ledger));
        if !netted.is_zero() {
            ledger.settle_system_bad_debt(self.address, netted)?;
        }
        self.live = false;
        info!(%netted, "system debt engine caged");
        Ok(netted)
    }

    pub fn uncage(&mut self, authority: &Authority) -> Result<()> {
        authority.require(&[Role::Owner, Role::ShowStopper])?;
        self.live = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rad(n: u128) -> Rad {
        Rad::from_units(n).unwrap()
    }

    fn setup() -> (AccessControl, Address, BookKeeper, SystemDebtEngine) {
        let owner = Address::system("owner");
        let access = AccessControl::new(owner);
        let engine = SystemDebtEngine::new(Address::system("system-debt-engine"));
        (access, owner, BookKeeper::new(), engine)
    }

    #[test]
    fn test_withdraw_blocked_by_bad_debt() {
        let (access, owner, mut ledger, engine) = setup();
        let auth = access.authorize(owner, &[Role::Owner]).unwrap();
        ledger
            .mint_unbacked_stablecoin(&auth, engine.address(), engine.address(), rad(10))
            .unwrap();

        let to = Address::system("treasury");
        let result = engine.withdraw_stablecoin_surplus(&access, &mut ledger, owner, to, rad(1));
        assert!(matches!(result, Err(Error::BadDebtRemaining)));

        engine.settle_system_bad_debt(&mut ledger, rad(10)).unwrap();
        assert!(engine.bad_debt(&ledger).is_zero());
        assert!(engine.surplus(&ledger).is_zero());
    }

    #[test]
    fn test_withdraw_keeps_buffer() {
        let (access, owner, mut ledger, mut engine) = setup();
        let auth = access.authorize(owner, &[Role::Owner]).unwrap();
        let sink = Address::system("sink");
        // surplus without bad debt on the engine
        ledger.mint_unbacked_stablecoin(&auth, sink, engine.address(), rad(10)).unwrap();
        engine.set_surplus_buffer(&access, owner, rad(4)).unwrap();

        let to = Address::system("treasury");
        let result = engine.withdraw_stablecoin_surplus(&access, &mut ledger, owner, to, rad(7));
        assert!(matches!(result, Err(Error::InsufficientSurplus)));
        engine
            .withdraw_stablecoin_surplus(&access, &mut ledger, owner, to, rad(6))
            .unwrap();
        assert_eq!(ledger.stablecoin(to), rad(6));

        let stranger = Address::system("stranger");
        let result = engine.withdraw_stablecoin_surplus(&access, &mut ledger, stranger, to, rad(1));
        assert!(matches!(result, Err(Error::MissingRole(Role::Owner))));
    }

    #[test]
    fn test_cage_nets_min() {
        let (access, owner, mut ledger, mut engine) = setup();
        let auth = access.authorize(owner, &[Role::Owner]).unwrap();
        let sink = Address::system("sink");
        ledger.mint_unbacked_stablecoin(&auth, engine.address(), sink, rad(5)).unwrap();
        ledger.mint_unbacked_stablecoin(&auth, sink, engine.address(), rad(3)).unwrap();

        let netted = engine.cage(&auth, &mut ledger).unwrap();
        assert_eq!(netted, rad(3));
        assert_eq!(engine.bad_debt(&ledger), rad(2));
        assert!(engine.surplus(&ledger).is_zero());
        assert!(!engine.is_live());
    }
}
