//! role-to-principal mapping
//!
//! each entry point checks the caller against an explicit set of roles.
//! privileged ledger paths additionally require an [`Authority`], a
//! capability value that can only be minted here after the role check
//! passed, so a forced write is never reachable through the normal safety
//! checked path.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::types::Address;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Gov,
    PriceOracle,
    Adapter,
    LiquidationEngine,
    StabilityFeeCollector,
    ShowStopper,
    PositionManager,
    Mintable,
    CollateralManager,
}

/// proof that `holder` held `role` when the capability was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authority {
    holder: Address,
    role: Role,
}

impl Authority {
    pub fn holder(&self) -> Address {
        self.holder
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// fail unless the capability was issued for one of `accepted`
    pub fn require(&self, accepted: &[Role]) -> Result<()> {
        if accepted.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::MissingRole(accepted.first().copied().unwrap_or(self.role)))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControl {
    grants: BTreeMap<Role, BTreeSet<Address>>,
}

impl AccessControl {
    /// new registry with `owner` holding the owner role
    pub fn new(owner: Address) -> Self {
        let mut access = Self::default();
        access.grants.entry(Role::Owner).or_default().insert(owner);
        access
    }

    pub fn has_role(&self, role: Role, who: Address) -> bool {
        self.grants.get(&role).is_some_and(|set| set.contains(&who))
    }

    pub fn members(&self, role: Role) -> impl Iterator<Item = &Address> {
        self.grants.get(&role).into_iter().flatten()
    }

    pub fn grant_role(&mut self, caller: Address, role: Role, who: Address) -> Result<()> {
        self.require_role(Role::Owner, caller)?;
        if who.is_zero() {
            return Err(Error::ZeroAddress);
        }
        self.grant_unchecked(role, who);
        info!(?role, account = %who, "role granted");
        Ok(())
    }

    pub fn revoke_role(&mut self, caller: Address, role: Role, who: Address) -> Result<()> {
        self.require_role(Role::Owner, caller)?;
        if let Some(set) = self.grants.get_mut(&role) {
            set.remove(&who);
        }
        info!(?role, account = %who, "role revoked");
        Ok(())
    }

    /// genesis wiring of system components
    pub(crate) fn grant_unchecked(&mut self, role: Role, who: Address) {
        self.grants.entry(role).or_default().insert(who);
    }

    pub fn require_role(&self, role: Role, caller: Address) -> Result<()> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(Error::MissingRole(role))
        }
    }

    /// fail unless the caller holds at least one of `roles`
    pub fn require_any(&self, roles: &[Role], caller: Address) -> Result<()> {
        self.authorize(caller, roles).map(|_| ())
    }

    /// issue a capability for the first of `roles` the caller holds
    pub fn authorize(&self, caller: Address, roles: &[Role]) -> Result<Authority> {
        roles
            .iter()
            .find(|role| self.has_role(**role, caller))
            .map(|role| Authority {
                holder: caller,
                role: *role,
            })
            .ok_or_else(|| Error::MissingRole(roles.first().copied().unwrap_or(Role::Owner)))
    }
}
