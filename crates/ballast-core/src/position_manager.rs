//! position ids, ownership and per-owner enumeration
//!
//! every id maps to one ledger slot. the manager address is whitelisted on
//! each slot it creates, so all ledger calls below are made as the manager
//! after the manager's own permission check passed.
//!
//! per-owner lists live in an arena indexed by `id - 1`:
//!
//! ```text
//!   owner_index[alice] = { first: 1, last: 4, count: 3 }
//!
//!   #1 <-> #3 <-> #4        (insertion order, append at tail)
//! ```

use std::collections::{BTreeMap, BTreeSet};

use ballast_math::{Rad, Wad};
use tracing::info;

use crate::collateral_pool::CollateralPoolConfig;
use crate::error::{Error, Result};
use crate::ledger::BookKeeper;
use crate::price::PriceFeedRegistry;
use crate::types::{Address, CollateralPoolId, PositionId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PositionRecord {
    address: Address,
    owner: Address,
    pool: CollateralPoolId,
    prev: Option<PositionId>,
    next: Option<PositionId>,
}

/// head, tail and length of one owner's list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerList {
    pub first: Option<PositionId>,
    pub last: Option<PositionId>,
    pub count: u64,
}

/// one page of an owner's positions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionPage {
    pub ids: Vec<PositionId>,
    pub pools: Vec<CollateralPoolId>,
    pub addresses: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionManager {
    address: Address,
    records: Vec<PositionRecord>,
    owner_index: BTreeMap<Address, OwnerList>,
    /// (owner, id, delegate)
    owner_whitelist: BTreeSet<(Address, PositionId, Address)>,
    /// (owner, migrator)
    migration_whitelist: BTreeSet<(Address, Address)>,
}

fn parse_ok(ok: u8) -> Result<bool> {
    match ok {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::InvalidOk(other)),
    }
}

impl PositionManager {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            records: Vec::new(),
            owner_index: BTreeMap::new(),
            owner_whitelist: BTreeSet::new(),
            migration_whitelist: BTreeSet::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn last_position_id(&self) -> Option<PositionId> {
        (!self.records.is_empty()).then(|| PositionId(self.records.len() as u64))
    }

    fn index(&self, id: PositionId) -> Result<usize> {
        let idx = id.0.checked_sub(1).ok_or(Error::PositionNotFound(id))? as usize;
        if idx < self.records.len() {
            Ok(idx)
        } else {
            Err(Error::PositionNotFound(id))
        }
    }

    fn record(&self, id: PositionId) -> Result<&PositionRecord> {
        Ok(&self.records[self.index(id)?])
    }

    pub fn owner_of(&self, id: PositionId) -> Result<Address> {
        Ok(self.record(id)?.owner)
    }

    pub fn position_address(&self, id: PositionId) -> Result<Address> {
        Ok(self.record(id)?.address)
    }

    pub fn collateral_pool(&self, id: PositionId) -> Result<CollateralPoolId> {
        Ok(self.record(id)?.pool)
    }

    pub fn owner_list(&self, owner: Address) -> OwnerList {
        self.owner_index.get(&owner).copied().unwrap_or_default()
    }

    /// `(prev, next)` of `id` in its owner's list
    pub fn list(&self, id: PositionId) -> Result<(Option<PositionId>, Option<PositionId>)> {
        let record = self.record(id)?;
        Ok((record.prev, record.next))
    }

    /// owner, or a delegate the owner allowed on this id
    pub fn is_owner_allowed(&self, id: PositionId, caller: Address) -> Result<bool> {
        let owner = self.owner_of(id)?;
        Ok(owner == caller || self.owner_whitelist.contains(&(owner, id, caller)))
    }

    fn require_owner_allowed(&self, id: PositionId, caller: Address) -> Result<()> {
        if self.is_owner_allowed(id, caller)? {
            Ok(())
        } else {
            Err(Error::OwnerNotAllowed)
        }
    }

    pub fn is_migration_allowed(&self, owner: Address, caller: Address) -> bool {
        owner == caller || self.migration_whitelist.contains(&(owner, caller))
    }

    fn require_migration_allowed(&self, owner: Address, caller: Address) -> Result<()> {
        if self.is_migration_allowed(owner, caller) {
            Ok(())
        } else {
            Err(Error::MigrationNotAllowed)
        }
    }

    fn append(&mut self, idx: usize, owner: Address) {
        let id = PositionId(idx as u64 + 1);
        let list = self.owner_index.entry(owner).or_default();
        let prev = list.last;
        list.last = Some(id);
        if list.first.is_none() {
            list.first = Some(id);
        }
        list.count += 1;

        if let Some(prev) = prev {
            self.records[prev.0 as usize - 1].next = Some(id);
        }
        let record = &mut self.records[idx];
        record.owner = owner;
        record.prev = prev;
        record.next = None;
    }

    fn detach(&mut self, idx: usize) {
        let id = PositionId(idx as u64 + 1);
        let (owner, prev, next) = {
            let r = &self.records[idx];
            (r.owner, r.prev, r.next)
        };
        if let Some(prev) = prev {
            self.records[prev.0 as usize - 1].next = next;
        }
        if let Some(next) = next {
            self.records[next.0 as usize - 1].prev = prev;
        }
        if let Some(list) = self.owner_index.get_mut(&owner) {
            if list.first == Some(id) {
                list.first = next;
            }
            if list.last == Some(id) {
                list.last = prev;
            }
            list.count = list.count.saturating_sub(1);
        }
        let record = &mut self.records[idx];
        record.prev = None;
        record.next = None;
    }

    /// allocate the next id with an empty slot in `pool`
    pub fn open(
        &mut self,
        ledger: &mut BookKeeper,
        pools: &CollateralPoolConfig,
        pool: CollateralPoolId,
        owner: Address,
    ) -> Result<PositionId> {
        if owner.is_zero() {
            return Err(Error::ZeroAddress);
        }
        pools.get(pool)?;

        let idx = self.records.len();
        let id = PositionId(idx as u64 + 1);
        let address = Address::position_slot(id);
        self.records.push(PositionRecord {
            address,
            owner,
            pool,
            prev: None,
            next: None,
        });
        self.append(idx, owner);

        ledger.whitelist(address, self.address);
        ledger.open_slot(pool, address);

        info!(%id, pool = %pool, %owner, position = %address, "position opened");
        Ok(id)
    }

    /// hand `id` to `destination`, moving it between owner lists
    pub fn give(&mut self, caller: Address, id: PositionId, destination: Address) -> Result<Address> {
        self.require_owner_allowed(id, caller)?;
        if destination.is_zero() {
            return Err(Error::ZeroAddress);
        }
        let idx = self.index(id)?;
        let from = self.records[idx].owner;
        if destination == from {
            return Err(Error::SameOwner);
        }

        self.detach(idx);
        self.append(idx, destination);
        info!(%id, %from, to = %destination, "position transferred");
        Ok(from)
    }

    /// grant or revoke `delegate` on `id`, under the current owner
    pub fn allow_manage_position(&mut self, caller: Address, id: PositionId, delegate: Address, ok: u8) -> Result<Address> {
        let allowed = parse_ok(ok)?;
        self.require_owner_allowed(id, caller)?;
        let owner = self.owner_of(id)?;
        if allowed {
            self.owner_whitelist.insert((owner, id, delegate));
        } else {
            self.owner_whitelist.remove(&(owner, id, delegate));
        }
        Ok(owner)
    }

    /// let `migrator` export to or import from the caller's address
    pub fn allow_migrate_position(&mut self, caller: Address, migrator: Address, ok: u8) -> Result<()> {
        if parse_ok(ok)? {
            self.migration_whitelist.insert((caller, migrator));
        } else {
            self.migration_whitelist.remove(&(caller, migrator));
        }
        Ok(())
    }

    /// lock/free collateral and draw/wipe debt on the slot of `id`
    ///
    /// collateral comes from the slot's own free balance and drawn
    /// stablecoin lands there too; move it out with
    /// [`move_stablecoin`](Self::move_stablecoin).
    #[allow(clippy::too_many_arguments)]
    pub fn adjust_position(
        &self,
        ledger: &mut BookKeeper,
        pools: &mut CollateralPoolConfig,
        feeds: &PriceFeedRegistry,
        caller: Address,
        id: PositionId,
        collateral_delta: i128,
        debt_share_delta: i128,
        now: Timestamp,
    ) -> Result<()> {
        self.require_owner_allowed(id, caller)?;
        let record = self.record(id)?;
        if debt_share_delta > 0 {
            feeds.require_healthy(pools, record.pool, now)?;
        }
        ledger.adjust_position(
            pools,
            self.address,
            record.pool,
            record.address,
            record.address,
            record.address,
            collateral_delta,
            debt_share_delta,
        )
    }

    /// free collateral of the slot's own pool to `destination`
    pub fn move_collateral(
        &self,
        ledger: &mut BookKeeper,
        caller: Address,
        id: PositionId,
        destination: Address,
        amount: Wad,
    ) -> Result<()> {
        let pool = self.collateral_pool(id)?;
        self.move_collateral_from_pool(ledger, caller, pool, id, destination, amount)
    }

    /// free collateral of any pool that ended up on the slot
    pub fn move_collateral_from_pool(
        &self,
        ledger: &mut BookKeeper,
        caller: Address,
        pool: CollateralPoolId,
        id: PositionId,
        destination: Address,
        amount: Wad,
    ) -> Result<()> {
        self.require_owner_allowed(id, caller)?;
        let address = self.position_address(id)?;
        ledger.move_collateral(self.address, pool, address, destination, amount)
    }

    pub fn move_stablecoin(
        &self,
        ledger: &mut BookKeeper,
        caller: Address,
        id: PositionId,
        destination: Address,
        value: Rad,
    ) -> Result<()> {
        self.require_owner_allowed(id, caller)?;
        let address = self.position_address(id)?;
        ledger.move_stablecoin(self.address, address, destination, value)
    }

    fn require_healthy_if_indebted(
        feeds: &PriceFeedRegistry,
        pools: &CollateralPoolConfig,
        pool: CollateralPoolId,
        debt_share: Wad,
        now: Timestamp,
    ) -> Result<()> {
        if debt_share.is_zero() {
            Ok(())
        } else {
            feeds.require_healthy(pools, pool, now)
        }
    }

    /// merge the whole of `source` into `destination`
    #[allow(clippy::too_many_arguments)]
    pub fn move_position(
        &self,
        ledger: &mut BookKeeper,
        pools: &CollateralPoolConfig,
        feeds: &PriceFeedRegistry,
        caller: Address,
        source: PositionId,
        destination: PositionId,
        now: Timestamp,
    ) -> Result<()> {
        self.require_owner_allowed(source, caller)?;
        self.require_owner_allowed(destination, caller)?;
        let src = self.record(source)?;
        let dst = self.record(destination)?;
        if src.pool != dst.pool {
            return Err(Error::DifferentCollateralPool);
        }
        let position = ledger.position(src.pool, src.address);
        Self::require_healthy_if_indebted(feeds, pools, src.pool, position.debt_share, now)?;
        ledger.move_position(
            pools,
            self.address,
            src.pool,
            src.address,
            dst.address,
            position.locked_collateral.to_delta()?,
            position.debt_share.to_delta()?,
        )
    }

    /// hand the slot's balances to an outside address
    ///
    /// `destination` must have allowed the caller to migrate and whitelisted
    /// the manager in the ledger.
    #[allow(clippy::too_many_arguments)]
    pub fn export_position(
        &self,
        ledger: &mut BookKeeper,
        pools: &CollateralPoolConfig,
        feeds: &PriceFeedRegistry,
        caller: Address,
        id: PositionId,
        destination: Address,
        now: Timestamp,
    ) -> Result<()> {
        self.require_owner_allowed(id, caller)?;
        self.require_migration_allowed(destination, caller)?;
        let record = self.record(id)?;
        let position = ledger.position(record.pool, record.address);
        Self::require_healthy_if_indebted(feeds, pools, record.pool, position.debt_share, now)?;
        ledger.move_position(
            pools,
            self.address,
            record.pool,
            record.address,
            destination,
            position.locked_collateral.to_delta()?,
            position.debt_share.to_delta()?,
        )?;
        info!(%id, %destination, "position exported");
        Ok(())
    }

    /// pull an outside address's balances into the slot of `id`
    #[allow(clippy::too_many_arguments)]
    pub fn import_position(
        &self,
        ledger: &mut BookKeeper,
        pools: &CollateralPoolConfig,
        feeds: &PriceFeedRegistry,
        caller: Address,
        source: Address,
        id: PositionId,
        now: Timestamp,
    ) -> Result<()> {
        self.require_migration_allowed(source, caller)?;
        self.require_owner_allowed(id, caller)?;
        let record = self.record(id)?;
        let position = ledger.position(record.pool, source);
        Self::require_healthy_if_indebted(feeds, pools, record.pool, position.debt_share, now)?;
        ledger.move_position(
            pools,
            self.address,
            record.pool,
            source,
            record.address,
            position.locked_collateral.to_delta()?,
            position.debt_share.to_delta()?,
        )?;
        info!(%source, %id, "position imported");
        Ok(())
    }

    /// resolve `id` for a shutdown redemption, after the permission check
    pub fn redeemable_slot(&self, caller: Address, id: PositionId) -> Result<(CollateralPoolId, Address)> {
        self.require_owner_allowed(id, caller)?;
        let record = self.record(id)?;
        Ok((record.pool, record.address))
    }

    /// ids of `owner` in insertion order
    pub fn positions_of(&self, owner: Address) -> OwnerPositions<'_> {
        OwnerPositions {
            manager: self,
            cursor: self.owner_list(owner).first,
            forward: true,
        }
    }

    fn page(&self, iter: OwnerPositions<'_>, start: usize, limit: usize) -> PositionPage {
        let mut page = PositionPage::default();
        for id in iter.skip(start).take(limit) {
            let record = &self.records[id.0 as usize - 1];
            page.ids.push(id);
            page.pools.push(record.pool);
            page.addresses.push(record.address);
        }
        page
    }

    /// `limit` positions of `owner` from the head, skipping `start`
    pub fn positions_asc(&self, owner: Address, start: usize, limit: usize) -> PositionPage {
        self.page(self.positions_of(owner), start, limit)
    }

    /// `limit` positions of `owner` from the tail, skipping `start`
    pub fn positions_desc(&self, owner: Address, start: usize, limit: usize) -> PositionPage {
        let iter = OwnerPositions {
            manager: self,
            cursor: self.owner_list(owner).last,
            forward: false,
        };
        self.page(iter, start, limit)
    }
}

/// walks an owner's list through the arena links
#[derive(Debug, Clone)]
pub struct OwnerPositions<'a> {
    manager: &'a PositionManager,
    cursor: Option<PositionId>,
    forward: bool,
}

impl Iterator for OwnerPositions<'_> {
    type Item = PositionId;

    fn next(&mut self) -> Option<PositionId> {
        let id = self.cursor?;
        let record = self.manager.record(id).ok()?;
        self.cursor = if self.forward { record.next } else { record.prev };
        Some(id)
    }
}
