//! the assembled system
//!
//! [`Protocol`] owns one of every component, derives their addresses, grants
//! their genesis roles and forwards each entry point with the collaborators
//! it needs. successful calls push a [`ProtocolEvent`]; the host drains them
//! with [`Protocol::drain_events`].

use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;

use ballast_math::{Rad, Ray, Wad};
use tracing::info;

use crate::access::{AccessControl, Role};
use crate::adapter::{CollateralTokenAdapter, StablecoinAdapter};
use crate::collateral_pool::{CollateralPoolConfig, CollateralPoolParams, PoolParameter};
use crate::config::ProtocolConfig;
use crate::error::{Error, Result};
use crate::events::{Component, ProtocolEvent};
use crate::fee_collector::{Collection, StabilityFeeCollector};
use crate::ledger::BookKeeper;
use crate::liquidation::{
    FixedSpreadLiquidationStrategy, LiquidationEngine, LiquidationOutcome, LiquidationRequest, LiquidationStrategy,
};
use crate::position_manager::PositionManager;
use crate::price::{PriceFeed, PriceFeedRegistry, PriceOracle};
use crate::show_stopper::{BadDebtAccumulation, ShowStopper, ShutdownTargets};
use crate::system_debt_engine::SystemDebtEngine;
use crate::types::{Address, CollateralPoolId, PositionId, Timestamp};

/// comparable copy of every stateful component
///
/// feeds and strategies are shared collaborators and not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub access: AccessControl,
    pub ledger: BookKeeper,
    pub pools: CollateralPoolConfig,
    pub oracle: PriceOracle,
    pub position_manager: PositionManager,
    pub fee_collector: StabilityFeeCollector,
    pub system_debt_engine: SystemDebtEngine,
    pub show_stopper: ShowStopper,
    pub collateral_adapters: BTreeMap<CollateralPoolId, CollateralTokenAdapter>,
    pub liquidation_live: bool,
    pub liquidation_paused: bool,
}

#[derive(Debug)]
pub struct Protocol {
    access: AccessControl,
    ledger: BookKeeper,
    pools: CollateralPoolConfig,
    feeds: PriceFeedRegistry,
    oracle: PriceOracle,
    position_manager: PositionManager,
    fee_collector: StabilityFeeCollector,
    liquidation_engine: LiquidationEngine,
    fixed_spread_strategy: Address,
    system_debt_engine: SystemDebtEngine,
    show_stopper: ShowStopper,
    collateral_adapters: BTreeMap<CollateralPoolId, CollateralTokenAdapter>,
    stablecoin_adapter: StablecoinAdapter,
    now: Timestamp,
    events: Vec<ProtocolEvent>,
}

impl Protocol {
    /// empty system owned by `owner`, clock at `now`
    ///
    /// no pools and a zero global debt ceiling; see [`Protocol::from_config`]
    /// for a ready-made genesis.
    pub fn new(owner: Address, now: Timestamp) -> Result<Self> {
        if owner.is_zero() {
            return Err(Error::ZeroAddress);
        }
        let mut access = AccessControl::new(owner);

        let system_debt_engine = SystemDebtEngine::new(Address::system("system-debt-engine"));
        let engine = system_debt_engine.address();
        let oracle = PriceOracle::new(Address::system("price-oracle"));
        let position_manager = PositionManager::new(Address::system("position-manager"));
        let fee_collector = StabilityFeeCollector::new(Address::system("stability-fee-collector"), engine);
        let mut liquidation_engine = LiquidationEngine::new(Address::system("liquidation-engine"), engine);
        let show_stopper = ShowStopper::new(Address::system("show-stopper"), engine);
        let stablecoin_adapter = StablecoinAdapter::new(Address::system("stablecoin-adapter"));
        let fixed_spread = FixedSpreadLiquidationStrategy::new(Address::system("fixed-spread-liquidation-strategy"));
        let fixed_spread_strategy = fixed_spread.address();

        access.grant_unchecked(Role::PriceOracle, oracle.address());
        access.grant_unchecked(Role::PositionManager, position_manager.address());
        access.grant_unchecked(Role::StabilityFeeCollector, fee_collector.address());
        access.grant_unchecked(Role::LiquidationEngine, liquidation_engine.address());
        access.grant_unchecked(Role::LiquidationEngine, fixed_spread_strategy);
        access.grant_unchecked(Role::ShowStopper, show_stopper.address());

        liquidation_engine.register_strategy(&access, owner, Arc::new(fixed_spread))?;

        info!(%owner, at = now, "protocol created");
        Ok(Self {
            access,
            ledger: BookKeeper::new(),
            pools: CollateralPoolConfig::new(),
            feeds: PriceFeedRegistry::new(),
            oracle,
            position_manager,
            fee_collector,
            liquidation_engine,
            fixed_spread_strategy,
            system_debt_engine,
            show_stopper,
            collateral_adapters: BTreeMap::new(),
            stablecoin_adapter,
            now,
            events: Vec::new(),
        })
    }

    /// build the genesis described by `config`
    ///
    /// pools reference feeds by address; the feeds themselves are registered
    /// afterwards with [`Protocol::register_price_feed`].
    pub fn from_config(config: &ProtocolConfig, now: Timestamp) -> Result<Self> {
        let owner = config.owner;
        let mut protocol = Self::new(owner, now)?;

        protocol.set_total_debt_ceiling(owner, config.total_debt_ceiling)?;
        protocol.set_stablecoin_reference_price(owner, config.stablecoin_reference_price)?;
        protocol.set_cage_cool_down(owner, config.cage_cool_down)?;
        protocol.set_surplus_buffer(owner, config.surplus_buffer)?;
        protocol.set_global_stability_fee_rate(owner, config.global_stability_fee_rate)?;
        for pool_spec in &config.pools {
            let params = pool_spec.params(Some(protocol.fixed_spread_strategy));
            protocol.init_collateral_pool(owner, pool_spec.id, params)?;
        }

        info!(pools = config.pools.len(), "genesis applied");
        Ok(protocol)
    }

    fn emit(&mut self, event: ProtocolEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<ProtocolEvent> {
        mem::take(&mut self.events)
    }

    // ---- clock

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn set_timestamp(&mut self, now: Timestamp) -> Result<()> {
        if now < self.now {
            return Err(Error::TimestampWentBackwards { now, last: self.now });
        }
        self.now = now;
        Ok(())
    }

    // ---- read access

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn ledger(&self) -> &BookKeeper {
        &self.ledger
    }

    pub fn pools(&self) -> &CollateralPoolConfig {
        &self.pools
    }

    pub fn feeds(&self) -> &PriceFeedRegistry {
        &self.feeds
    }

    pub fn oracle(&self) -> &PriceOracle {
        &self.oracle
    }

    pub fn position_manager(&self) -> &PositionManager {
        &self.position_manager
    }

    pub fn fee_collector(&self) -> &StabilityFeeCollector {
        &self.fee_collector
    }

    pub fn liquidation_engine(&self) -> &LiquidationEngine {
        &self.liquidation_engine
    }

    pub fn fixed_spread_strategy(&self) -> Address {
        self.fixed_spread_strategy
    }

    pub fn system_debt_engine(&self) -> &SystemDebtEngine {
        &self.system_debt_engine
    }

    pub fn show_stopper(&self) -> &ShowStopper {
        &self.show_stopper
    }

    pub fn collateral_adapter(&self, pool: CollateralPoolId) -> Result<&CollateralTokenAdapter> {
        self.collateral_adapters
            .get(&pool)
            .ok_or(Error::CollateralPoolNotInit(pool))
    }

    pub fn stablecoin_adapter(&self) -> &StablecoinAdapter {
        &self.stablecoin_adapter
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            access: self.access.clone(),
            ledger: self.ledger.clone(),
            pools: self.pools.clone(),
            oracle: self.oracle.clone(),
            position_manager: self.position_manager.clone(),
            fee_collector: self.fee_collector.clone(),
            system_debt_engine: self.system_debt_engine.clone(),
            show_stopper: self.show_stopper.clone(),
            collateral_adapters: self.collateral_adapters.clone(),
            liquidation_live: self.liquidation_engine.is_live(),
            liquidation_paused: self.liquidation_engine.is_paused(),
        }
    }

    /// first broken double-entry identity, if any
    pub fn check_conservation(&self) -> std::result::Result<(), String> {
        match self.ledger.conservation_violation(&self.pools) {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }

    // ---- roles and governance

    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.access.grant_role(caller, role, account)?;
        self.emit(ProtocolEvent::RoleGranted { role, account });
        Ok(())
    }

    pub fn revoke_role(&mut self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.access.revoke_role(caller, role, account)?;
        self.emit(ProtocolEvent::RoleRevoked { role, account });
        Ok(())
    }

    /// new pool with its own collateral adapter
    pub fn init_collateral_pool(
        &mut self,
        caller: Address,
        pool: CollateralPoolId,
        params: CollateralPoolParams,
    ) -> Result<()> {
        if let Some(strategy) = params.strategy {
            self.liquidation_engine.strategy(strategy)?;
        }
        let adapter = CollateralTokenAdapter::new(pool);
        self.pools
            .init_collateral_pool(&self.access, caller, pool, adapter.address(), params, self.now)?;
        self.access.grant_unchecked(Role::Adapter, adapter.address());
        self.collateral_adapters.insert(pool, adapter);
        self.emit(ProtocolEvent::CollateralPoolInitialized { pool });
        Ok(())
    }

    pub fn set_pool_parameter(&mut self, caller: Address, pool: CollateralPoolId, parameter: PoolParameter) -> Result<()> {
        if let PoolParameter::Strategy(Some(strategy)) = parameter {
            self.liquidation_engine.strategy(strategy)?;
        }
        let name = parameter.name().to_string();
        self.pools.set_parameter(&self.access, caller, pool, parameter)?;
        self.emit(ProtocolEvent::PoolParameterSet { pool, parameter: name });
        Ok(())
    }

    pub fn set_total_debt_ceiling(&mut self, caller: Address, value: Rad) -> Result<()> {
        self.ledger.set_total_debt_ceiling(&self.access, caller, value)?;
        self.emit(ProtocolEvent::TotalDebtCeilingSet { value });
        Ok(())
    }

    // ---- prices

    /// attach a feed at `address`. owner only
    pub fn register_price_feed(&mut self, caller: Address, address: Address, feed: Arc<dyn PriceFeed>) -> Result<()> {
        self.access.require_role(Role::Owner, caller)?;
        self.feeds.register(address, feed)
    }

    /// refresh the safety-margined price of `pool`. open to anyone
    pub fn set_price(&mut self, pool: CollateralPoolId) -> Result<(Wad, Ray)> {
        let (price, price_with_safety_margin) =
            self.oracle
                .set_price(&self.access, &mut self.pools, &self.feeds, pool, self.now)?;
        self.emit(ProtocolEvent::PriceUpdated {
            pool,
            price,
            price_with_safety_margin,
        });
        Ok((price, price_with_safety_margin))
    }

    pub fn set_stablecoin_reference_price(&mut self, caller: Address, price: Ray) -> Result<()> {
        self.oracle.set_stablecoin_reference_price(&self.access, caller, price)
    }

    // ---- book keeper

    pub fn whitelist(&mut self, caller: Address, target: Address) {
        self.ledger.whitelist(caller, target);
    }

    pub fn blacklist(&mut self, caller: Address, target: Address) {
        self.ledger.blacklist(caller, target);
    }

    pub fn move_collateral(
        &mut self,
        caller: Address,
        pool: CollateralPoolId,
        src: Address,
        dst: Address,
        amount: Wad,
    ) -> Result<()> {
        self.ledger.move_collateral(caller, pool, src, dst, amount)?;
        self.emit(ProtocolEvent::CollateralMoved { pool, src, dst, amount });
        Ok(())
    }

    pub fn move_stablecoin(&mut self, caller: Address, src: Address, dst: Address, value: Rad) -> Result<()> {
        self.ledger.move_stablecoin(caller, src, dst, value)?;
        self.emit(ProtocolEvent::StablecoinMoved { src, dst, value });
        Ok(())
    }

    /// raw slot adjustment; drawing debt needs a healthy feed
    #[allow(clippy::too_many_arguments)]
    pub fn adjust_position(
        &mut self,
        caller: Address,
        pool: CollateralPoolId,
        position: Address,
        collateral_owner: Address,
        stablecoin_owner: Address,
        collateral_delta: i128,
        debt_share_delta: i128,
    ) -> Result<()> {
        if debt_share_delta > 0 {
            self.feeds.require_healthy(&self.pools, pool, self.now)?;
        }
        self.ledger.adjust_position(
            &mut self.pools,
            caller,
            pool,
            position,
            collateral_owner,
            stablecoin_owner,
            collateral_delta,
            debt_share_delta,
        )?;
        self.emit(ProtocolEvent::PositionAdjusted {
            pool,
            position,
            collateral_delta,
            debt_share_delta,
        });
        Ok(())
    }

    pub fn move_position(
        &mut self,
        caller: Address,
        pool: CollateralPoolId,
        src: Address,
        dst: Address,
        collateral_delta: i128,
        debt_share_delta: i128,
    ) -> Result<()> {
        self.ledger
            .move_position(&self.pools, caller, pool, src, dst, collateral_delta, debt_share_delta)?;
        self.emit(ProtocolEvent::PositionMoved {
            pool,
            src,
            dst,
            collateral_delta,
            debt_share_delta,
        });
        Ok(())
    }

    /// owner or mintable role
    pub fn mint_unbacked_stablecoin(
        &mut self,
        caller: Address,
        debt_dst: Address,
        coin_dst: Address,
        value: Rad,
    ) -> Result<()> {
        let authority = self.access.authorize(caller, &[Role::Owner, Role::Mintable])?;
        self.ledger
            .mint_unbacked_stablecoin(&authority, debt_dst, coin_dst, value)?;
        self.emit(ProtocolEvent::UnbackedStablecoinMinted {
            debt_dst,
            coin_dst,
            value,
        });
        Ok(())
    }

    // ---- adapters

    pub fn deposit_collateral(&mut self, caller: Address, pool: CollateralPoolId, usr: Address, amount: Wad) -> Result<()> {
        let adapter = self
            .collateral_adapters
            .get_mut(&pool)
            .ok_or(Error::CollateralPoolNotInit(pool))?;
        adapter.deposit(&self.access, &mut self.ledger, caller, usr, amount)?;
        self.emit(ProtocolEvent::CollateralDeposited {
            pool,
            account: usr,
            amount,
        });
        Ok(())
    }

    pub fn withdraw_collateral(&mut self, caller: Address, pool: CollateralPoolId, usr: Address, amount: Wad) -> Result<()> {
        let adapter = self
            .collateral_adapters
            .get_mut(&pool)
            .ok_or(Error::CollateralPoolNotInit(pool))?;
        adapter.withdraw(&self.access, &mut self.ledger, caller, usr, amount)?;
        self.emit(ProtocolEvent::CollateralWithdrawn {
            pool,
            account: caller,
            amount,
        });
        Ok(())
    }

    pub fn deposit_stablecoin(&mut self, caller: Address, usr: Address, amount: Wad) -> Result<()> {
        self.stablecoin_adapter.deposit(&mut self.ledger, caller, usr, amount)?;
        self.emit(ProtocolEvent::StablecoinDeposited { account: usr, amount });
        Ok(())
    }

    pub fn withdraw_stablecoin(&mut self, caller: Address, usr: Address, amount: Wad) -> Result<()> {
        self.stablecoin_adapter.withdraw(&mut self.ledger, caller, usr, amount)?;
        self.emit(ProtocolEvent::StablecoinWithdrawn {
            account: caller,
            amount,
        });
        Ok(())
    }

    // ---- position manager

    pub fn open_position(&mut self, pool: CollateralPoolId, owner: Address) -> Result<PositionId> {
        let id = self.position_manager.open(&mut self.ledger, &self.pools, pool, owner)?;
        let position = self.position_manager.position_address(id)?;
        self.emit(ProtocolEvent::PositionOpened {
            id,
            pool,
            owner,
            position,
        });
        Ok(id)
    }

    pub fn give(&mut self, caller: Address, id: PositionId, destination: Address) -> Result<()> {
        let from = self.position_manager.give(caller, id, destination)?;
        self.emit(ProtocolEvent::PositionTransferred {
            id,
            from,
            to: destination,
        });
        Ok(())
    }

    pub fn allow_manage_position(&mut self, caller: Address, id: PositionId, delegate: Address, ok: u8) -> Result<()> {
        let owner = self.position_manager.allow_manage_position(caller, id, delegate, ok)?;
        self.emit(ProtocolEvent::ManagePermissionSet {
            id,
            owner,
            delegate,
            allowed: ok == 1,
        });
        Ok(())
    }

    pub fn allow_migrate_position(&mut self, caller: Address, migrator: Address, ok: u8) -> Result<()> {
        self.position_manager.allow_migrate_position(caller, migrator, ok)?;
        self.emit(ProtocolEvent::MigrationPermissionSet {
            owner: caller,
            migrator,
            allowed: ok == 1,
        });
        Ok(())
    }

    /// lock/free collateral and draw/wipe debt on a managed position
    pub fn adjust_managed_position(
        &mut self,
        caller: Address,
        id: PositionId,
        collateral_delta: i128,
        debt_share_delta: i128,
    ) -> Result<()> {
        self.position_manager.adjust_position(
            &mut self.ledger,
            &mut self.pools,
            &self.feeds,
            caller,
            id,
            collateral_delta,
            debt_share_delta,
            self.now,
        )?;
        let pool = self.position_manager.collateral_pool(id)?;
        let position = self.position_manager.position_address(id)?;
        self.emit(ProtocolEvent::PositionAdjusted {
            pool,
            position,
            collateral_delta,
            debt_share_delta,
        });
        Ok(())
    }

    pub fn move_managed_collateral(
        &mut self,
        caller: Address,
        id: PositionId,
        destination: Address,
        amount: Wad,
    ) -> Result<()> {
        let pool = self.position_manager.collateral_pool(id)?;
        self.move_managed_collateral_from_pool(caller, pool, id, destination, amount)
    }

    /// free collateral of any pool sitting on the slot of `id`
    pub fn move_managed_collateral_from_pool(
        &mut self,
        caller: Address,
        pool: CollateralPoolId,
        id: PositionId,
        destination: Address,
        amount: Wad,
    ) -> Result<()> {
        self.position_manager
            .move_collateral_from_pool(&mut self.ledger, caller, pool, id, destination, amount)?;
        let src = self.position_manager.position_address(id)?;
        self.emit(ProtocolEvent::CollateralMoved {
            pool,
            src,
            dst: destination,
            amount,
        });
        Ok(())
    }

    pub fn move_managed_stablecoin(&mut self, caller: Address, id: PositionId, destination: Address, value: Rad) -> Result<()> {
        self.position_manager
            .move_stablecoin(&mut self.ledger, caller, id, destination, value)?;
        let src = self.position_manager.position_address(id)?;
        self.emit(ProtocolEvent::StablecoinMoved {
            src,
            dst: destination,
            value,
        });
        Ok(())
    }

    /// merge position `source` into `destination`
    pub fn move_managed_position(&mut self, caller: Address, source: PositionId, destination: PositionId) -> Result<()> {
        let pool = self.position_manager.collateral_pool(source)?;
        let src = self.position_manager.position_address(source)?;
        let dst = self.position_manager.position_address(destination)?;
        let moved = self.ledger.position(pool, src);
        let collateral_delta = moved.locked_collateral.to_delta()?;
        let debt_share_delta = moved.debt_share.to_delta()?;
        self.position_manager.move_position(
            &mut self.ledger,
            &self.pools,
            &self.feeds,
            caller,
            source,
            destination,
            self.now,
        )?;
        self.emit(ProtocolEvent::PositionMoved {
            pool,
            src,
            dst,
            collateral_delta,
            debt_share_delta,
        });
        Ok(())
    }

    pub fn export_position(&mut self, caller: Address, id: PositionId, destination: Address) -> Result<()> {
        self.position_manager.export_position(
            &mut self.ledger,
            &self.pools,
            &self.feeds,
            caller,
            id,
            destination,
            self.now,
        )?;
        self.emit(ProtocolEvent::PositionExported { id, destination });
        Ok(())
    }

    pub fn import_position(&mut self, caller: Address, source: Address, id: PositionId) -> Result<()> {
        self.position_manager.import_position(
            &mut self.ledger,
            &self.pools,
            &self.feeds,
            caller,
            source,
            id,
            self.now,
        )?;
        self.emit(ProtocolEvent::PositionImported { source, id });
        Ok(())
    }

    // ---- stability fees

    /// advance the rate of `pool` to the current time. open to anyone
    pub fn collect(&mut self, pool: CollateralPoolId) -> Result<Collection> {
        let collection = self
            .fee_collector
            .collect(&self.access, &mut self.ledger, &mut self.pools, pool, self.now)?;
        if !collection.accrued.is_zero() {
            self.emit(ProtocolEvent::StabilityFeeCollected {
                pool,
                debt_accumulated_rate: collection.debt_accumulated_rate,
                accrued: collection.accrued,
            });
        }
        Ok(collection)
    }

    pub fn set_global_stability_fee_rate(&mut self, caller: Address, rate: Ray) -> Result<()> {
        self.fee_collector
            .set_global_stability_fee_rate(&self.access, caller, rate)
    }

    // ---- liquidation

    pub fn whitelist_liquidator(&mut self, caller: Address, liquidator: Address) -> Result<()> {
        self.liquidation_engine
            .whitelist_liquidator(&self.access, caller, liquidator)?;
        self.emit(ProtocolEvent::LiquidatorWhitelisted {
            account: liquidator,
            allowed: true,
        });
        Ok(())
    }

    pub fn blacklist_liquidator(&mut self, caller: Address, liquidator: Address) -> Result<()> {
        self.liquidation_engine
            .blacklist_liquidator(&self.access, caller, liquidator)?;
        self.emit(ProtocolEvent::LiquidatorWhitelisted {
            account: liquidator,
            allowed: false,
        });
        Ok(())
    }

    /// make a strategy available to pools; it gets the liquidation role
    pub fn register_strategy(&mut self, caller: Address, strategy: Arc<dyn LiquidationStrategy>) -> Result<()> {
        let address = strategy.address();
        self.liquidation_engine
            .register_strategy(&self.access, caller, strategy)?;
        self.access.grant_unchecked(Role::LiquidationEngine, address);
        Ok(())
    }

    pub fn pause_liquidation(&mut self, caller: Address) -> Result<()> {
        self.liquidation_engine.pause(&self.access, caller)?;
        self.emit(ProtocolEvent::Paused {
            component: Component::LiquidationEngine,
        });
        Ok(())
    }

    pub fn unpause_liquidation(&mut self, caller: Address) -> Result<()> {
        self.liquidation_engine.unpause(&self.access, caller)?;
        self.emit(ProtocolEvent::Unpaused {
            component: Component::LiquidationEngine,
        });
        Ok(())
    }

    /// stop liquidations without a full shutdown. owner only
    pub fn cage_liquidation_engine(&mut self, caller: Address) -> Result<()> {
        let authority = self.access.authorize(caller, &[Role::Owner])?;
        self.liquidation_engine.cage(&authority)?;
        self.emit(ProtocolEvent::Caged {
            component: Component::LiquidationEngine,
        });
        Ok(())
    }

    pub fn uncage_liquidation_engine(&mut self, caller: Address) -> Result<()> {
        let authority = self.access.authorize(caller, &[Role::Owner])?;
        self.liquidation_engine.uncage(&authority)?;
        self.emit(ProtocolEvent::Uncaged {
            component: Component::LiquidationEngine,
        });
        Ok(())
    }

    fn liquidated_event(caller: Address, request: &LiquidationRequest, outcome: &LiquidationOutcome) -> ProtocolEvent {
        ProtocolEvent::Liquidated {
            pool: request.pool,
            position: request.position,
            liquidator: caller,
            collateral_recipient: request.collateral_recipient,
            debt_share_liquidated: outcome.debt_share_liquidated,
            debt_value_repaid: outcome.debt_value_repaid,
            collateral_seized: outcome.collateral_seized,
            treasury_fee: outcome.treasury_fee,
            bad_debt: outcome.bad_debt,
        }
    }

    pub fn liquidate(&mut self, caller: Address, request: &LiquidationRequest) -> Result<LiquidationOutcome> {
        let outcome = self.liquidation_engine.liquidate(
            &self.access,
            &mut self.ledger,
            &mut self.pools,
            &self.feeds,
            &self.oracle,
            caller,
            request,
            self.now,
        )?;
        self.emit(Self::liquidated_event(caller, request, &outcome));
        Ok(outcome)
    }

    /// each request succeeds or fails on its own
    pub fn batch_liquidate(
        &mut self,
        caller: Address,
        requests: &[LiquidationRequest],
    ) -> Vec<Result<LiquidationOutcome>> {
        let results = self.liquidation_engine.batch_liquidate(
            &self.access,
            &mut self.ledger,
            &mut self.pools,
            &self.feeds,
            &self.oracle,
            caller,
            requests,
            self.now,
        );
        for (request, result) in requests.iter().zip(&results) {
            let event = match result {
                Ok(outcome) => Self::liquidated_event(caller, request, outcome),
                Err(e) => ProtocolEvent::LiquidationFailed {
                    pool: request.pool,
                    position: request.position,
                    reason: e.to_string(),
                },
            };
            self.events.push(event);
        }
        results
    }

    // ---- system debt engine

    /// net the engine's surplus against its bad debt. open to anyone
    pub fn settle_system_bad_debt(&mut self, value: Rad) -> Result<()> {
        self.system_debt_engine
            .settle_system_bad_debt(&mut self.ledger, value)?;
        let account = self.system_debt_engine.address();
        self.emit(ProtocolEvent::SystemBadDebtSettled { account, value });
        Ok(())
    }

    pub fn set_surplus_buffer(&mut self, caller: Address, value: Rad) -> Result<()> {
        self.system_debt_engine
            .set_surplus_buffer(&self.access, caller, value)
    }

    pub fn withdraw_collateral_surplus(
        &mut self,
        caller: Address,
        pool: CollateralPoolId,
        to: Address,
        amount: Wad,
    ) -> Result<()> {
        self.system_debt_engine
            .withdraw_collateral_surplus(&self.access, &mut self.ledger, caller, pool, to, amount)?;
        self.emit(ProtocolEvent::SurplusWithdrawn {
            to,
            pool: Some(pool),
            collateral: amount,
            stablecoin: Rad::ZERO,
        });
        Ok(())
    }

    pub fn withdraw_stablecoin_surplus(&mut self, caller: Address, to: Address, value: Rad) -> Result<()> {
        self.system_debt_engine
            .withdraw_stablecoin_surplus(&self.access, &mut self.ledger, caller, to, value)?;
        self.emit(ProtocolEvent::SurplusWithdrawn {
            to,
            pool: None,
            collateral: Wad::ZERO,
            stablecoin: value,
        });
        Ok(())
    }

    // ---- global settlement

    pub fn set_cage_cool_down(&mut self, caller: Address, seconds: u64) -> Result<()> {
        self.show_stopper.set_cage_cool_down(&self.access, caller, seconds)
    }

    /// shut the whole system down. owner only, one way
    pub fn cage(&mut self, caller: Address) -> Result<()> {
        let targets = ShutdownTargets {
            ledger: &mut self.ledger,
            liquidation_engine: &mut self.liquidation_engine,
            system_debt_engine: &mut self.system_debt_engine,
            oracle: &mut self.oracle,
            adapters: self.collateral_adapters.values_mut().collect(),
        };
        self.show_stopper.cage(&self.access, caller, targets, self.now)?;
        for component in [
            Component::BookKeeper,
            Component::LiquidationEngine,
            Component::SystemDebtEngine,
            Component::PriceOracle,
            Component::CollateralAdapter,
            Component::ShowStopper,
        ] {
            self.events.push(ProtocolEvent::Caged { component });
        }
        Ok(())
    }

    pub fn cage_collateral_pool(&mut self, caller: Address, pool: CollateralPoolId) -> Result<Ray> {
        let cage_price =
            self.show_stopper
                .cage_collateral_pool(&self.access, caller, &self.pools, &self.feeds, &self.oracle, pool)?;
        let total_debt_share = self.show_stopper.total_debt_share(pool).unwrap_or_default();
        self.emit(ProtocolEvent::CollateralPoolCaged {
            pool,
            cage_price,
            total_debt_share,
        });
        Ok(cage_price)
    }

    /// settle one position against the cage price. open to anyone
    pub fn accumulate_bad_debt(&mut self, pool: CollateralPoolId, position: Address) -> Result<BadDebtAccumulation> {
        let settled = self.show_stopper.accumulate_bad_debt(
            &self.access,
            &mut self.ledger,
            &mut self.pools,
            pool,
            position,
        )?;
        self.emit(ProtocolEvent::BadDebtAccumulated {
            pool,
            position,
            collateral: settled.collateral,
            debt_share: settled.debt_share,
            shortfall: settled.shortfall,
        });
        Ok(settled)
    }

    /// free the collateral of a debt-free slot after shutdown
    pub fn redeem_locked_collateral(
        &mut self,
        caller: Address,
        pool: CollateralPoolId,
        position: Address,
        receiver: Address,
    ) -> Result<Wad> {
        let amount = self.show_stopper.redeem_locked_collateral(
            &self.access,
            &mut self.ledger,
            &mut self.pools,
            caller,
            pool,
            position,
            receiver,
        )?;
        self.emit(ProtocolEvent::LockedCollateralRedeemed {
            pool,
            position,
            receiver,
            amount,
        });
        Ok(amount)
    }

    /// [`redeem_locked_collateral`](Self::redeem_locked_collateral) for a
    /// managed position, by its owner or a delegate
    pub fn redeem_managed_collateral(&mut self, caller: Address, id: PositionId, receiver: Address) -> Result<Wad> {
        let (pool, position) = self.position_manager.redeemable_slot(caller, id)?;
        let manager = self.position_manager.address();
        self.redeem_locked_collateral(manager, pool, position, receiver)
    }

    pub fn finalize_debt(&mut self) -> Result<Rad> {
        let debt = self.show_stopper.finalize_debt(&self.ledger, self.now)?;
        self.emit(ProtocolEvent::DebtFinalized { debt, at: self.now });
        Ok(debt)
    }

    pub fn finalize_cash_price(&mut self, pool: CollateralPoolId) -> Result<Ray> {
        let final_cash_price = self.show_stopper.finalize_cash_price(&self.pools, pool)?;
        self.emit(ProtocolEvent::CashPriceFinalized {
            pool,
            final_cash_price,
        });
        Ok(final_cash_price)
    }

    /// lock stablecoin for redemption; the caller must have whitelisted the
    /// show stopper
    pub fn accumulate_stablecoin(&mut self, caller: Address, amount: Wad) -> Result<()> {
        self.show_stopper
            .accumulate_stablecoin(&mut self.ledger, caller, amount)?;
        self.emit(ProtocolEvent::StablecoinAccumulated {
            account: caller,
            amount,
        });
        Ok(())
    }

    pub fn redeem_stablecoin(&mut self, caller: Address, pool: CollateralPoolId, amount: Wad) -> Result<Wad> {
        let collateral = self
            .show_stopper
            .redeem_stablecoin(&mut self.ledger, caller, pool, amount)?;
        self.emit(ProtocolEvent::StablecoinRedeemed {
            pool,
            account: caller,
            amount,
            collateral,
        });
        Ok(collateral)
    }
}
