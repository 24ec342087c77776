//! shared fixture for the integration suites

#![allow(dead_code)]

use std::sync::{Arc, Once};

use ballast_core::{
    Address, CollateralPoolId, CollateralPoolParams, PositionId, Protocol, Rad, Ray, SimplePriceFeed, Wad,
};

pub const START: u64 = 1_700_000_000;
pub const PRICE_LIFE: u64 = 3_600;

static TRACING: Once = Once::new();

/// `RUST_LOG=ballast_core=debug cargo test` to see the state transitions
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "ballast_core=warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn wad(n: u128) -> Wad {
    Wad::from_units(n).unwrap()
}

pub fn rad(n: u128) -> Rad {
    Rad::from_units(n).unwrap()
}

pub fn ray(n: u128) -> Ray {
    Ray::from_units(n).unwrap()
}

/// `n / 10^decimals` as a wad
pub fn wad_frac(n: u128, decimals: u32) -> Wad {
    Wad::from_raw_u128(n * 10u128.pow(18 - decimals))
}

pub fn user(name: &str) -> Address {
    Address::system(&format!("user/{name}"))
}

pub struct Fixture {
    pub protocol: Protocol,
    pub owner: Address,
    pub pool: CollateralPoolId,
    pub feed: Arc<SimplePriceFeed>,
    pub feed_address: Address,
}

pub fn pool_params(feed: Address, strategy: Option<Address>) -> CollateralPoolParams {
    CollateralPoolParams {
        debt_ceiling: rad(1_000_000),
        debt_floor: Rad::ZERO,
        position_debt_ceiling: rad(1_000_000),
        price_feed: feed,
        liquidation_ratio: Ray::one(),
        stability_fee_rate: Ray::one(),
        close_factor_bps: 5_000,
        liquidator_incentive_bps: 10_500,
        treasury_fees_bps: 8_000,
        strategy,
    }
}

impl Fixture {
    /// one pool "WXDC" priced at 1, liquidation ratio 1, fixed spread
    /// strategy attached
    pub fn new() -> Self {
        init_tracing();
        let owner = user("owner");
        let mut protocol = Protocol::new(owner, START).unwrap();
        protocol.set_total_debt_ceiling(owner, rad(10_000_000)).unwrap();

        let fixture_pool = CollateralPoolId::from_name("WXDC");
        let feed_address = Address::system("feed/WXDC");
        let feed = SimplePriceFeed::shared(wad(1), START, PRICE_LIFE);
        protocol
            .register_price_feed(owner, feed_address, feed.clone())
            .unwrap();
        let strategy = Some(protocol.fixed_spread_strategy());
        protocol
            .init_collateral_pool(owner, fixture_pool, pool_params(feed_address, strategy))
            .unwrap();
        protocol.set_price(fixture_pool).unwrap();
        protocol.drain_events();

        Self {
            protocol,
            owner,
            pool: fixture_pool,
            feed,
            feed_address,
        }
    }

    /// add a second pool with its own feed
    pub fn add_pool(&mut self, name: &str, price: Wad) -> (CollateralPoolId, Arc<SimplePriceFeed>) {
        let pool = CollateralPoolId::from_name(name);
        let feed_address = Address::system(&format!("feed/{name}"));
        let feed = SimplePriceFeed::shared(price, self.protocol.now(), PRICE_LIFE);
        self.protocol
            .register_price_feed(self.owner, feed_address, feed.clone())
            .unwrap();
        let strategy = Some(self.protocol.fixed_spread_strategy());
        self.protocol
            .init_collateral_pool(self.owner, pool, pool_params(feed_address, strategy))
            .unwrap();
        self.protocol.set_price(pool).unwrap();
        (pool, feed)
    }

    /// move the feed and push the new price into the pool
    pub fn reprice(&mut self, price: Wad) {
        self.feed.set_price(price, self.protocol.now());
        self.protocol.set_price(self.pool).unwrap();
    }

    pub fn advance(&mut self, seconds: u64) {
        let now = self.protocol.now() + seconds;
        self.protocol.set_timestamp(now).unwrap();
    }

    /// open a managed position in `pool`, lock `collateral` and draw `debt`
    pub fn open_in(&mut self, pool: CollateralPoolId, owner: Address, collateral: Wad, debt: Wad) -> PositionId {
        let id = self.protocol.open_position(pool, owner).unwrap();
        let slot = self.protocol.position_manager().position_address(id).unwrap();
        if !collateral.is_zero() {
            self.protocol.deposit_collateral(owner, pool, slot, collateral).unwrap();
        }
        self.protocol
            .adjust_managed_position(owner, id, collateral.to_delta().unwrap(), debt.to_delta().unwrap())
            .unwrap();
        id
    }

    pub fn open(&mut self, owner: Address, collateral: Wad, debt: Wad) -> PositionId {
        self.open_in(self.pool, owner, collateral, debt)
    }

    pub fn slot(&self, id: PositionId) -> Address {
        self.protocol.position_manager().position_address(id).unwrap()
    }

    /// whitelisted liquidator holding `funds` of stablecoin that already
    /// trusts the fixed spread strategy
    pub fn liquidator(&mut self, name: &str, funds: Rad) -> Address {
        let liquidator = user(name);
        let reserve = Address::system("reserve");
        self.protocol.whitelist_liquidator(self.owner, liquidator).unwrap();
        self.protocol
            .mint_unbacked_stablecoin(self.owner, reserve, liquidator, funds)
            .unwrap();
        let strategy = self.protocol.fixed_spread_strategy();
        self.protocol.whitelist(liquidator, strategy);
        liquidator
    }

    pub fn assert_conserved(&self) {
        if let Err(violation) = self.protocol.check_conservation() {
            panic!("conservation broken: {violation}");
        }
    }
}
