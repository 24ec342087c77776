//! price feeds and the price oracle
//!
//! feeds are external collaborators: they hand out a price and a freshness
//! flag and nothing else. the oracle turns a feed price into the
//! safety-margined price the ledger checks positions against:
//!
//! ```text
//!   price_with_safety_margin = price * 1e9 / reference_price / liquidation_ratio
//!                              (wad -> ray)  (ray)             (ray)
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use ballast_math::{Ray, Wad, BLN};
use tracing::{debug, warn};

use crate::access::{AccessControl, Authority, Role};
use crate::collateral_pool::CollateralPoolConfig;
use crate::error::{Error, Result};
use crate::types::{Address, CollateralPoolId, Timestamp};

/// source of a collateral price in stablecoin terms
pub trait PriceFeed: Send + Sync + fmt::Debug {
    /// last known price, fresh or not
    fn read_price(&self) -> Wad;

    /// price and whether it may be acted on at `now`
    fn peek_price(&self, now: Timestamp) -> (Wad, bool);

    fn is_price_ok(&self, now: Timestamp) -> bool {
        self.peek_price(now).1
    }
}

#[derive(Debug, Clone, Copy)]
struct FeedState {
    price: Wad,
    last_update: Timestamp,
    price_life: u64,
    paused: bool,
}

/// settable feed with a staleness window
///
/// the price is ok while it is non-zero, the feed is not paused and less
/// than `price_life` seconds have passed since the last update.
#[derive(Debug)]
pub struct SimplePriceFeed {
    state: RwLock<FeedState>,
}

impl SimplePriceFeed {
    pub fn new(price: Wad, now: Timestamp, price_life: u64) -> Self {
        Self {
            state: RwLock::new(FeedState {
                price,
                last_update: now,
                price_life,
                paused: false,
            }),
        }
    }

    pub fn shared(price: Wad, now: Timestamp, price_life: u64) -> Arc<Self> {
        Arc::new(Self::new(price, now, price_life))
    }

    fn snapshot(&self) -> FeedState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut FeedState)) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }

    pub fn set_price(&self, price: Wad, now: Timestamp) {
        self.update(|s| {
            s.price = price;
            s.last_update = now;
        });
    }

    pub fn set_price_life(&self, price_life: u64) {
        self.update(|s| s.price_life = price_life);
    }

    pub fn pause(&self) {
        self.update(|s| s.paused = true);
    }

    pub fn unpause(&self) {
        self.update(|s| s.paused = false);
    }
}

impl PriceFeed for SimplePriceFeed {
    fn read_price(&self) -> Wad {
        self.snapshot().price
    }

    fn peek_price(&self, now: Timestamp) -> (Wad, bool) {
        let s = self.snapshot();
        let fresh = now.saturating_sub(s.last_update) < s.price_life;
        (s.price, fresh && !s.paused && !s.price.is_zero())
    }
}

/// feeds by address
#[derive(Debug, Clone, Default)]
pub struct PriceFeedRegistry {
    feeds: BTreeMap<Address, Arc<dyn PriceFeed>>,
}

impl PriceFeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, address: Address, feed: Arc<dyn PriceFeed>) -> Result<()> {
        if address.is_zero() {
            return Err(Error::ZeroAddress);
        }
        self.feeds.insert(address, feed);
        Ok(())
    }

    pub fn get(&self, address: Address) -> Result<&Arc<dyn PriceFeed>> {
        self.feeds.get(&address).ok_or(Error::UnknownPriceFeed)
    }

    /// unknown feeds are never ok
    pub fn is_price_ok(&self, address: Address, now: Timestamp) -> bool {
        self.feeds.get(&address).is_some_and(|feed| feed.is_price_ok(now))
    }

    /// fail with `PriceNotHealthy` unless the pool's feed is ok
    pub fn require_healthy(&self, pools: &CollateralPoolConfig, pool_id: CollateralPoolId, now: Timestamp) -> Result<()> {
        let feed = pools.get(pool_id)?.price_feed;
        if self.is_price_ok(feed, now) {
            Ok(())
        } else {
            Err(Error::PriceNotHealthy)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceOracle {
    address: Address,
    live: bool,
    stablecoin_reference_price: Ray,
}

impl PriceOracle {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            live: true,
            stablecoin_reference_price: Ray::one(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn stablecoin_reference_price(&self) -> Ray {
        self.stablecoin_reference_price
    }

    pub fn set_stablecoin_reference_price(&mut self, access: &AccessControl, caller: Address, price: Ray) -> Result<()> {
        access.require_role(Role::Owner, caller)?;
        if !self.live {
            return Err(Error::NotLive);
        }
        if price.is_zero() {
            return Err(Error::InvalidParameter("zero reference price"));
        }
        self.stablecoin_reference_price = price;
        Ok(())
    }

    /// feed price lifted to ray and expressed in reference units
    pub fn collateral_price(&self, feed_price: Wad) -> Result<Ray> {
        let lifted = Ray::from_raw(ballast_math::ops::mul(feed_price.raw(), BLN)?);
        Ok(lifted.rdiv(self.stablecoin_reference_price)?)
    }

    /// refresh a pool's safety-margined price from its feed
    ///
    /// a feed that is not ok zeroes the price, which blocks new debt in that
    /// pool until the feed recovers.
    pub fn set_price(
        &self,
        access: &AccessControl,
        pools: &mut CollateralPoolConfig,
        feeds: &PriceFeedRegistry,
        pool_id: CollateralPoolId,
        now: Timestamp,
    ) -> Result<(Wad, Ray)> {
        if !self.live {
            return Err(Error::NotLive);
        }
        let authority = access.authorize(self.address, &[Role::PriceOracle])?;
        let pool = pools.get(pool_id)?;
        let (price, ok) = feeds.get(pool.price_feed)?.peek_price(now);

        let price_with_safety_margin = if ok {
            self.collateral_price(price)?.rdiv(pool.liquidation_ratio)?
        } else {
            warn!(pool = %pool_id, "price feed not ok, zeroing safety price");
            Ray::ZERO
        };

        pools.set_price_with_safety_margin(&authority, pool_id, price_with_safety_margin)?;
        debug!(pool = %pool_id, %price, %price_with_safety_margin, "price updated");
        Ok((price, price_with_safety_margin))
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collateral_pool::CollateralPoolParams;
    use ballast_math::Rad;

    #[test]
    fn test_simple_feed_staleness() {
        let feed = SimplePriceFeed::new(Wad::one(), 100, 60);
        assert!(feed.is_price_ok(100));
        assert!(feed.is_price_ok(159));
        assert!(!feed.is_price_ok(160));

        feed.set_price(Wad::from_units(2).unwrap(), 200);
        assert_eq!(feed.peek_price(210), (Wad::from_units(2).unwrap(), true));

        feed.pause();
        assert!(!feed.is_price_ok(210));
        assert_eq!(feed.read_price(), Wad::from_units(2).unwrap());
    }

    #[test]
    fn test_zero_price_is_not_ok() {
        let feed = SimplePriceFeed::new(Wad::ZERO, 0, 60);
        assert!(!feed.is_price_ok(0));
    }

    #[test]
    fn test_set_price_applies_margin() {
        let owner = Address::system("owner");
        let oracle_addr = Address::system("price-oracle");
        let feed_addr = Address::system("feed");
        let mut access = AccessControl::new(owner);
        access.grant_unchecked(Role::PriceOracle, oracle_addr);

        let pool = CollateralPoolId::from_name("WXDC");
        let mut pools = CollateralPoolConfig::new();
        pools
            .init_collateral_pool(
                &access,
                owner,
                pool,
                Address::system("adapter"),
                CollateralPoolParams {
                    debt_ceiling: Rad::ZERO,
                    debt_floor: Rad::ZERO,
                    position_debt_ceiling: Rad::ZERO,
                    price_feed: feed_addr,
                    // 150%
                    liquidation_ratio: Ray::from_raw(Ray::one().raw() * 3 / 2),
                    stability_fee_rate: Ray::one(),
                    close_factor_bps: 10_000,
                    liquidator_incentive_bps: 10_000,
                    treasury_fees_bps: 0,
                    strategy: None,
                },
                0,
            )
            .unwrap();

        let feed = SimplePriceFeed::shared(Wad::from_units(3).unwrap(), 0, 3600);
        let mut feeds = PriceFeedRegistry::new();
        feeds.register(feed_addr, feed.clone()).unwrap();

        let oracle = PriceOracle::new(oracle_addr);
        let (_, margin) = oracle.set_price(&access, &mut pools, &feeds, pool, 10).unwrap();
        assert_eq!(margin, Ray::from_units(2).unwrap());
        assert_eq!(pools.get(pool).unwrap().price_with_safety_margin, margin);

        // stale feed zeroes the price
        let (_, margin) = oracle.set_price(&access, &mut pools, &feeds, pool, 7200).unwrap();
        assert!(margin.is_zero());
    }
}
