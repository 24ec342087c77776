//! deterministic seeded fuzzer
//!
//! random operation sequences over two pools and a handful of accounts.
//! after every step the ledger must balance; after every failed step the
//! state must be exactly what it was before and no event may be left
//! behind. run more seeds with `BALLAST_FUZZ_SEEDS=500 cargo test --test fuzz`.

mod common;

use ballast_core::{LiquidationRequest, PoolParameter, PositionId, Ray, Wad};
use common::{rad, user, wad, wad_frac, Fixture};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const STEPS: usize = 200;

#[derive(Debug, Clone)]
enum Action {
    Open { pool: usize, user: usize },
    Deposit { user: usize, position: usize, amount: Wad },
    Adjust { user: usize, position: usize, collateral: i128, debt: i128 },
    TakeStablecoin { user: usize, position: usize, value: u128 },
    Give { user: usize, position: usize, to: usize },
    Reprice { pool: usize, price: Wad },
    Advance { seconds: u64, pool: usize },
    Liquidate { position: usize, share: Wad },
}

struct World {
    f: Fixture,
    pools: Vec<ballast_core::CollateralPoolId>,
    feeds: Vec<std::sync::Arc<ballast_core::SimplePriceFeed>>,
    users: Vec<ballast_core::Address>,
    positions: Vec<PositionId>,
    keeper: ballast_core::Address,
}

impl World {
    fn new() -> Self {
        let mut f = Fixture::new();
        let (second, second_feed) = f.add_pool("USDT", wad(1));
        // 5% a year on the first pool
        let five_percent: Ray = "1000000001547125957863212448".parse().unwrap();
        f.protocol
            .set_pool_parameter(f.owner, f.pool, PoolParameter::StabilityFeeRate(five_percent))
            .unwrap();
        let keeper = f.liquidator("keeper", rad(1_000_000));
        let pools = vec![f.pool, second];
        let feeds = vec![f.feed.clone(), second_feed];
        f.protocol.drain_events();
        Self {
            f,
            pools,
            feeds,
            users: ["alice", "bob", "carol"].iter().map(|n| user(n)).collect(),
            positions: Vec::new(),
            keeper,
        }
    }

    fn random_action(&self, rng: &mut ChaCha8Rng) -> Action {
        let user = rng.gen_range(0..self.users.len());
        let position = rng.gen_range(0..self.positions.len().max(1));
        let pool = rng.gen_range(0..self.pools.len());
        match rng.gen_range(0..16) {
            0..=1 => Action::Open { pool, user },
            2..=4 => Action::Deposit {
                user,
                position,
                amount: wad(rng.gen_range(1..5_000)),
            },
            5..=8 => {
                let collateral = wad(rng.gen_range(0..3_000)).to_delta().unwrap();
                let debt = wad(rng.gen_range(0..2_000)).to_delta().unwrap();
                Action::Adjust {
                    user,
                    position,
                    collateral: if rng.gen_bool(0.3) { -collateral } else { collateral },
                    debt: if rng.gen_bool(0.4) { -debt } else { debt },
                }
            }
            9 => Action::TakeStablecoin {
                user,
                position,
                value: rng.gen_range(1..1_000),
            },
            10 => Action::Give {
                user,
                position,
                to: rng.gen_range(0..self.users.len()),
            },
            11..=12 => Action::Reprice {
                pool,
                price: wad_frac(rng.gen_range(30..150), 2),
            },
            13 => Action::Advance {
                seconds: rng.gen_range(1..3_000),
                pool,
            },
            _ => Action::Liquidate {
                position,
                share: wad(rng.gen_range(1..2_000)),
            },
        }
    }

    fn apply(&mut self, action: &Action) -> ballast_core::Result<()> {
        let protocol = &mut self.f.protocol;
        match *action {
            Action::Open { pool, user } => {
                let opened = protocol.open_position(self.pools[pool], self.users[user])?;
                self.positions.push(opened);
                Ok(())
            }
            Action::Deposit { user, position, amount } => {
                let id = pick(&self.positions, position);
                let pool = protocol.position_manager().collateral_pool(id)?;
                let slot = protocol.position_manager().position_address(id)?;
                protocol.deposit_collateral(self.users[user], pool, slot, amount)
            }
            Action::Adjust {
                user,
                position,
                collateral,
                debt,
            } => protocol.adjust_managed_position(self.users[user], pick(&self.positions, position), collateral, debt),
            Action::TakeStablecoin { user, position, value } => {
                protocol.move_managed_stablecoin(self.users[user], pick(&self.positions, position), self.users[user], rad(value))
            }
            Action::Give { user, position, to } => protocol.give(self.users[user], pick(&self.positions, position), self.users[to]),
            Action::Reprice { pool, price } => {
                self.feeds[pool].set_price(price, protocol.now());
                protocol.set_price(self.pools[pool]).map(|_| ())
            }
            Action::Advance { pool, .. } => protocol.collect(self.pools[pool]).map(|_| ()),
            Action::Liquidate { position, share } => {
                let id = pick(&self.positions, position);
                let pool = protocol.position_manager().collateral_pool(id)?;
                let slot = protocol.position_manager().position_address(id)?;
                let request = LiquidationRequest::new(pool, slot, share, self.keeper);
                protocol.liquidate(self.keeper, &request).map(|_| ())
            }
        }
    }
}

/// an unknown id when nothing is open yet
fn pick(positions: &[PositionId], index: usize) -> PositionId {
    positions.get(index).copied().unwrap_or(PositionId(u64::MAX))
}

fn run_seed(seed: u64) {
    let mut world = World::new();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    for step in 0..STEPS {
        let action = world.random_action(&mut rng);
        if let Action::Advance { seconds, .. } = action {
            world.f.advance(seconds);
        }

        let before = world.f.protocol.snapshot();
        let result = world.apply(&action);
        let events = world.f.protocol.drain_events();

        if let Err(violation) = world.f.protocol.check_conservation() {
            panic!("seed {seed} step {step} {action:?}: conservation broken: {violation}");
        }
        if let Err(e) = result {
            assert_eq!(
                world.f.protocol.snapshot(),
                before,
                "seed {seed} step {step} {action:?} failed with {e} but changed state"
            );
            assert!(events.is_empty(), "seed {seed} step {step} {action:?} failed but emitted {events:?}");
        }
    }
}

#[test]
fn fuzz_deterministic_seeds() {
    let seeds = std::env::var("BALLAST_FUZZ_SEEDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(32u64);
    for seed in 0..seeds {
        run_seed(seed);
    }
}
