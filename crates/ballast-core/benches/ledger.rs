//! hot paths of the ledger
//!
//! Run with: cargo bench -p ballast-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ballast_core::{Address, CollateralPoolId, CollateralPoolParams, PositionId, Protocol, Rad, Ray, SimplePriceFeed, Wad};

const START: u64 = 1_700_000_000;

fn wad(n: u128) -> Wad {
    Wad::from_units(n).unwrap()
}

fn rad(n: u128) -> Rad {
    Rad::from_units(n).unwrap()
}

/// one pool at 5% a year with `positions` open positions
fn setup(positions: usize) -> (Protocol, CollateralPoolId, Vec<PositionId>) {
    let owner = Address::system("owner");
    let mut protocol = Protocol::new(owner, START).unwrap();
    protocol.set_total_debt_ceiling(owner, rad(u64::MAX as u128)).unwrap();

    let pool = CollateralPoolId::from_name("WXDC");
    let feed = Address::system("feed/WXDC");
    protocol
        .register_price_feed(owner, feed, SimplePriceFeed::shared(wad(1), START, u64::MAX))
        .unwrap();
    let strategy = Some(protocol.fixed_spread_strategy());
    protocol
        .init_collateral_pool(
            owner,
            pool,
            CollateralPoolParams {
                debt_ceiling: rad(u64::MAX as u128),
                debt_floor: Rad::ZERO,
                position_debt_ceiling: rad(u64::MAX as u128),
                price_feed: feed,
                liquidation_ratio: Ray::one(),
                stability_fee_rate: "1000000001547125957863212448".parse().unwrap(),
                close_factor_bps: 5_000,
                liquidator_incentive_bps: 10_500,
                treasury_fees_bps: 8_000,
                strategy,
            },
        )
        .unwrap();
    protocol.set_price(pool).unwrap();

    let user = Address::system("user/alice");
    let ids = (0..positions)
        .map(|_| {
            let id = protocol.open_position(pool, user).unwrap();
            let slot = protocol.position_manager().position_address(id).unwrap();
            protocol.deposit_collateral(user, pool, slot, wad(1_000)).unwrap();
            protocol
                .adjust_managed_position(user, id, wad(1_000).to_delta().unwrap(), wad(100).to_delta().unwrap())
                .unwrap();
            id
        })
        .collect();
    protocol.drain_events();
    (protocol, pool, ids)
}

fn bench_collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect");
    for positions in [1usize, 1_000] {
        let (mut protocol, pool, _) = setup(positions);
        group.bench_function(BenchmarkId::new("positions", positions), |b| {
            b.iter(|| {
                let now = protocol.now() + 60;
                protocol.set_timestamp(now).unwrap();
                black_box(protocol.collect(pool).unwrap());
                protocol.drain_events();
            })
        });
    }
    group.finish();
}

fn bench_adjust_position(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjust_position");
    let (mut protocol, _, ids) = setup(1_000);
    let user = Address::system("user/alice");
    let id = ids[ids.len() / 2];
    let step = wad(1).to_delta().unwrap();

    group.bench_function("draw_and_wipe", |b| {
        b.iter(|| {
            protocol.adjust_managed_position(user, id, 0, black_box(step)).unwrap();
            protocol.adjust_managed_position(user, id, 0, black_box(-step)).unwrap();
            protocol.drain_events();
        })
    });
    group.finish();
}

criterion_group!(benches, bench_collect, bench_adjust_position);
criterion_main!(benches);
