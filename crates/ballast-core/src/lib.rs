//! ballast core - collateral-backed stablecoin ledger
//!
//! users lock collateral into positions and draw stablecoin against it.
//! every balance lives in one double-entry ledger; the other components only
//! reach it through its checked surface or, for forced writes, through a
//! role capability.
//!
//! ```text
//!                 adapters (collateral / stablecoin)
//!                               │
//!   position manager ──► book keeper ◄── stability fee collector
//!         (ids)             │    ▲               (rate)
//!                           │    │
//!              price oracle ┘    └── liquidation engine ──► strategy
//!          (safety price)        │        (fixed spread)
//!                                │
//!                          show stopper ──► system debt engine
//!                     (global settlement)    (surplus / bad debt)
//! ```
//!
//! all amounts are fixed point integers from `ballast-math`: collateral and
//! debt shares in wad (1e18), rates and prices in ray (1e27), stablecoin and
//! debt values in rad (1e45). [`Protocol`] wires everything together.

pub mod access;
pub mod adapter;
pub mod collateral_pool;
pub mod config;
pub mod error;
pub mod events;
pub mod fee_collector;
pub mod ledger;
pub mod liquidation;
pub mod position_manager;
pub mod price;
pub mod protocol;
pub mod show_stopper;
pub mod system_debt_engine;
pub mod types;

pub use access::{AccessControl, Authority, Role};
pub use adapter::{CollateralTokenAdapter, StablecoinAdapter};
pub use collateral_pool::{CollateralPool, CollateralPoolConfig, CollateralPoolParams, PoolParameter};
pub use config::{CollateralPoolSpec, ProtocolConfig};
pub use error::{Ceiling, Error, Result};
pub use events::{Component, ProtocolEvent};
pub use fee_collector::{Collection, StabilityFeeCollector};
pub use ledger::{with_rollback, BookKeeper, Position};
pub use liquidation::{
    calculate_liquidation, FixedSpreadLiquidationStrategy, LiquidationContext, LiquidationEngine, LiquidationInfo,
    LiquidationOutcome, LiquidationRequest, LiquidationStrategy,
};
pub use position_manager::{OwnerList, PositionManager, PositionPage};
pub use price::{PriceFeed, PriceFeedRegistry, PriceOracle, SimplePriceFeed};
pub use protocol::{Protocol, Snapshot};
pub use show_stopper::{BadDebtAccumulation, ShowStopper, ShutdownTargets};
pub use system_debt_engine::SystemDebtEngine;
pub use types::{Address, CollateralPoolId, PositionId, Timestamp};

pub use ballast_math::{Rad, Ray, Wad};
