//! error types for the ballast ledger
//!
//! every rejection is explicit and distinguishable. a call that returns an
//! error has not mutated any state.

use core::fmt;

use ballast_math::MathError;
use thiserror::Error;

use crate::access::Role;
use crate::types::{CollateralPoolId, PositionId};

/// which ceiling an adjustment ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ceiling {
    Pool,
    Global,
    Position,
}

impl fmt::Display for Ceiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ceiling::Pool => f.write_str("pool"),
            Ceiling::Global => f.write_str("global"),
            Ceiling::Position => f.write_str("position"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // authorization
    #[error("owner not allowed")]
    OwnerNotAllowed,

    #[error("migration not allowed")]
    MigrationNotAllowed,

    #[error("liquidator not whitelisted")]
    NotWhitelisted,

    #[error("missing role: {0:?}")]
    MissingRole(Role),

    // invariants
    #[error("position not safe")]
    NotSafe,

    #[error("{0} debt ceiling exceeded")]
    CeilingExceeded(Ceiling),

    #[error("position debt below debt floor")]
    BelowFloor,

    #[error("different collateral pool")]
    DifferentCollateralPool,

    #[error("insufficient free collateral")]
    InsufficientCollateral,

    #[error("insufficient stablecoin")]
    InsufficientStablecoin,

    #[error("insufficient system bad debt")]
    InsufficientBadDebt,

    // staleness
    #[error("price not healthy")]
    PriceNotHealthy,

    #[error("invalid price")]
    InvalidPrice,

    // lifecycle
    #[error("not live")]
    NotLive,

    #[error("paused")]
    Paused,

    #[error("still live")]
    StillLive,

    #[error("timestamp went backwards: {now} < {last}")]
    TimestampWentBackwards { now: u64, last: u64 },

    // liquidation
    #[error("position is safe")]
    PositionSafe,

    #[error("no liquidation strategy set")]
    NotSetStrategy,

    #[error("zero debt value to be liquidated")]
    ZeroDebtValue,

    #[error("zero collateral amount")]
    ZeroCollateralAmount,

    #[error("debt not liquidated")]
    DebtNotLiquidated,

    #[error("payment not received")]
    PaymentNotReceived,

    #[error("collateral to seize exceeds maximum")]
    ExceedsMaxCollateralToSeize,

    // settlement
    #[error("insufficient stablecoin accumulator balance")]
    InsufficientStablecoinAccumulatorBalance,

    #[error("cage price already defined for {0}")]
    CagePriceAlreadySet(CollateralPoolId),

    #[error("cage price not defined for {0}")]
    CagePriceNotSet(CollateralPoolId),

    #[error("debt already finalized")]
    DebtAlreadyFinalized,

    #[error("debt not finalized")]
    DebtNotFinalized,

    #[error("surplus not zero")]
    SurplusNotZero,

    #[error("cage cool down not elapsed")]
    CoolDownNotElapsed,

    #[error("final cash price already defined for {0}")]
    CashPriceAlreadySet(CollateralPoolId),

    #[error("final cash price not defined for {0}")]
    CashPriceNotSet(CollateralPoolId),

    #[error("position debt not zero")]
    PositionDebtNotZero,

    #[error("system bad debt remaining")]
    BadDebtRemaining,

    #[error("insufficient surplus")]
    InsufficientSurplus,

    // setup
    #[error("zero address")]
    ZeroAddress,

    #[error("collateral pool not initialized: {0}")]
    CollateralPoolNotInit(CollateralPoolId),

    #[error("collateral pool already initialized: {0}")]
    CollateralPoolAlreadyInit(CollateralPoolId),

    #[error("position not found: {0}")]
    PositionNotFound(PositionId),

    #[error("invalid ok value: {0}")]
    InvalidOk(u8),

    #[error("destination is the current owner")]
    SameOwner,

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("price feed not registered")]
    UnknownPriceFeed,

    #[error("liquidation strategy not registered")]
    UnknownStrategy,

    #[error("config error: {0}")]
    Config(String),

    #[error("math error: {0}")]
    Math(#[from] MathError),
}

pub type Result<T> = std::result::Result<T, Error>;
