//! protocol events
//!
//! the facade records one event per successful state transition; failed
//! calls record nothing. hosts drain the buffer after each call.

use ballast_math::{Rad, Ray, Wad};
use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::types::{Address, CollateralPoolId, PositionId, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    BookKeeper,
    LiquidationEngine,
    PriceOracle,
    SystemDebtEngine,
    ShowStopper,
    CollateralAdapter,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolEvent {
    RoleGranted {
        role: Role,
        account: Address,
    },
    RoleRevoked {
        role: Role,
        account: Address,
    },
    CollateralPoolInitialized {
        pool: CollateralPoolId,
    },
    PoolParameterSet {
        pool: CollateralPoolId,
        parameter: String,
    },
    TotalDebtCeilingSet {
        value: Rad,
    },
    PositionAdjusted {
        pool: CollateralPoolId,
        position: Address,
        collateral_delta: i128,
        debt_share_delta: i128,
    },
    PositionMoved {
        pool: CollateralPoolId,
        src: Address,
        dst: Address,
        collateral_delta: i128,
        debt_share_delta: i128,
    },
    CollateralMoved {
        pool: CollateralPoolId,
        src: Address,
        dst: Address,
        amount: Wad,
    },
    StablecoinMoved {
        src: Address,
        dst: Address,
        value: Rad,
    },
    UnbackedStablecoinMinted {
        debt_dst: Address,
        coin_dst: Address,
        value: Rad,
    },
    SystemBadDebtSettled {
        account: Address,
        value: Rad,
    },
    PositionOpened {
        id: PositionId,
        pool: CollateralPoolId,
        owner: Address,
        position: Address,
    },
    PositionTransferred {
        id: PositionId,
        from: Address,
        to: Address,
    },
    ManagePermissionSet {
        id: PositionId,
        owner: Address,
        delegate: Address,
        allowed: bool,
    },
    MigrationPermissionSet {
        owner: Address,
        migrator: Address,
        allowed: bool,
    },
    PositionExported {
        id: PositionId,
        destination: Address,
    },
    PositionImported {
        source: Address,
        id: PositionId,
    },
    StabilityFeeCollected {
        pool: CollateralPoolId,
        debt_accumulated_rate: Ray,
        accrued: Rad,
    },
    PriceUpdated {
        pool: CollateralPoolId,
        price: Wad,
        price_with_safety_margin: Ray,
    },
    Liquidated {
        pool: CollateralPoolId,
        position: Address,
        liquidator: Address,
        collateral_recipient: Address,
        debt_share_liquidated: Wad,
        debt_value_repaid: Rad,
        collateral_seized: Wad,
        treasury_fee: Wad,
        bad_debt: Rad,
    },
    LiquidationFailed {
        pool: CollateralPoolId,
        position: Address,
        reason: String,
    },
    LiquidatorWhitelisted {
        account: Address,
        allowed: bool,
    },
    Caged {
        component: Component,
    },
    Uncaged {
        component: Component,
    },
    Paused {
        component: Component,
    },
    Unpaused {
        component: Component,
    },
    CollateralPoolCaged {
        pool: CollateralPoolId,
        cage_price: Ray,
        total_debt_share: Wad,
    },
    BadDebtAccumulated {
        pool: CollateralPoolId,
        position: Address,
        collateral: Wad,
        debt_share: Wad,
        shortfall: Wad,
    },
    LockedCollateralRedeemed {
        pool: CollateralPoolId,
        position: Address,
        receiver: Address,
        amount: Wad,
    },
    DebtFinalized {
        debt: Rad,
        at: Timestamp,
    },
    CashPriceFinalized {
        pool: CollateralPoolId,
        final_cash_price: Ray,
    },
    StablecoinAccumulated {
        account: Address,
        amount: Wad,
    },
    StablecoinRedeemed {
        pool: CollateralPoolId,
        account: Address,
        amount: Wad,
        collateral: Wad,
    },
    CollateralDeposited {
        pool: CollateralPoolId,
        account: Address,
        amount: Wad,
    },
    CollateralWithdrawn {
        pool: CollateralPoolId,
        account: Address,
        amount: Wad,
    },
    StablecoinDeposited {
        account: Address,
        amount: Wad,
    },
    StablecoinWithdrawn {
        account: Address,
        amount: Wad,
    },
    SurplusWithdrawn {
        to: Address,
        pool: Option<CollateralPoolId>,
        collateral: Wad,
        stablecoin: Rad,
    },
}
