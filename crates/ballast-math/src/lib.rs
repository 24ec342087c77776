//! ballast-math: fixed-point arithmetic for the ballast ledger
//!
//! three scales, all non-negative integers over [`U256`]:
//!
//! ```text
//!   Wad  10^18   collateral amounts, debt shares
//!   Ray  10^27   rates, prices with safety margin
//!   Rad  10^45   stablecoin value        (Wad * Ray)
//! ```
//!
//! rad values do not fit in 128 bits once amounts reach a few hundred
//! million units, hence the 256-bit backing integer.
//!
//! rounding is truncation toward zero everywhere except [`ops::rpow`].

pub mod error;
pub mod ops;
pub mod units;

pub use error::{MathError, Result};
pub use primitive_types::U256;
pub use units::{Rad, Ray, Wad};

/// 10^18
pub const WAD: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// 10^27
pub const RAY: U256 = U256([11_515_845_246_265_065_472, 54_210_108, 0, 0]);

/// 10^45
pub const RAD: U256 = U256([802_379_605_485_813_760, 16_178_822_382_532_126_880, 2_938_735, 0]);

/// ray / wad, used to lift a wad price into a ray
pub const BLN: U256 = U256([1_000_000_000, 0, 0, 0]);

/// basis points denominator
pub const BPS: U256 = U256([10_000, 0, 0, 0]);

/// basis points denominator as an integer
pub const BPS_DENOMINATOR: u32 = 10_000;
