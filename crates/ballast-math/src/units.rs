//! typed fixed-point quantities
//!
//! - [`Wad`]: 10^18, collateral amounts and debt shares
//! - [`Ray`]: 10^27, rates and prices
//! - [`Rad`]: 10^45, stablecoin value (wad * ray)
//!
//! mixing units goes through explicit conversions so the scale of every
//! intermediate is visible at the call site.

use core::fmt;
use core::str::FromStr;

use primitive_types::U256;

use crate::error::{MathError, Result};
use crate::ops;
use crate::{RAD, RAY, WAD};

macro_rules! fixed_point {
    ($(#[$meta:meta])* $name:ident, $scale:expr, $decimals:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(U256);

        impl $name {
            pub const ZERO: Self = Self(U256([0, 0, 0, 0]));
            pub const DECIMALS: usize = $decimals;

            /// one whole unit
            pub const fn one() -> Self {
                Self($scale)
            }

            /// wrap a raw scaled integer
            pub const fn from_raw(raw: U256) -> Self {
                Self(raw)
            }

            pub fn from_raw_u128(raw: u128) -> Self {
                Self(U256::from(raw))
            }

            /// `units * scale`
            pub fn from_units(units: u128) -> Result<Self> {
                ops::mul(U256::from(units), $scale).map(Self)
            }

            pub const fn raw(&self) -> U256 {
                self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            pub fn checked_add(self, other: Self) -> Result<Self> {
                ops::add(self.0, other.0).map(Self)
            }

            pub fn checked_sub(self, other: Self) -> Result<Self> {
                ops::sub(self.0, other.0).map(Self)
            }

            pub fn saturating_sub(self, other: Self) -> Self {
                Self(self.0.saturating_sub(other.0))
            }

            /// apply a signed raw delta
            pub fn add_signed(self, delta: i128) -> Result<Self> {
                ops::add_signed(self.0, delta).map(Self)
            }

            /// subtract a signed raw delta
            pub fn sub_signed(self, delta: i128) -> Result<Self> {
                ops::sub_signed(self.0, delta).map(Self)
            }

            pub fn mul_bps(self, bps: u32) -> Result<Self> {
                ops::mul_bps(self.0, bps).map(Self)
            }

            pub fn div_bps(self, bps: u32) -> Result<Self> {
                ops::div_bps(self.0, bps).map(Self)
            }

            /// raw value as a negative i128 delta
            pub fn to_neg_delta(self) -> Result<i128> {
                ops::neg_i128(self.0)
            }

            /// raw value as a positive i128 delta
            pub fn to_delta(self) -> Result<i128> {
                ops::pos_i128(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&format_decimal(self.0, $decimals))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), format_decimal(self.0, $decimals))
            }
        }

        /// parses a raw scaled integer
        impl FromStr for $name {
            type Err = MathError;

            fn from_str(s: &str) -> Result<Self> {
                U256::from_dec_str(s.trim())
                    .map(Self)
                    .map_err(|_| MathError::InvalidDecimal(s.to_string()))
            }
        }

        impl From<U256> for $name {
            fn from(raw: U256) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for U256 {
            fn from(v: $name) -> Self {
                v.0
            }
        }

        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0.to_string())
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
                deserializer.deserialize_any(RawVisitor).map(Self)
            }
        }
    };
}

fixed_point!(
    /// quantity scaled by 10^18
    Wad,
    WAD,
    18
);

fixed_point!(
    /// rate or price scaled by 10^27
    Ray,
    RAY,
    27
);

fixed_point!(
    /// stablecoin value scaled by 10^45
    Rad,
    RAD,
    45
);

impl Wad {
    /// `wad * ray -> rad`, exact
    pub fn mul_ray(self, rate: Ray) -> Result<Rad> {
        ops::mul(self.0, rate.0).map(Rad)
    }

    /// `wad * ray / RAY -> wad`, truncating
    pub fn rmul(self, rate: Ray) -> Result<Wad> {
        ops::rmul(self.0, rate.0).map(Wad)
    }

    /// lossless lift into rad (`wad * RAY`)
    pub fn to_rad(self) -> Result<Rad> {
        ops::mul(self.0, RAY).map(Rad)
    }
}

impl Ray {
    /// `ray * ray / RAY`, truncating
    pub fn rmul(self, other: Ray) -> Result<Ray> {
        ops::rmul(self.0, other.0).map(Ray)
    }

    /// `ray * RAY / ray`, truncating
    pub fn rdiv(self, other: Ray) -> Result<Ray> {
        ops::rdiv(self.0, other.0).map(Ray)
    }

    /// `self^n`, rounding half-up at each step
    pub fn rpow(self, n: u64) -> Result<Ray> {
        ops::rpow(self.0, n, RAY).map(Ray)
    }

    pub fn mul_wad(self, amount: Wad) -> Result<Rad> {
        amount.mul_ray(self)
    }
}

impl Rad {
    /// `rad / ray -> wad`, truncating
    pub fn div_ray(self, rate: Ray) -> Result<Wad> {
        ops::div(self.0, rate.0).map(Wad)
    }

    /// `rad / ray -> wad`, rounding up
    pub fn div_ray_up(self, rate: Ray) -> Result<Wad> {
        ops::div_up(self.0, rate.0).map(Wad)
    }

    /// `rad / wad -> ray`, truncating
    pub fn div_wad(self, amount: Wad) -> Result<Ray> {
        ops::div(self.0, amount.0).map(Ray)
    }

    /// `rad / RAY -> wad`, truncating
    pub fn to_wad(self) -> Wad {
        Wad(self.0 / RAY)
    }
}

/// renders a scaled integer as a decimal with trailing zeros trimmed
fn format_decimal(raw: U256, decimals: usize) -> String {
    let digits = raw.to_string();
    if digits.len() <= decimals {
        let frac = format!("{:0>width$}", digits, width = decimals);
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            return "0".to_string();
        }
        return format!("0.{frac}");
    }
    let (int, frac) = digits.split_at(digits.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int.to_string()
    } else {
        format!("{int}.{frac}")
    }
}

#[cfg(feature = "serde")]
struct RawVisitor;

#[cfg(feature = "serde")]
impl<'de> serde::de::Visitor<'de> for RawVisitor {
    type Value = U256;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a raw fixed-point integer as a decimal string")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> core::result::Result<U256, E> {
        U256::from_dec_str(v.trim()).map_err(|_| E::custom(format!("invalid decimal: {v}")))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> core::result::Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> core::result::Result<U256, E> {
        u64::try_from(v)
            .map(U256::from)
            .map_err(|_| E::custom("negative fixed-point value"))
    }
}
