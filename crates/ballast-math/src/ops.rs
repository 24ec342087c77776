//! raw U256 helpers shared by the typed units
//!
//! every helper is checked and truncates toward zero. [`div_up`] rounds up
//! and [`rpow`] rounds half-up at each squaring step.

use primitive_types::U256;

use crate::error::{MathError, Result};
use crate::{BPS, RAY, WAD};

pub fn add(x: U256, y: U256) -> Result<U256> {
    x.checked_add(y).ok_or(MathError::Overflow)
}

pub fn sub(x: U256, y: U256) -> Result<U256> {
    x.checked_sub(y).ok_or(MathError::Underflow)
}

pub fn mul(x: U256, y: U256) -> Result<U256> {
    x.checked_mul(y).ok_or(MathError::Overflow)
}

pub fn div(x: U256, y: U256) -> Result<U256> {
    if y.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    Ok(x / y)
}

/// `x / y`, rounding away from zero
pub fn div_up(x: U256, y: U256) -> Result<U256> {
    let q = div(x, y)?;
    if (x % y).is_zero() {
        Ok(q)
    } else {
        add(q, U256::one())
    }
}

/// `x * y / z`, truncating
pub fn mul_div(x: U256, y: U256, z: U256) -> Result<U256> {
    div(mul(x, y)?, z)
}

/// `x * y / RAY`
pub fn rmul(x: U256, y: U256) -> Result<U256> {
    mul_div(x, y, RAY)
}

/// `x * RAY / y`
pub fn rdiv(x: U256, y: U256) -> Result<U256> {
    mul_div(x, RAY, y)
}

/// `x * y / WAD`
pub fn wmul(x: U256, y: U256) -> Result<U256> {
    mul_div(x, y, WAD)
}

/// `x * WAD / y`
pub fn wdiv(x: U256, y: U256) -> Result<U256> {
    mul_div(x, WAD, y)
}

/// `x * bps / 10_000`
pub fn mul_bps(x: U256, bps: u32) -> Result<U256> {
    mul_div(x, U256::from(bps), BPS)
}

/// `x * 10_000 / bps`
pub fn div_bps(x: U256, bps: u32) -> Result<U256> {
    mul_div(x, BPS, U256::from(bps))
}

/// `x^n` in base `b` by repeated squaring
///
/// `x` is a fixed-point number scaled by `b`. each intermediate product is
/// rounded half-up before rescaling, so `rpow(b, n, b) == b` for every `n`.
pub fn rpow(x: U256, n: u64, b: U256) -> Result<U256> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    if x.is_zero() {
        return Ok(if n == 0 { b } else { U256::zero() });
    }

    let half = b / 2;
    let mut z = if n % 2 == 0 { b } else { x };
    let mut x = x;
    let mut n = n / 2;

    while n > 0 {
        let xx = mul(x, x)?;
        x = add(xx, half)? / b;
        if n % 2 == 1 {
            let zx = mul(z, x)?;
            z = add(zx, half)? / b;
        }
        n /= 2;
    }

    Ok(z)
}

/// applies a signed delta to an unsigned quantity
pub fn add_signed(x: U256, delta: i128) -> Result<U256> {
    let magnitude = U256::from(delta.unsigned_abs());
    if delta >= 0 {
        add(x, magnitude)
    } else {
        sub(x, magnitude)
    }
}

/// subtracts a signed delta, the mirror of [`add_signed`]
pub fn sub_signed(x: U256, delta: i128) -> Result<U256> {
    let magnitude = U256::from(delta.unsigned_abs());
    if delta >= 0 {
        sub(x, magnitude)
    } else {
        add(x, magnitude)
    }
}

/// converts an unsigned quantity into a negative delta, for confiscation paths
pub fn neg_i128(x: U256) -> Result<i128> {
    let magnitude = u128::try_from(x).map_err(|_| MathError::SignedOverflow)?;
    let positive = i128::try_from(magnitude).map_err(|_| MathError::SignedOverflow)?;
    Ok(-positive)
}

/// converts an unsigned quantity into a positive delta
pub fn pos_i128(x: U256) -> Result<i128> {
    let magnitude = u128::try_from(x).map_err(|_| MathError::SignedOverflow)?;
    i128::try_from(magnitude).map_err(|_| MathError::SignedOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ray(n: u64) -> U256 {
        RAY * U256::from(n)
    }

    #[test]
    fn test_rpow_identity() {
        assert_eq!(rpow(RAY, 0, RAY).unwrap(), RAY);
        assert_eq!(rpow(RAY, 31_536_000, RAY).unwrap(), RAY);
    }

    #[test]
    fn test_rpow_zero_base() {
        assert_eq!(rpow(U256::zero(), 0, RAY).unwrap(), RAY);
        assert_eq!(rpow(U256::zero(), 5, RAY).unwrap(), U256::zero());
    }

    #[test]
    fn test_rpow_integer_powers() {
        assert_eq!(rpow(ray(2), 10, RAY).unwrap(), ray(1024));
        assert_eq!(rpow(ray(3), 3, RAY).unwrap(), ray(27));
    }

    #[test]
    fn test_rpow_per_second_rate_compounds() {
        // ~5% per year as a per-second factor
        let rate = U256::from_dec_str("1000000001547125957863212448").unwrap();
        let year = rpow(rate, 31_536_000, RAY).unwrap();
        let lower = U256::from_dec_str("1049999999000000000000000000").unwrap();
        let upper = U256::from_dec_str("1050000001000000000000000000").unwrap();
        assert!(year > lower && year < upper, "got {year}");
    }

    #[test]
    fn test_rpow_overflow_is_error() {
        assert_eq!(rpow(U256::MAX / 2, 4, RAY), Err(MathError::Overflow));
    }

    #[test]
    fn test_truncation() {
        // 1 / 3 in ray truncates
        let third = rdiv(RAY, ray(3)).unwrap();
        assert_eq!(third, U256::from_dec_str("333333333333333333333333333").unwrap());
        assert_eq!(rmul(third, ray(3)).unwrap(), RAY - 1);
    }

    #[test]
    fn test_div_up() {
        assert_eq!(div_up(U256::from(6), U256::from(3)).unwrap(), U256::from(2));
        assert_eq!(div_up(U256::from(7), U256::from(3)).unwrap(), U256::from(3));
        assert_eq!(div_up(U256::one(), RAY).unwrap(), U256::one());
        assert_eq!(div_up(U256::zero(), RAY).unwrap(), U256::zero());
        assert!(div_up(U256::one(), U256::zero()).is_err());
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(rdiv(RAY, U256::zero()), Err(MathError::DivisionByZero));
        assert_eq!(div_bps(RAY, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn test_signed_deltas() {
        let x = U256::from(10u64);
        assert_eq!(add_signed(x, -4).unwrap(), U256::from(6u64));
        assert_eq!(add_signed(x, 4).unwrap(), U256::from(14u64));
        assert_eq!(add_signed(x, -11), Err(MathError::Underflow));
        assert_eq!(add_signed(x, i128::MIN), Err(MathError::Underflow));
        assert_eq!(sub_signed(x, -4).unwrap(), U256::from(14u64));
        assert_eq!(sub_signed(x, 11), Err(MathError::Underflow));
        assert_eq!(neg_i128(x).unwrap(), -10);
        assert_eq!(neg_i128(U256::from(u128::MAX)), Err(MathError::SignedOverflow));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_rmul_never_rounds_up(x in any::<u128>(), y in any::<u128>()) {
                let (x, y) = (U256::from(x), U256::from(y));
                let z = rmul(x, y).unwrap();
                prop_assert!(z * RAY <= x * y);
                prop_assert!(x * y - z * RAY < RAY);
            }

            #[test]
            fn prop_rpow_monotone_in_base(a in 0u64..1_000_000_000, b in 0u64..1_000_000_000, n in 0u64..1_000_000) {
                let (lo, hi) = (RAY + U256::from(a.min(b)), RAY + U256::from(a.max(b)));
                let (p, q) = (rpow(lo, n, RAY).unwrap(), rpow(hi, n, RAY).unwrap());
                prop_assert!(RAY <= p && p <= q);
            }

            #[test]
            fn prop_bps_round_trip_never_gains(x in any::<u64>(), bps in 1u32..=20_000) {
                let x = U256::from(x);
                let back = div_bps(mul_bps(x, bps).unwrap(), bps).unwrap();
                prop_assert!(back <= x);
            }
        }
    }
}
