//! Arbitrary-precision signed amounts.
//!
//! Every on-chain value in this crate — balances, deltas, points — is stored
//! and moved around as a [`num_bigint::BigInt`] wrapped in [`Amount`]. The
//! only place a value is ever rendered to or parsed from text is the Store
//! boundary (see `db::models`), which keeps the math layer free of 64-bit
//! truncation regardless of how large a token's total supply gets.

use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::Zero;

use crate::error::Error;

/// A signed, arbitrary-precision amount (balance, delta, or point total).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(BigInt);

impl Amount {
    pub fn zero() -> Self {
        Amount(BigInt::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > BigInt::zero()
    }

    /// Parse a base-10 integer string (optionally signed) as recorded in the Store.
    ///
    /// Returns `Error::Decode` rather than panicking — callers treat this the
    /// same as any other malformed-row condition (log, skip, don't abort the batch).
    pub fn parse_decimal(s: &str) -> Result<Self, Error> {
        BigInt::from_str(s.trim())
            .map(Amount)
            .map_err(|e| Error::Decode(format!("invalid decimal amount {s:?}: {e}")))
    }

    /// Build an `Amount` from a 256-bit unsigned value decoded off the wire
    /// (an ERC-20 `value` field never carries a sign).
    pub fn from_u256_be_bytes(bytes: &[u8]) -> Self {
        Amount(BigInt::from_bytes_be(num_bigint::Sign::Plus, bytes))
    }

    /// `floor(numerator / denominator)`, for callers (the points window
    /// integral) that need exact floor semantics rather than Rust's
    /// truncate-toward-zero `BigInt` division.
    pub fn from_bigint_floor_div(numerator: BigInt, denominator: BigInt) -> Self {
        let quotient = &numerator / &denominator;
        let remainder = &numerator % &denominator;
        let needs_adjustment =
            !remainder.is_zero() && (remainder < BigInt::zero()) != (denominator < BigInt::zero());
        Amount(if needs_adjustment {
            quotient - 1
        } else {
            quotient
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse_decimal(s)
    }
}

impl From<i64> for Amount {
    fn from(v: i64) -> Self {
        Amount(BigInt::from(v))
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Amount(BigInt::from(v))
    }
}

impl Add for &Amount {
    type Output = Amount;
    fn add(self, rhs: &Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl Sub for &Amount {
    type Output = Amount;
    fn sub(self, rhs: &Amount) -> Amount {
        Amount(&self.0 - &rhs.0)
    }
}

impl Neg for &Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount(-&self.0)
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_decimal_string() {
        let a = Amount::parse_decimal("-123456789012345678901234567890").unwrap();
        assert_eq!(a.to_string(), "-123456789012345678901234567890");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Amount::parse_decimal("0x10").is_err());
        assert!(Amount::parse_decimal("12.5").is_err());
    }

    #[test]
    fn exceeds_u64_and_i64_without_truncating() {
        // u64::MAX is 18446744073709551615; go well past it.
        let huge = Amount::parse_decimal("99999999999999999999999999999999").unwrap();
        let one = Amount::from(1u64);
        let sum = &huge + &one;
        assert_eq!(sum.to_string(), "100000000000000000000000000000000");
    }

    #[test]
    fn from_u256_be_bytes_is_unsigned() {
        let bytes = [0u8; 31]
            .iter()
            .copied()
            .chain(std::iter::once(42u8))
            .collect::<Vec<_>>();
        let a = Amount::from_u256_be_bytes(&bytes);
        assert_eq!(a.to_string(), "42");
        assert!(!a.is_zero());
    }

    #[test]
    fn floor_div_matches_floor_not_truncation() {
        let floored = Amount::from_bigint_floor_div(BigInt::from(-1), BigInt::from(2));
        assert_eq!(floored.to_string(), "-1"); // floor(-0.5) == -1, not 0
        let exact = Amount::from_bigint_floor_div(BigInt::from(10), BigInt::from(2));
        assert_eq!(exact.to_string(), "5");
    }

    #[test]
    fn addition_and_negation() {
        let a = Amount::from(1000i64);
        let b = Amount::from(400i64);
        let diff = &a - &b;
        assert_eq!(diff.to_string(), "600");
        let neg = -diff;
        assert_eq!(neg.to_string(), "-600");
    }
}
