//! Fixed-point arithmetic helpers.
//!
//! [`mul_div`] widens to 256 bits so `a * b / c` never overflows for u128
//! operands. [`Dec`] is an 18-place decimal for delegation shares, held at
//! 256 bits.

use ethnum::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::constants::DEC_PRECISION;
use crate::error::CoinError;

/// Rounding direction for [`mul_div`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// Compute `x * y / denominator` in 256-bit space.
pub fn mul_div(x: u128, y: u128, denominator: u128, rounding: Rounding) -> Result<u128, CoinError> {
    if denominator == 0 {
        return Err(CoinError::DivisionByZero);
    }
    let num = U256::from(x) * U256::from(y);
    let den = U256::from(denominator);
    let mut q = num / den;
    if rounding == Rounding::Up && num % den != U256::ZERO {
        q += U256::ONE;
    }
    u128::try_from(q).map_err(|_| CoinError::Overflow)
}

/// Non-negative decimal with 18 fractional digits.
///
/// The raw value is held at 256 bits: a validator with a u128 token balance
/// carries a share total of up to `u128::MAX * 10^18`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(U256);

const PRECISION: U256 = U256::new(DEC_PRECISION);

impl Dec {
    pub const ZERO: Self = Self(U256::ZERO);
    pub const ONE: Self = Self(PRECISION);

    /// Wrap a raw fixed-point value (already scaled by 10^18).
    pub const fn from_raw(raw: u128) -> Self {
        Self(U256::new(raw))
    }

    pub const fn raw(&self) -> U256 {
        self.0
    }

    /// Whole-number decimal.
    pub fn from_int(n: u128) -> Self {
        Self(U256::new(n) * PRECISION)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == U256::ZERO
    }

    pub fn checked_add(self, other: Self) -> Result<Self, CoinError> {
        self.0.checked_add(other.0).map(Self).ok_or(CoinError::Overflow)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other { self } else { other }
    }

    /// `self * num / den`, truncated, with `num` and `den` integers.
    pub fn mul_ratio_truncated(self, num: u128, den: u128) -> Result<Self, CoinError> {
        if den == 0 {
            return Err(CoinError::DivisionByZero);
        }
        let product = self.0.checked_mul(U256::new(num)).ok_or(CoinError::Overflow)?;
        Ok(Self(product / U256::new(den)))
    }

    /// `self * n / divisor`, truncated, with `n` an integer.
    pub fn mul_int_quo_truncated(self, n: u128, divisor: Dec) -> Result<Self, CoinError> {
        self.mul_int_quo(n, divisor, Rounding::Down)
    }

    /// `self * n / divisor`, rounded up.
    pub fn mul_int_quo_round_up(self, n: u128, divisor: Dec) -> Result<Self, CoinError> {
        self.mul_int_quo(n, divisor, Rounding::Up)
    }

    fn mul_int_quo(self, n: u128, divisor: Dec, rounding: Rounding) -> Result<Self, CoinError> {
        if divisor.is_zero() {
            return Err(CoinError::DivisionByZero);
        }
        let x = self.0.checked_mul(U256::new(n)).ok_or(CoinError::Overflow)?;
        let d = divisor.0;
        // x * 10^18 / d, split so the full product is never formed
        let whole = (x / d).checked_mul(PRECISION).ok_or(CoinError::Overflow)?;
        let rem = (x % d).checked_mul(PRECISION).ok_or(CoinError::Overflow)?;
        let mut q = whole.checked_add(rem / d).ok_or(CoinError::Overflow)?;
        if rounding == Rounding::Up && rem % d != U256::ZERO {
            q = q.checked_add(U256::ONE).ok_or(CoinError::Overflow)?;
        }
        Ok(Self(q))
    }

    /// Integer part, discarding the fraction.
    pub fn truncate_int(&self) -> Result<u128, CoinError> {
        u128::try_from(self.0 / PRECISION).map_err(|_| CoinError::Overflow)
    }

    /// Nearest integer, halves rounded to even.
    pub fn round_int(&self) -> Result<u128, CoinError> {
        let int = self.0 / PRECISION;
        let rem = self.0 % PRECISION;
        let half = PRECISION / U256::new(2);
        let rounded = match rem.cmp(&half) {
            std::cmp::Ordering::Less => int,
            std::cmp::Ordering::Greater => int + U256::ONE,
            std::cmp::Ordering::Equal => {
                if int % U256::new(2) == U256::ZERO { int } else { int + U256::ONE }
            }
        };
        u128::try_from(rounded).map_err(|_| CoinError::Overflow)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frac = (self.0 % PRECISION).as_u128();
        write!(f, "{}.{:018}", self.0 / PRECISION, frac)
    }
}

// Raw value as a decimal string; JSON numbers lose precision past 2^53.
impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map(Self).map_err(serde::de::Error::custom)
    }
}

impl bincode::Encode for Dec {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        bincode::Encode::encode(&self.0.to_le_bytes(), encoder)
    }
}

impl<Context> bincode::Decode<Context> for Dec {
    fn decode<D: bincode::de::Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        let bytes: [u8; 32] = bincode::Decode::decode(decoder)?;
        Ok(Self(U256::from_le_bytes(bytes)))
    }
}

bincode::impl_borrow_decode!(Dec);
