//! Multi-denomination coin amounts.
//!
//! [`Coins`] is a sorted, denom-unique vector of non-negative amounts. Zero
//! entries are never stored, so two equal vectors always compare equal and
//! iterate in the same canonical order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::{MAX_DENOM_LEN, MIN_DENOM_LEN};
use crate::error::CoinError;
use crate::math::{mul_div, Rounding};

/// Check a denomination string: 3-128 chars, leading letter, then
/// alphanumerics or one of `/:._-`.
pub fn validate_denom(denom: &str) -> Result<(), CoinError> {
    let len = denom.len();
    let mut chars = denom.chars();
    let leading_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));
    if !(MIN_DENOM_LEN..=MAX_DENOM_LEN).contains(&len) || !leading_ok || !rest_ok {
        return Err(CoinError::InvalidDenom(denom.to_string()));
    }
    Ok(())
}

/// A single denomination and amount.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Result<Self, CoinError> {
        let denom = denom.into();
        validate_denom(&denom)?;
        Ok(Self { denom, amount })
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A canonical coin vector.
#[derive(
    Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
#[serde(into = "BTreeMap<String, u128>", try_from = "BTreeMap<String, u128>")]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    /// The empty vector.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build from individual coins. Denoms must be valid and unique.
    pub fn from_coins(coins: impl IntoIterator<Item = Coin>) -> Result<Self, CoinError> {
        let mut map = BTreeMap::new();
        for coin in coins {
            validate_denom(&coin.denom)?;
            if map.contains_key(&coin.denom) {
                return Err(CoinError::DuplicateDenom(coin.denom));
            }
            // zero amounts still claim the denom for the duplicate check
            map.insert(coin.denom, coin.amount);
        }
        map.retain(|_, amount| *amount > 0);
        Ok(Self(map))
    }

    /// A single-denom vector.
    pub fn single(denom: impl Into<String>, amount: u128) -> Result<Self, CoinError> {
        Self::from_coins([Coin::new(denom, amount)?])
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    /// Amount held in `denom`, zero if absent.
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or(0)
    }

    /// Number of non-zero denominations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(denom, amount)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u128)> {
        self.0.iter().map(|(d, a)| (d.as_str(), *a))
    }

    pub fn denoms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Only the entry for `denom`, as its own vector.
    pub fn only(&self, denom: &str) -> Coins {
        let mut out = Coins::new();
        out.set(denom, self.amount_of(denom));
        out
    }

    fn set(&mut self, denom: &str, amount: u128) {
        if amount == 0 {
            self.0.remove(denom);
        } else {
            self.0.insert(denom.to_string(), amount);
        }
    }

    fn union_denoms<'a>(&'a self, other: &'a Coins) -> impl Iterator<Item = &'a str> {
        let mut denoms: Vec<&str> = self.denoms().chain(other.denoms()).collect();
        denoms.sort_unstable();
        denoms.dedup();
        denoms.into_iter()
    }

    /// Pointwise sum, failing on overflow.
    pub fn checked_add(&self, other: &Coins) -> Result<Coins, CoinError> {
        let mut out = self.clone();
        for (denom, amount) in other.iter() {
            let sum = out.amount_of(denom).checked_add(amount).ok_or(CoinError::Overflow)?;
            out.set(denom, sum);
        }
        Ok(out)
    }

    /// Pointwise sum, saturating at `u128::MAX`.
    ///
    /// Used where the result is bounded by an already-validated total, such as
    /// cumulative schedule reads.
    pub fn add(&self, other: &Coins) -> Coins {
        let mut out = self.clone();
        for (denom, amount) in other.iter() {
            out.set(denom, out.amount_of(denom).saturating_add(amount));
        }
        out
    }

    /// Pointwise difference clipped at zero.
    pub fn saturating_sub(&self, other: &Coins) -> Coins {
        let mut out = self.clone();
        for (denom, amount) in other.iter() {
            out.set(denom, out.amount_of(denom).saturating_sub(amount));
        }
        out
    }

    /// Pointwise difference; any denom going negative is an error.
    pub fn checked_sub(&self, other: &Coins) -> Result<Coins, CoinError> {
        let mut out = self.clone();
        for (denom, amount) in other.iter() {
            let have = out.amount_of(denom);
            let left = have.checked_sub(amount).ok_or_else(|| CoinError::Negative {
                denom: denom.to_string(),
                have,
                need: amount,
            })?;
            out.set(denom, left);
        }
        Ok(out)
    }

    /// Pointwise minimum. A denom missing on either side is zero.
    pub fn min(&self, other: &Coins) -> Coins {
        let mut out = Coins::new();
        for (denom, amount) in self.iter() {
            out.set(denom, amount.min(other.amount_of(denom)));
        }
        out
    }

    /// Pointwise maximum.
    pub fn max(&self, other: &Coins) -> Coins {
        let mut out = Coins::new();
        for denom in self.union_denoms(other) {
            out.set(denom, self.amount_of(denom).max(other.amount_of(denom)));
        }
        out
    }

    /// True when every amount in `self` is at most the matching amount in `other`.
    pub fn is_all_lte(&self, other: &Coins) -> bool {
        self.iter().all(|(denom, amount)| amount <= other.amount_of(denom))
    }

    /// True when some denom in `self` exceeds the matching amount in `other`.
    pub fn is_any_gt(&self, other: &Coins) -> bool {
        !self.is_all_lte(other)
    }

    /// Multiply every amount by `numerator / denominator`, rounding down.
    pub fn scale(&self, numerator: u128, denominator: u128) -> Result<Coins, CoinError> {
        let mut out = Coins::new();
        for (denom, amount) in self.iter() {
            out.set(denom, mul_div(amount, numerator, denominator, Rounding::Down)?);
        }
        Ok(out)
    }

    pub fn to_coins(&self) -> Vec<Coin> {
        self.iter()
            .map(|(denom, amount)| Coin { denom: denom.to_string(), amount })
            .collect()
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        let mut out = Coins::new();
        out.set(&coin.denom, coin.amount);
        out
    }
}

impl TryFrom<BTreeMap<String, u128>> for Coins {
    type Error = CoinError;

    fn try_from(map: BTreeMap<String, u128>) -> Result<Self, Self::Error> {
        Self::from_coins(map.into_iter().map(|(denom, amount)| Coin { denom, amount }))
    }
}

impl From<Coins> for BTreeMap<String, u128> {
    fn from(coins: Coins) -> Self {
        coins.0
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (denom, amount) in self.iter() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{amount}{denom}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Coins {
    type Err = CoinError;

    /// Parse `"1000fee,100stake"`. The empty string is the empty vector.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Coins::new());
        }
        let mut coins = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            let split = part
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(|| CoinError::InvalidCoin(part.to_string()))?;
            if split == 0 {
                return Err(CoinError::InvalidCoin(part.to_string()));
            }
            let amount: u128 = part[..split]
                .parse()
                .map_err(|_| CoinError::InvalidCoin(part.to_string()))?;
            coins.push(Coin::new(&part[split..], amount)?);
        }
        Self::from_coins(coins)
    }
}
