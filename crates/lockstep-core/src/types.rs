//! Periods and timestamps.
//!
//! All times are logical Unix seconds supplied by the caller. A period's
//! `length` is relative to the end of the previous period (or the schedule
//! start for the first one).

use serde::{Deserialize, Serialize};

use crate::coins::Coins;
use crate::error::{CoinError, ScheduleError};

/// Logical timestamp in seconds.
pub type Timestamp = i64;

/// One step of a schedule: `amount` unlocks `length` seconds after the
/// previous step.
#[derive(
    Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub struct Period {
    pub length: i64,
    pub amount: Coins,
}

impl Period {
    pub fn new(length: i64, amount: Coins) -> Self {
        Self { length, amount }
    }
}

/// Sum of all period lengths, saturating.
pub fn total_length(periods: &[Period]) -> i64 {
    periods.iter().fold(0i64, |acc, p| acc.saturating_add(p.length))
}

/// Sum of all period amounts.
pub fn total_amount(periods: &[Period]) -> Result<Coins, CoinError> {
    periods
        .iter()
        .try_fold(Coins::new(), |acc, p| acc.checked_add(&p.amount))
}

/// User-supplied periods must each have a length of at least one second.
pub fn validate_positive_lengths(periods: &[Period]) -> Result<(), ScheduleError> {
    match periods.iter().enumerate().find(|(_, p)| p.length < 1) {
        Some((index, p)) => Err(ScheduleError::NonPositiveLength { index, length: p.length }),
        None => Ok(()),
    }
}

/// Internally synthesized periods may have zero length but never negative.
pub fn validate_non_negative_lengths(periods: &[Period]) -> Result<(), ScheduleError> {
    match periods.iter().enumerate().find(|(_, p)| p.length < 0) {
        Some((index, p)) => Err(ScheduleError::NegativeLength { index, length: p.length }),
        None => Ok(()),
    }
}
