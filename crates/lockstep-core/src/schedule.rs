//! Schedule algebra over period sequences.
//!
//! A schedule is a non-decreasing step function of [`Coins`] over time,
//! given as an absolute start plus a sequence of relative [`Period`]s. Each
//! step happens at the end of its period.
//!
//! All functions here are pure. Time sums saturate; coin sums are checked
//! and fail with [`CoinError::Overflow`].

use serde::{Deserialize, Serialize};

use crate::coins::Coins;
use crate::error::CoinError;
use crate::types::{total_length, Period, Timestamp};

/// A merged or intersected schedule with its absolute bounds.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    pub start: Timestamp,
    pub end: Timestamp,
    pub periods: Vec<Period>,
}

/// Value of a schedule at `read_time`.
///
/// Zero at or before `start`, `total` at or after `end`. In between, a step
/// counts once `read_time` reaches its boundary.
pub fn read_schedule(
    start: Timestamp,
    end: Timestamp,
    periods: &[Period],
    total: &Coins,
    read_time: Timestamp,
) -> Coins {
    if read_time <= start {
        return Coins::new();
    }
    if read_time >= end {
        return total.clone();
    }

    let mut coins = Coins::new();
    let mut elapsed = start;
    for period in periods {
        let boundary = elapsed.saturating_add(period.length);
        if read_time < boundary {
            break;
        }
        coins = coins.add(&period.amount);
        elapsed = boundary;
    }
    coins
}

/// Number of periods whose boundary is at or before `read_time`.
pub fn read_past_period_count(
    start: Timestamp,
    end: Timestamp,
    periods: &[Period],
    read_time: Timestamp,
) -> usize {
    if read_time <= start {
        return 0;
    }
    if read_time >= end {
        return periods.len();
    }

    let mut passed = 0;
    let mut elapsed = start;
    for period in periods {
        let boundary = elapsed.saturating_add(period.length);
        if read_time < boundary {
            break;
        }
        passed += 1;
        elapsed = boundary;
    }
    passed
}

/// Yields the events of two schedules in time order with their absolute
/// times. Simultaneous events come out as one [`Event::Both`].
struct EventMerge<'a> {
    a: &'a [Period],
    b: &'a [Period],
    time_a: Timestamp,
    time_b: Timestamp,
    ia: usize,
    ib: usize,
}

enum Event<'a> {
    A(&'a Coins),
    B(&'a Coins),
    Both(&'a Coins, &'a Coins),
}

impl<'a> EventMerge<'a> {
    fn new(start_a: Timestamp, start_b: Timestamp, a: &'a [Period], b: &'a [Period]) -> Self {
        Self { a, b, time_a: start_a, time_b: start_b, ia: 0, ib: 0 }
    }
}

impl<'a> Iterator for EventMerge<'a> {
    type Item = (Timestamp, Event<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let next_a = self.a.get(self.ia).map(|p| (self.time_a.saturating_add(p.length), &p.amount));
        let next_b = self.b.get(self.ib).map(|p| (self.time_b.saturating_add(p.length), &p.amount));
        match (next_a, next_b) {
            (Some((ta, amt_a)), Some((tb, _))) if ta < tb => {
                self.time_a = ta;
                self.ia += 1;
                Some((ta, Event::A(amt_a)))
            }
            (Some((ta, _)), Some((tb, amt_b))) if ta > tb => {
                self.time_b = tb;
                self.ib += 1;
                Some((tb, Event::B(amt_b)))
            }
            (Some((t, amt_a)), Some((_, amt_b))) => {
                self.time_a = t;
                self.time_b = t;
                self.ia += 1;
                self.ib += 1;
                Some((t, Event::Both(amt_a, amt_b)))
            }
            (Some((ta, amt_a)), None) => {
                self.time_a = ta;
                self.ia += 1;
                Some((ta, Event::A(amt_a)))
            }
            (None, Some((tb, amt_b))) => {
                self.time_b = tb;
                self.ib += 1;
                Some((tb, Event::B(amt_b)))
            }
            (None, None) => None,
        }
    }
}

/// Union of two schedules: every event of both, with simultaneous events
/// combined into one period.
///
/// The result starts at the earlier start and ends at the last event.
pub fn disjunct_periods(
    start_a: Timestamp,
    start_b: Timestamp,
    a: &[Period],
    b: &[Period],
) -> Result<Schedule, CoinError> {
    let start = start_a.min(start_b);
    let mut end = start;
    let mut periods = Vec::with_capacity(a.len() + b.len());

    for (time, event) in EventMerge::new(start_a, start_b, a, b) {
        let amount = match event {
            Event::A(x) | Event::B(x) => x.clone(),
            Event::Both(x, y) => x.checked_add(y)?,
        };
        periods.push(Period::new(time - end, amount));
        end = time;
    }

    Ok(Schedule { start, end, periods })
}

/// Intersection of two schedules: the pointwise minimum of their cumulative
/// step functions, emitted as positive increments.
///
/// The result ends at the last emitted increment, or at the earlier start
/// when nothing is emitted.
pub fn conjunct_periods(
    start_a: Timestamp,
    start_b: Timestamp,
    a: &[Period],
    b: &[Period],
) -> Result<Schedule, CoinError> {
    let start = start_a.min(start_b);
    let mut end = start;
    let mut periods = Vec::new();
    let mut result = Coins::new();
    let mut total_a = Coins::new();
    let mut total_b = Coins::new();

    for (time, event) in EventMerge::new(start_a, start_b, a, b) {
        match event {
            Event::A(x) => total_a = total_a.checked_add(x)?,
            Event::B(y) => total_b = total_b.checked_add(y)?,
            Event::Both(x, y) => {
                total_a = total_a.checked_add(x)?;
                total_b = total_b.checked_add(y)?;
            }
        }
        let min = total_a.min(&total_b);
        if result.is_all_lte(&min) {
            let diff = min.saturating_sub(&result);
            if !diff.is_zero() {
                periods.push(Period::new(time - end, diff.clone()));
                end = time;
                result = result.add(&diff);
            }
        }
    }

    Ok(Schedule { start, end, periods })
}

/// Re-anchor two schedules to their common earliest start by stretching the
/// first period of the later one. Only first periods are touched.
///
/// Returns the common start and the later of the two ends.
pub fn align_schedules(
    start_a: Timestamp,
    start_b: Timestamp,
    a: &mut [Period],
    b: &mut [Period],
) -> (Timestamp, Timestamp) {
    let start = start_a.min(start_b);
    if let Some(first) = a.first_mut() {
        first.length = first.length.saturating_add(start_a - start);
    }
    if let Some(first) = b.first_mut() {
        first.length = first.length.saturating_add(start_b - start);
    }
    let end_a = start.saturating_add(total_length(a));
    let end_b = start.saturating_add(total_length(b));
    (start, end_a.max(end_b))
}
