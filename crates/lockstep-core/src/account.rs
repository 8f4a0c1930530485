//! Account model.
//!
//! A [`ClawbackVestingAccount`] carries two independent schedules over the
//! same `original_vesting` total:
//! - lockup: when coins become transferable
//! - vesting: when coins become owned (and stop being claw-back-able)
//!
//! A coin is *vested* only when it is both unlocked and vested. All views are
//! derived from the schedules at a caller-supplied time; nothing here reads a
//! clock or a collaborator.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::coins::Coins;
use crate::constants::{CLAWBACK_CAP_LENGTH, SLASH_CAP_LENGTH};
use crate::error::{AccountError, CoinError, ScheduleError};
use crate::schedule::{
    align_schedules, conjunct_periods, disjunct_periods, read_past_period_count, read_schedule,
};
use crate::types::{total_amount, total_length, validate_non_negative_lengths, Period, Timestamp};

/// A plain account with no vesting restrictions.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct BaseAccount {
    pub address: Address,
    pub account_number: u64,
    pub sequence: u64,
}

impl BaseAccount {
    pub fn new(address: Address, account_number: u64) -> Self {
        Self { address, account_number, sequence: 0 }
    }
}

/// Vesting account whose unvested coins can be reclaimed by its funder.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct ClawbackVestingAccount {
    pub address: Address,
    pub account_number: u64,
    pub sequence: u64,
    pub funder_address: Address,
    pub original_vesting: Coins,
    pub delegated_vesting: Coins,
    pub delegated_free: Coins,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub lockup_periods: Vec<Period>,
    pub vesting_periods: Vec<Period>,
}

/// Result of reconciling delegation bookkeeping against real staking state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DelegationUpdate {
    pub delegated_vesting: Coins,
    pub delegated_free: Coins,
    /// Clawback amount clipped to what the account actually holds.
    pub to_clawback: Coins,
}

impl ClawbackVestingAccount {
    /// Build an account from its base, copying both schedules and aligning
    /// them to `start_time`.
    pub fn new(
        base: BaseAccount,
        funder_address: Address,
        original_vesting: Coins,
        start_time: Timestamp,
        lockup_periods: &[Period],
        vesting_periods: &[Period],
    ) -> Self {
        let mut lockup = lockup_periods.to_vec();
        let mut vesting = vesting_periods.to_vec();
        let (_, end_time) = align_schedules(start_time, start_time, &mut lockup, &mut vesting);
        Self {
            address: base.address,
            account_number: base.account_number,
            sequence: base.sequence,
            funder_address,
            original_vesting,
            delegated_vesting: Coins::new(),
            delegated_free: Coins::new(),
            start_time,
            end_time,
            lockup_periods: lockup,
            vesting_periods: vesting,
        }
    }

    /// Drop the vesting state, keeping address, number and sequence.
    pub fn into_base(self) -> BaseAccount {
        BaseAccount {
            address: self.address,
            account_number: self.account_number,
            sequence: self.sequence,
        }
    }

    // --- views ---

    /// Coins vested on the vesting axis alone.
    pub fn vested_only(&self, t: Timestamp) -> Coins {
        read_schedule(self.start_time, self.end_time, &self.vesting_periods, &self.original_vesting, t)
    }

    /// Coins unlocked on the lockup axis alone.
    pub fn unlocked_only(&self, t: Timestamp) -> Coins {
        read_schedule(self.start_time, self.end_time, &self.lockup_periods, &self.original_vesting, t)
    }

    /// Coins both vested and unlocked.
    pub fn vested_coins(&self, t: Timestamp) -> Coins {
        self.unlocked_only(t).min(&self.vested_only(t))
    }

    /// `original_vesting` minus [`vested_coins`](Self::vested_coins).
    pub fn vesting_coins(&self, t: Timestamp) -> Coins {
        self.original_vesting.saturating_sub(&self.vested_coins(t))
    }

    pub fn locked_only(&self, t: Timestamp) -> Coins {
        self.original_vesting.saturating_sub(&self.unlocked_only(t))
    }

    pub fn unvested_only(&self, t: Timestamp) -> Coins {
        self.original_vesting.saturating_sub(&self.vested_only(t))
    }

    /// Vested coins still held back by the lockup schedule.
    pub fn locked_up_vested(&self, t: Timestamp) -> Coins {
        self.vested_only(t).saturating_sub(&self.unlocked_only(t))
    }

    /// Vesting coins not covered by a delegation; these may not leave the
    /// account's bank balance.
    pub fn locked_coins(&self, t: Timestamp) -> Coins {
        self.vesting_coins(t).saturating_sub(&self.delegated_vesting)
    }

    /// Part of `balance` that may be transferred at `t`.
    pub fn spendable_coins(&self, balance: &Coins, t: Timestamp) -> Coins {
        balance.saturating_sub(&self.locked_coins(t))
    }

    /// True while any lockup period is still pending.
    pub fn has_locked_coins(&self, t: Timestamp) -> bool {
        !self.locked_only(t).is_zero()
    }

    pub fn passed_period_count(&self, t: Timestamp) -> usize {
        read_past_period_count(self.start_time, self.end_time, &self.vesting_periods, t)
    }

    // --- delegation tracking ---

    /// Record a delegation of `amount` out of a bank balance of `balance`.
    ///
    /// The part of `amount` not covered by the free surplus
    /// (`balance - vesting`) is charged to `delegated_vesting`, never pushing
    /// it above the vesting total; the rest goes to `delegated_free`.
    pub fn track_delegation(
        &mut self,
        t: Timestamp,
        balance: &Coins,
        amount: &Coins,
    ) -> Result<(), AccountError> {
        for (denom, want) in amount.iter() {
            let have = balance.amount_of(denom);
            if want > have {
                return Err(AccountError::InsufficientFunds { denom: denom.to_string(), have, need: want });
            }
        }

        let vesting = self.vesting_coins(t);
        let mut dv = self.delegated_vesting.clone();
        let mut df = self.delegated_free.clone();
        for (denom, want) in amount.iter() {
            let free = balance.amount_of(denom).saturating_sub(vesting.amount_of(denom));
            let headroom = vesting.amount_of(denom).saturating_sub(dv.amount_of(denom));
            let to_vesting = want.saturating_sub(free).min(headroom);
            let to_free = want - to_vesting;
            dv = dv.checked_add(&Coins::single(denom, to_vesting)?)?;
            df = df.checked_add(&Coins::single(denom, to_free)?)?;
        }
        self.delegated_vesting = dv;
        self.delegated_free = df;
        Ok(())
    }

    /// Record an undelegation, drawing down `delegated_free` first and then
    /// `delegated_vesting`.
    pub fn track_undelegation(&mut self, amount: &Coins) -> Result<(), AccountError> {
        let mut dv = self.delegated_vesting.clone();
        let mut df = self.delegated_free.clone();
        for (denom, want) in amount.iter() {
            let have_free = df.amount_of(denom);
            let have_vesting = dv.amount_of(denom);
            if want > have_free.saturating_add(have_vesting) {
                return Err(AccountError::InsufficientFunds {
                    denom: denom.to_string(),
                    have: have_free.saturating_add(have_vesting),
                    need: want,
                });
            }
            let from_free = want.min(have_free);
            let from_vesting = want - from_free;
            df = df.checked_sub(&Coins::single(denom, from_free)?)?;
            dv = dv.checked_sub(&Coins::single(denom, from_vesting)?)?;
        }
        self.delegated_vesting = dv;
        self.delegated_free = df;
        Ok(())
    }

    // --- clawback ---

    /// Remove every vesting event after `clawback_time`.
    ///
    /// Returns the truncated account and the unvested total it gave up. Before
    /// the start time the account is returned unchanged with nothing to claw
    /// back. Lockup events are kept but capped at the new vested total.
    pub fn compute_clawback(self, clawback_time: Timestamp) -> Result<(Self, Coins), CoinError> {
        if clawback_time < self.start_time {
            return Ok((self, Coins::new()));
        }

        let total_vested = self.vested_only(clawback_time);
        let total_unvested = self.original_vesting.saturating_sub(&total_vested);

        let passed = self.passed_period_count(clawback_time);
        let vesting_periods: Vec<Period> = self.vesting_periods[..passed].to_vec();
        let vesting_end = self.start_time.saturating_add(total_length(&vesting_periods));

        let cap = [Period::new(CLAWBACK_CAP_LENGTH, total_vested.clone())];
        let lockup = conjunct_periods(self.start_time, self.start_time, &self.lockup_periods, &cap)?;

        let account = Self {
            original_vesting: total_vested,
            end_time: vesting_end.max(lockup.end),
            lockup_periods: lockup.periods,
            vesting_periods,
            ..self
        };
        Ok((account, total_unvested))
    }

    /// Reconcile delegation bookkeeping with actual staking state before a
    /// clawback.
    ///
    /// Anything missing from `delegated_vesting + delegated_free` relative to
    /// `bonded + unbonding` is treated as slashed and stays on the books.
    pub fn update_delegation(
        &self,
        encumbered: &Coins,
        to_clawback: &Coins,
        bonded: &Coins,
        unbonding: &Coins,
        unbonded: &Coins,
    ) -> Result<DelegationUpdate, CoinError> {
        let delegated = bonded.checked_add(unbonding)?;
        let old_delegated = self.delegated_vesting.checked_add(&self.delegated_free)?;
        let slashed = old_delegated.saturating_sub(&delegated.min(&old_delegated));
        let total = delegated.checked_add(unbonded)?;
        let clipped = to_clawback.min(&total);
        let new_delegated = delegated.min(&total.saturating_sub(&clipped)).checked_add(&slashed)?;
        let delegated_vesting = encumbered.min(&new_delegated);
        let delegated_free = new_delegated.saturating_sub(&delegated_vesting);
        Ok(DelegationUpdate { delegated_vesting, delegated_free, to_clawback: clipped })
    }

    // --- grant merge ---

    /// Shorten both schedules to absorb coins lost to slashing.
    ///
    /// `delegated` is what staking actually holds for this account. The gap
    /// against the booked delegation, up to `original_vesting`, is removed
    /// from the tail of both schedules.
    pub fn absorb_slashing(self, delegated: &Coins) -> Result<(Self, Coins), CoinError> {
        let old_delegated = self.delegated_vesting.checked_add(&self.delegated_free)?;
        let slashed = old_delegated.saturating_sub(&old_delegated.min(delegated));
        let unvested_slashed = slashed.min(&self.original_vesting);
        if unvested_slashed.is_zero() {
            return Ok((self, unvested_slashed));
        }

        let original_vesting = self.original_vesting.saturating_sub(&unvested_slashed);
        let cap = [Period::new(SLASH_CAP_LENGTH, original_vesting.clone())];
        let start = self.start_time;
        let lockup = conjunct_periods(start, start, &self.lockup_periods, &cap)?;
        let vesting = conjunct_periods(start, start, &self.vesting_periods, &cap)?;
        let account = Self {
            original_vesting,
            end_time: lockup.end.max(vesting.end),
            lockup_periods: lockup.periods,
            vesting_periods: vesting.periods,
            ..self
        };
        Ok((account, unvested_slashed))
    }

    /// Merge a further grant into both schedules.
    pub fn add_grant(
        self,
        grant_start: Timestamp,
        grant_lockup: &[Period],
        grant_vesting: &[Period],
        grant_coins: &Coins,
    ) -> Result<Self, AccountError> {
        let lockup = disjunct_periods(self.start_time, grant_start, &self.lockup_periods, grant_lockup)?;
        let vesting = disjunct_periods(self.start_time, grant_start, &self.vesting_periods, grant_vesting)?;
        if lockup.start != vesting.start {
            return Err(ScheduleError::StartMismatch { lockup: lockup.start, vesting: vesting.start }.into());
        }
        let original_vesting = self.original_vesting.checked_add(grant_coins)?;
        Ok(Self {
            original_vesting,
            start_time: lockup.start,
            end_time: lockup.end.max(vesting.end),
            lockup_periods: lockup.periods,
            vesting_periods: vesting.periods,
            ..self
        })
    }

    /// Re-split an actual delegated amount: vesting first, up to what is
    /// still vesting at `t`, the rest free.
    pub fn reset_delegation(&mut self, t: Timestamp, delegated: &Coins) {
        self.delegated_vesting = delegated.min(&self.vesting_coins(t));
        self.delegated_free = delegated.saturating_sub(&self.delegated_vesting);
    }

    // --- rewards ---

    /// Spread `reward` over the vesting periods that end after `now`, in
    /// proportion to their `bond_denom` amounts.
    ///
    /// Running totals are scaled and rounded down, so the last period picks
    /// up any residue and the whole reward is distributed. The same amount is
    /// added to `original_vesting` and, as an immediately-unlocked zero-length
    /// leading period, to the lockup schedule. With no future bond-denom
    /// amounts the account is returned unchanged.
    pub fn distribute_reward(
        mut self,
        now: Timestamp,
        bond_denom: &str,
        reward: &Coins,
    ) -> Result<Self, AccountError> {
        let mut t = self.start_time;
        let mut first_unvested = 0;
        let mut unvested_tokens: u128 = 0;
        for (i, period) in self.vesting_periods.iter().enumerate() {
            t = t.saturating_add(period.length);
            if t <= now {
                first_unvested = i + 1;
                continue;
            }
            unvested_tokens = unvested_tokens.saturating_add(period.amount.amount_of(bond_denom));
        }
        if unvested_tokens == 0 || reward.is_zero() {
            return Ok(self);
        }

        let mut running_reward = Coins::new();
        let mut running_stake: u128 = 0;
        for period in self.vesting_periods[first_unvested..].iter_mut() {
            running_stake = running_stake.saturating_add(period.amount.amount_of(bond_denom));
            let target = reward.scale(running_stake, unvested_tokens)?;
            let increment = target.saturating_sub(&running_reward);
            running_reward = target;
            period.amount = period.amount.checked_add(&increment)?;
        }

        self.original_vesting = self.original_vesting.checked_add(reward)?;
        if self.lockup_periods.first().is_some_and(|p| p.length == 0) {
            self.lockup_periods[0].amount = self.lockup_periods[0].amount.checked_add(reward)?;
        } else {
            self.lockup_periods.insert(0, Period::new(0, reward.clone()));
        }
        Ok(self)
    }

    // --- invariants ---

    /// Check the structural invariants of the account.
    ///
    /// A fully clawed-back account (no periods, nothing vesting) may have
    /// `start_time == end_time`.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let trivial = self.lockup_periods.is_empty()
            && self.vesting_periods.is_empty()
            && self.original_vesting.is_zero();
        if self.start_time > self.end_time || (self.start_time == self.end_time && !trivial) {
            return Err(ScheduleError::StartNotBeforeEnd { start: self.start_time, end: self.end_time });
        }
        validate_non_negative_lengths(&self.lockup_periods)?;
        validate_non_negative_lengths(&self.vesting_periods)?;

        let lockup_end = self.start_time.saturating_add(total_length(&self.lockup_periods));
        if lockup_end > self.end_time {
            return Err(ScheduleError::LockupBeyondEnd { lockup_end, end: self.end_time });
        }
        let lockup_total = total_amount(&self.lockup_periods).unwrap_or_default();
        if lockup_total != self.original_vesting {
            return Err(ScheduleError::LockupTotalMismatch {
                original: self.original_vesting.to_string(),
                total: lockup_total.to_string(),
            });
        }

        let vesting_end = self.start_time.saturating_add(total_length(&self.vesting_periods));
        if vesting_end > self.end_time {
            return Err(ScheduleError::VestingBeyondEnd { vesting_end, end: self.end_time });
        }
        let vesting_total = total_amount(&self.vesting_periods).unwrap_or_default();
        if vesting_total != self.original_vesting {
            return Err(ScheduleError::VestingTotalMismatch {
                original: self.original_vesting.to_string(),
                total: vesting_total.to_string(),
            });
        }
        Ok(())
    }
}

/// Any account known to the account keeper.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub enum Account {
    Base(BaseAccount),
    ClawbackVesting(ClawbackVestingAccount),
}

impl Account {
    pub fn address(&self) -> Address {
        match self {
            Account::Base(a) => a.address,
            Account::ClawbackVesting(a) => a.address,
        }
    }

    pub fn account_number(&self) -> u64 {
        match self {
            Account::Base(a) => a.account_number,
            Account::ClawbackVesting(a) => a.account_number,
        }
    }

    pub fn as_clawback(&self) -> Option<&ClawbackVestingAccount> {
        match self {
            Account::ClawbackVesting(a) => Some(a),
            Account::Base(_) => None,
        }
    }

    pub fn into_clawback(self) -> Option<ClawbackVestingAccount> {
        match self {
            Account::ClawbackVesting(a) => Some(a),
            Account::Base(_) => None,
        }
    }

    pub fn is_clawback(&self) -> bool {
        matches!(self, Account::ClawbackVesting(_))
    }

    /// Coins the bank must hold back at `t`. Plain accounts lock nothing.
    pub fn locked_coins(&self, t: Timestamp) -> Coins {
        match self {
            Account::Base(_) => Coins::new(),
            Account::ClawbackVesting(a) => a.locked_coins(t),
        }
    }
}

impl From<BaseAccount> for Account {
    fn from(a: BaseAccount) -> Self {
        Account::Base(a)
    }
}

impl From<ClawbackVestingAccount> for Account {
    fn from(a: ClawbackVestingAccount) -> Self {
        Account::ClawbackVesting(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ADDRESS_LEN;

    const HOUR: i64 = 3600;
    const NOW: i64 = 1_700_000_000;

    fn c(s: &str) -> Coins {
        s.parse().unwrap()
    }

    fn p(length: i64, coins: &str) -> Period {
        Period::new(length, c(coins))
    }

    fn base() -> BaseAccount {
        BaseAccount::new(Address::account([1; ADDRESS_LEN]), 7)
    }

    fn funder() -> Address {
        Address::account([2; ADDRESS_LEN])
    }

    /// 16h lockup; vesting 50% at 12h, 25% at 18h, 25% at 24h.
    fn halves_account() -> ClawbackVestingAccount {
        ClawbackVestingAccount::new(
            base(),
            funder(),
            c("1000fee,100stake"),
            NOW,
            &[p(16 * HOUR, "1000fee,100stake")],
            &[
                p(12 * HOUR, "500fee,50stake"),
                p(6 * HOUR, "250fee,25stake"),
                p(6 * HOUR, "250fee,25stake"),
            ],
        )
    }

    /// 12h lockup; vesting marks at 8h, 9h, 15h, 17h, 18h.
    fn clawback_account() -> ClawbackVestingAccount {
        ClawbackVestingAccount::new(
            base(),
            funder(),
            c("1000fee,100stake"),
            NOW,
            &[p(12 * HOUR, "1000fee,100stake")],
            &[
                p(8 * HOUR, "200fee"),
                p(HOUR, "200fee,50stake"),
                p(6 * HOUR, "200fee,50stake"),
                p(2 * HOUR, "200fee"),
                p(HOUR, "200fee"),
            ],
        )
    }

    #[test]
    fn new_aligns_and_sets_end() {
        let va = halves_account();
        assert_eq!(va.start_time, NOW);
        assert_eq!(va.end_time, NOW + 24 * HOUR);
        assert!(va.validate().is_ok());
    }

    #[test]
    fn vested_requires_both_axes() {
        let va = halves_account();
        assert!(va.vested_coins(NOW).is_zero());
        assert!(va.vested_coins(NOW + 6 * HOUR).is_zero());
        // vested on the vesting axis but still locked up
        assert!(va.vested_coins(NOW + 14 * HOUR).is_zero());
        assert_eq!(va.locked_up_vested(NOW + 14 * HOUR), c("500fee,50stake"));
        assert_eq!(va.vested_coins(NOW + 16 * HOUR), c("500fee,50stake"));
        assert_eq!(va.vested_coins(NOW + 17 * HOUR), c("500fee,50stake"));
        assert_eq!(va.vested_coins(NOW + 18 * HOUR), c("750fee,75stake"));
        assert_eq!(va.vested_coins(NOW + 48 * HOUR), c("1000fee,100stake"));
    }

    #[test]
    fn vesting_and_locked_views() {
        let va = halves_account();
        assert_eq!(va.vesting_coins(NOW), c("1000fee,100stake"));
        assert_eq!(va.vesting_coins(NOW + 15 * HOUR), c("1000fee,100stake"));
        assert_eq!(va.vesting_coins(NOW + 16 * HOUR), c("500fee,50stake"));
        assert_eq!(va.vesting_coins(NOW + 18 * HOUR), c("250fee,25stake"));
        assert!(va.vesting_coins(NOW + 24 * HOUR).is_zero());

        assert_eq!(va.locked_coins(NOW), c("1000fee,100stake"));
        assert_eq!(va.locked_coins(NOW + 17 * HOUR), c("500fee,50stake"));
        assert!(va.locked_coins(NOW + 24 * HOUR).is_zero());

        assert_eq!(va.locked_only(NOW + 15 * HOUR), c("1000fee,100stake"));
        assert!(va.locked_only(NOW + 16 * HOUR).is_zero());
        assert_eq!(va.unvested_only(NOW + 12 * HOUR), c("500fee,50stake"));
        assert!(va.has_locked_coins(NOW + 15 * HOUR));
        assert!(!va.has_locked_coins(NOW + 16 * HOUR));
        assert_eq!(va.passed_period_count(NOW + 18 * HOUR), 2);
    }

    #[test]
    fn spendable_subtracts_locked() {
        let va = halves_account();
        let balance = c("1000fee,100stake");
        assert!(va.spendable_coins(&balance, NOW).is_zero());
        assert_eq!(va.spendable_coins(&balance, NOW + 17 * HOUR), c("500fee,50stake"));
    }

    #[test]
    fn track_delegation_all_vesting() {
        let mut va = halves_account();
        let all = c("1000fee,100stake");
        va.track_delegation(NOW, &all, &all).unwrap();
        assert_eq!(va.delegated_vesting, all);
        assert!(va.delegated_free.is_zero());
        assert!(va.locked_coins(NOW).is_zero());
    }

    #[test]
    fn track_delegation_all_vested() {
        let mut va = halves_account();
        let all = c("1000fee,100stake");
        va.track_delegation(NOW + 24 * HOUR, &all, &all).unwrap();
        assert!(va.delegated_vesting.is_zero());
        assert_eq!(va.delegated_free, all);
    }

    #[test]
    fn track_delegation_uses_free_surplus_first() {
        let mut va = halves_account();
        // at 17h: vesting 500fee,50stake, free 500fee,50stake
        let balance = c("1000fee,100stake");
        va.track_delegation(NOW + 17 * HOUR, &balance, &c("750fee,75stake")).unwrap();
        assert_eq!(va.delegated_free, c("500fee,50stake"));
        assert_eq!(va.delegated_vesting, c("250fee,25stake"));
    }

    #[test]
    fn track_delegation_caps_vesting_share() {
        let mut va = halves_account();
        va.delegated_vesting = c("40stake");
        // 50 vesting, 40 already delegated: only 10 more may be charged to vesting
        va.track_delegation(NOW + 17 * HOUR, &c("100stake"), &c("100stake")).unwrap();
        assert_eq!(va.delegated_vesting, c("50stake"));
        assert_eq!(va.delegated_free, c("90stake"));
    }

    #[test]
    fn track_delegation_insufficient_funds_is_atomic() {
        let mut va = halves_account();
        let err = va
            .track_delegation(NOW, &c("1000fee,100stake"), &c("1fee,1000000stake"))
            .unwrap_err();
        assert!(matches!(err, AccountError::InsufficientFunds { .. }));
        assert!(va.delegated_vesting.is_zero());
        assert!(va.delegated_free.is_zero());
    }

    #[test]
    fn track_undelegation_free_first() {
        let mut va = halves_account();
        va.delegated_vesting = c("50stake");
        va.delegated_free = c("50stake");
        va.track_undelegation(&c("25stake")).unwrap();
        assert_eq!(va.delegated_free, c("25stake"));
        assert_eq!(va.delegated_vesting, c("50stake"));
        va.track_undelegation(&c("50stake")).unwrap();
        assert!(va.delegated_free.is_zero());
        assert_eq!(va.delegated_vesting, c("25stake"));
    }

    #[test]
    fn track_undelegation_rejects_overdraw() {
        let mut va = halves_account();
        va.delegated_vesting = c("10stake");
        let err = va.track_undelegation(&c("11stake")).unwrap_err();
        assert_eq!(err, AccountError::InsufficientFunds { denom: "stake".into(), have: 10, need: 11 });
        assert_eq!(va.delegated_vesting, c("10stake"));
    }

    #[test]
    fn compute_clawback_at_start_takes_everything() {
        let (va, amt) = clawback_account().compute_clawback(NOW).unwrap();
        assert_eq!(amt, c("1000fee,100stake"));
        assert!(va.original_vesting.is_zero());
        assert!(va.lockup_periods.is_empty());
        assert!(va.vesting_periods.is_empty());
        assert_eq!(va.end_time, va.start_time);
        assert!(va.validate().is_ok());
    }

    #[test]
    fn compute_clawback_midway() {
        let (va, amt) = clawback_account().compute_clawback(NOW + 11 * HOUR).unwrap();
        assert_eq!(amt, c("600fee,50stake"));
        assert_eq!(va.original_vesting, c("400fee,50stake"));
        assert_eq!(va.lockup_periods, vec![p(12 * HOUR, "400fee,50stake")]);
        assert_eq!(va.vesting_periods, vec![p(8 * HOUR, "200fee"), p(HOUR, "200fee,50stake")]);
        assert_eq!(va.end_time, NOW + 12 * HOUR);
        assert!(va.validate().is_ok());
    }

    #[test]
    fn compute_clawback_after_end_is_noop() {
        let original = clawback_account();
        let (va, amt) = original.clone().compute_clawback(NOW + 23 * HOUR).unwrap();
        assert!(amt.is_zero());
        assert_eq!(va, original);
    }

    #[test]
    fn compute_clawback_before_start_is_noop() {
        let original = clawback_account();
        let (va, amt) = original.clone().compute_clawback(NOW - 1).unwrap();
        assert!(amt.is_zero());
        assert_eq!(va, original);
    }

    #[test]
    fn update_delegation_keeps_slashed_on_books() {
        let mut va = clawback_account();
        va.delegated_vesting = c("60stake");
        va.delegated_free = c("20stake");
        // 80 booked, 70 actually delegated: 10 slashed
        let update = va.update_delegation(
            &c("30stake"),
            &c("50stake"),
            &c("60stake"),
            &c("10stake"),
            &c("5stake"),
        )
        .unwrap();
        // total 75, clip 50, new delegated = min(70, 25) + 10 = 35
        assert_eq!(update.to_clawback, c("50stake"));
        assert_eq!(update.delegated_vesting, c("30stake"));
        assert_eq!(update.delegated_free, c("5stake"));
    }

    #[test]
    fn update_delegation_clips_to_holdings() {
        let va = clawback_account();
        let update = va.update_delegation(&Coins::new(), &c("600fee,50stake"), &Coins::new(), &Coins::new(), &c("100fee")).unwrap();
        assert_eq!(update.to_clawback, c("100fee"));
        assert!(update.delegated_vesting.is_zero());
        assert!(update.delegated_free.is_zero());
    }

    #[test]
    fn update_delegation_rejects_overflowing_holdings() {
        let va = clawback_account();
        let max = Coins::single("stake", u128::MAX).unwrap();
        let err = va
            .update_delegation(&Coins::new(), &c("50stake"), &max, &c("1stake"), &Coins::new())
            .unwrap_err();
        assert_eq!(err, CoinError::Overflow);
        let err = va
            .update_delegation(&Coins::new(), &c("50stake"), &max, &Coins::new(), &c("1stake"))
            .unwrap_err();
        assert_eq!(err, CoinError::Overflow);
    }

    #[test]
    fn grant_merge_rejects_overflowing_event() {
        let max = Coins::single("stake", u128::MAX).unwrap();
        let va = ClawbackVestingAccount::new(
            base(),
            funder(),
            max.clone(),
            NOW,
            &[Period::new(10, max.clone())],
            &[Period::new(10, max)],
        );
        let err = va
            .add_grant(NOW, &[p(10, "1stake")], &[p(10, "1stake")], &c("1stake"))
            .unwrap_err();
        assert_eq!(err, AccountError::Coin(CoinError::Overflow));
    }

    fn grant_base(orig: &str, lockup: Vec<Period>, vesting: Vec<Period>) -> ClawbackVestingAccount {
        ClawbackVestingAccount::new(base(), funder(), c(orig), NOW, &lockup, &vesting)
    }

    #[test]
    fn absorb_partial_slash_then_grant() {
        let mut va = grant_base(
            "1000fee,100stake",
            vec![p(1, "1000fee,100stake")],
            vec![p(100, "650fee,40stake"), p(100, "350fee,60stake")],
        );
        va.delegated_vesting = c("54stake");
        assert_eq!(va.locked_coins(NOW + 150).amount_of("stake"), 6);

        let (va, slashed) = va.absorb_slashing(&Coins::new()).unwrap();
        assert_eq!(slashed, c("54stake"));
        assert_eq!(va.original_vesting, c("1000fee,46stake"));
        assert_eq!(va.lockup_periods, vec![p(1, "1000fee,46stake")]);
        assert_eq!(va.vesting_periods, vec![p(100, "650fee,40stake"), p(100, "350fee,6stake")]);

        let grant = c("50stake");
        let mut va = va
            .add_grant(NOW + 500, &[p(1, "50stake")], &[p(50, "50stake")], &grant)
            .unwrap();
        va.reset_delegation(NOW, &Coins::new());
        assert_eq!(va.locked_coins(NOW + 150).amount_of("stake"), 56);
        assert_eq!(va.original_vesting, c("1000fee,96stake"));
        assert_eq!(va.end_time, NOW + 550);
        assert!(va.validate().is_ok());
    }

    #[test]
    fn absorb_full_slash_then_grant() {
        let mut va = grant_base("100stake", vec![p(1, "100stake")], vec![p(100, "40stake"), p(100, "60stake")]);
        va.delegated_vesting = c("100stake");
        assert_eq!(va.locked_coins(NOW + 150).amount_of("stake"), 0);

        let (va, _) = va.absorb_slashing(&Coins::new()).unwrap();
        assert!(va.original_vesting.is_zero());
        assert!(va.vesting_periods.is_empty());

        let grant = c("50stake");
        let mut va = va
            .add_grant(NOW + 500, &[p(1, "50stake")], &[p(50, "50stake")], &grant)
            .unwrap();
        va.reset_delegation(NOW, &Coins::new());
        assert_eq!(va.locked_coins(NOW + 150).amount_of("stake"), 50);
        assert_eq!(va.locked_coins(NOW + 500).amount_of("stake"), 50);
        assert!(va.locked_coins(NOW + 550).is_zero());
    }

    #[test]
    fn absorb_without_slash_is_noop() {
        let mut va = clawback_account();
        va.delegated_free = c("10stake");
        let before = va.clone();
        let (va, slashed) = va.absorb_slashing(&c("10stake")).unwrap();
        assert!(slashed.is_zero());
        assert_eq!(va, before);
    }

    #[test]
    fn slash_cap_lands_one_second_after_start() {
        let mut va = grant_base("100stake", vec![p(0, "100stake")], vec![p(100, "100stake")]);
        va.delegated_vesting = c("40stake");

        let (va, slashed) = va.absorb_slashing(&Coins::new()).unwrap();
        assert_eq!(slashed, c("40stake"));
        assert_eq!(va.original_vesting, c("60stake"));
        assert_eq!(va.lockup_periods, vec![p(1, "60stake")]);
        assert_eq!(va.vesting_periods, vec![p(100, "60stake")]);
        assert!(va.unlocked_only(NOW).is_zero());
        assert_eq!(va.unlocked_only(NOW + 1), c("60stake"));
        assert!(va.validate().is_ok());
    }

    #[test]
    fn clawback_cap_lands_at_start() {
        let va = grant_base("100stake", vec![p(0, "100stake")], vec![p(10, "50stake"), p(10, "50stake")]);
        let (va, unvested) = va.compute_clawback(NOW + 15).unwrap();
        assert_eq!(unvested, c("50stake"));
        assert_eq!(va.lockup_periods, vec![p(0, "50stake")]);
        assert_eq!(va.vesting_periods, vec![p(10, "50stake")]);
        assert_eq!(va.end_time, NOW + 10);
        assert_eq!(va.unlocked_only(NOW + 1), c("50stake"));
        assert!(va.validate().is_ok());
    }

    #[test]
    fn grant_merge_unions_events() {
        let va = grant_base("100stake", vec![p(10, "100stake")], vec![p(10, "100stake")]);
        let va = va
            .add_grant(NOW - 5, &[p(15, "20stake")], &[p(5, "20stake")], &c("20stake"))
            .unwrap();
        assert_eq!(va.start_time, NOW - 5);
        assert_eq!(va.lockup_periods, vec![p(15, "120stake")]);
        assert_eq!(va.vesting_periods, vec![p(5, "20stake"), p(10, "100stake")]);
        assert_eq!(va.end_time, NOW + 10);
        assert!(va.validate().is_ok());
    }

    fn reward_account() -> ClawbackVestingAccount {
        let vesting: Vec<Period> = (0..8).map(|_| p(100, "500stake")).collect();
        grant_base("4000stake", vec![p(1, "4000stake")], vesting)
    }

    #[test]
    fn distribute_reward_to_future_periods() {
        let va = reward_account().distribute_reward(NOW + 350, "stake", &c("30stake")).unwrap();
        assert_eq!(va.original_vesting, c("4030stake"));
        for period in &va.vesting_periods[..3] {
            assert_eq!(period.amount, c("500stake"));
        }
        for period in &va.vesting_periods[3..] {
            assert_eq!(period.amount, c("506stake"));
        }
        assert_eq!(va.lockup_periods[0], p(0, "30stake"));
        assert!(va.validate().is_ok());
    }

    #[test]
    fn distributed_reward_is_unlocked_but_unvested() {
        let va = grant_base("100stake", vec![p(1000, "100stake")], vec![p(100, "50stake"), p(100, "50stake")]);
        let va = va.distribute_reward(NOW + 10, "stake", &c("10stake")).unwrap();
        assert_eq!(va.unlocked_only(NOW + 10), c("10stake"));
        assert_eq!(va.vested_only(NOW + 150), c("55stake"));
        assert_eq!(va.vested_coins(NOW + 150), c("10stake"));
        assert_eq!(va.locked_only(NOW + 10), c("100stake"));
    }

    #[test]
    fn distribute_reward_residue_goes_last() {
        let va = grant_base("3stake", vec![p(1, "3stake")], vec![p(1, "1stake"), p(1, "1stake"), p(1, "1stake")]);
        let va = va.distribute_reward(NOW, "stake", &c("10stake")).unwrap();
        let amounts: Vec<u128> = va.vesting_periods.iter().map(|p| p.amount.amount_of("stake")).collect();
        assert_eq!(amounts, vec![1 + 3, 1 + 3, 1 + 4]);
        assert_eq!(va.original_vesting, c("13stake"));
        assert!(va.validate().is_ok());
    }

    #[test]
    fn distribute_reward_merges_into_zero_length_lockup() {
        let va = grant_base("10stake", vec![p(0, "10stake")], vec![p(10, "10stake")]);
        let va = va.distribute_reward(NOW, "stake", &c("5stake")).unwrap();
        assert_eq!(va.lockup_periods, vec![p(0, "15stake")]);
    }

    #[test]
    fn distribute_reward_after_vesting_is_noop() {
        let va = reward_account();
        let after = va.clone().distribute_reward(NOW + 800, "stake", &c("30stake")).unwrap();
        assert_eq!(after, va);
    }

    #[test]
    fn validate_rejects_broken_accounts() {
        let mut va = halves_account();
        va.original_vesting = c("1fee");
        assert!(matches!(va.validate(), Err(ScheduleError::LockupTotalMismatch { .. })));

        let mut va = halves_account();
        va.end_time = NOW + HOUR;
        assert!(matches!(va.validate(), Err(ScheduleError::LockupBeyondEnd { .. })));

        let mut va = halves_account();
        va.vesting_periods[0].amount = c("1fee");
        assert!(matches!(va.validate(), Err(ScheduleError::VestingTotalMismatch { .. })));

        let mut va = halves_account();
        va.end_time = va.start_time;
        assert!(matches!(va.validate(), Err(ScheduleError::StartNotBeforeEnd { .. })));
    }

    #[test]
    fn account_enum_accessors() {
        let va = halves_account();
        let acc: Account = va.clone().into();
        assert!(acc.is_clawback());
        assert_eq!(acc.address(), va.address);
        assert_eq!(acc.account_number(), 7);
        assert_eq!(acc.locked_coins(NOW), c("1000fee,100stake"));
        let plain: Account = va.into_base().into();
        assert!(plain.as_clawback().is_none());
        assert!(plain.locked_coins(NOW).is_zero());
    }

    #[test]
    fn bincode_roundtrip() {
        let acc: Account = clawback_account().into();
        let bytes = bincode::encode_to_vec(&acc, bincode::config::standard()).unwrap();
        let (back, _): (Account, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(back, acc);
    }
}
