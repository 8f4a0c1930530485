//! Clawback orchestration.
//!
//! Unvested coins are recovered from three places, in order: the bank
//! balance, unbonding entries, then bonded delegations. Staking positions
//! change owner in place; nothing is undelegated.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lockstep_core::account::ClawbackVestingAccount;
use lockstep_core::address::Address;
use lockstep_core::coins::Coins;
use lockstep_core::context::Context;
use lockstep_core::error::StakingError;

use crate::delegation::{
    delegator_bonded, delegator_unbonding, transfer_delegation, transfer_unbonding,
};
use crate::error::VestingError;
use crate::keeper::VestingKeeper;

/// Where a clawback's coins came from.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClawbackOutcome {
    /// Unvested total removed from the schedules.
    pub unvested: Coins,
    /// Sent from the bank balance.
    pub sent: Coins,
    /// Bond-denom tokens moved as unbonding entries.
    pub unbonding: u128,
    /// Bond-denom tokens moved as delegation shares.
    pub bonded: u128,
}

impl VestingKeeper {
    /// Remove every future vesting event of `account` and move the unvested
    /// coins to `dest`.
    ///
    /// The truncated account is persisted before any transfer so that the
    /// bank sees the lock lifted. A shortfall after every source is exhausted
    /// is accepted: those coins were lost to slashing.
    pub fn clawback_from_account(
        &self,
        ctx: &mut Context<'_>,
        account: ClawbackVestingAccount,
        dest: &Address,
    ) -> Result<ClawbackOutcome, VestingError> {
        let now = ctx.block_time;
        let (mut updated, unvested) = account.compute_clawback(now)?;
        if unvested.is_zero() {
            return Ok(ClawbackOutcome::default());
        }

        let addr = updated.address;
        let bond_denom = ctx.staking.bond_denom();
        let max = self.params().max_iteration;

        let encumbered = updated.vesting_coins(now);
        let bonded = Coins::single(&bond_denom, delegator_bonded(&*ctx.staking, &addr, max)?)?;
        let unbonding =
            Coins::single(&bond_denom, delegator_unbonding(&*ctx.staking, &addr, max)?)?;
        let unbonded = ctx.bank.get_all_balances(&addr)?;
        let update =
            updated.update_delegation(&encumbered, &unvested, &bonded, &unbonding, &unbonded)?;
        updated.delegated_vesting = update.delegated_vesting;
        updated.delegated_free = update.delegated_free;
        self.set_clawback_account(ctx, updated)?;
        info!(address = %addr, amount = %update.to_clawback, dest = %dest, "clawing back");

        let spendable = self.spendable_coins(ctx, &addr)?;
        let sent = update.to_clawback.min(&spendable);
        if !sent.is_zero() {
            self.send_coins(ctx, &addr, dest, &sent)?;
            debug!(address = %addr, amount = %sent, "clawback sent from balance");
        }

        let mut want = update.to_clawback.saturating_sub(&sent).amount_of(&bond_denom);
        let mut outcome = ClawbackOutcome { unvested, sent, ..ClawbackOutcome::default() };

        if want > 0 {
            for ubd in ctx.staking.delegator_unbonding_delegations(&addr, max)? {
                let moved = transfer_unbonding(&mut *ctx.staking, &addr, dest, &ubd.validator, want)?;
                want = want.saturating_sub(moved);
                outcome.unbonding += moved;
                if want == 0 {
                    break;
                }
            }
            if outcome.unbonding > 0 {
                debug!(address = %addr, amount = outcome.unbonding, "clawback moved unbonding entries");
            }
        }

        if want > 0 {
            for delegation in ctx.staking.delegator_delegations(&addr, max)? {
                let Some(validator) = ctx.staking.validator(&delegation.validator)? else {
                    continue;
                };
                let want_shares = match validator.shares_from_tokens_truncated(want) {
                    Ok(shares) => shares,
                    Err(StakingError::NoTokens(_)) => continue,
                    Err(e) => return Err(e.into()),
                };
                let shares = transfer_delegation(
                    &mut *ctx.staking,
                    &addr,
                    dest,
                    &delegation.validator,
                    want_shares,
                    max,
                )?;
                // round up so the claim is never overstated
                let moved = validator.tokens_from_shares_round_up(shares)?.round_int()?;
                want = want.saturating_sub(moved);
                outcome.bonded += moved;
                if want == 0 {
                    break;
                }
            }
            if outcome.bonded > 0 {
                debug!(address = %addr, amount = outcome.bonded, "clawback moved delegations");
            }
        }

        if want > 0 {
            debug!(address = %addr, shortfall = want, "clawback shortfall");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::account::BaseAccount;
    use lockstep_core::constants::ADDRESS_LEN;
    use lockstep_core::memory::{MemoryAccountStore, MemoryBank, MemoryStaking};
    use lockstep_core::traits::AccountKeeper;
    use lockstep_core::types::Period;

    fn addr(b: u8) -> Address {
        Address::account([b; ADDRESS_LEN])
    }

    fn c(s: &str) -> Coins {
        s.parse().unwrap()
    }

    // 100stake vesting in four quarters of 10s, no lockup delay
    fn account() -> ClawbackVestingAccount {
        ClawbackVestingAccount::new(
            BaseAccount::new(addr(1), 0),
            addr(2),
            c("100stake"),
            0,
            &[Period::new(0, c("100stake"))],
            &[
                Period::new(10, c("25stake")),
                Period::new(10, c("25stake")),
                Period::new(10, c("25stake")),
                Period::new(10, c("25stake")),
            ],
        )
    }

    #[test]
    fn clawback_from_balance_only() {
        let keeper = VestingKeeper::default();
        let mut accounts = MemoryAccountStore::new();
        accounts.set_account(account().into()).unwrap();
        let mut bank = MemoryBank::new();
        bank.mint(&addr(1), &c("100stake")).unwrap();
        let mut staking = MemoryStaking::new("stake", 7);
        let mut ctx = Context::new(25, 1, &mut accounts, &mut bank, &mut staking);

        let va = keeper.get_clawback_account(&ctx, &addr(1)).unwrap();
        let out = keeper.clawback_from_account(&mut ctx, va, &addr(2)).unwrap();
        assert_eq!(out.unvested, c("50stake"));
        assert_eq!(out.sent, c("50stake"));
        assert_eq!((out.unbonding, out.bonded), (0, 0));
        assert_eq!(ctx.bank.get_all_balances(&addr(2)).unwrap(), c("50stake"));

        let va = keeper.get_clawback_account(&ctx, &addr(1)).unwrap();
        assert_eq!(va.original_vesting, c("50stake"));
        assert_eq!(va.vesting_periods.len(), 2);
        assert!(va.locked_coins(25).is_zero());
    }

    #[test]
    fn nothing_unvested_is_a_noop() {
        let keeper = VestingKeeper::default();
        let mut accounts = MemoryAccountStore::new();
        accounts.set_account(account().into()).unwrap();
        let mut bank = MemoryBank::new();
        bank.mint(&addr(1), &c("100stake")).unwrap();
        let mut staking = MemoryStaking::new("stake", 7);
        let mut ctx = Context::new(40, 1, &mut accounts, &mut bank, &mut staking);

        let va = keeper.get_clawback_account(&ctx, &addr(1)).unwrap();
        let out = keeper.clawback_from_account(&mut ctx, va.clone(), &addr(2)).unwrap();
        assert_eq!(out, ClawbackOutcome::default());
        assert_eq!(keeper.get_clawback_account(&ctx, &addr(1)).unwrap(), va);
        assert!(ctx.bank.get_all_balances(&addr(2)).unwrap().is_zero());
    }

    #[test]
    fn clawback_reaches_into_delegations() {
        let keeper = VestingKeeper::default();
        let val = Address::validator([9; ADDRESS_LEN]);
        let mut accounts = MemoryAccountStore::new();
        accounts.set_account(account().into()).unwrap();
        let mut bank = MemoryBank::new();
        bank.mint(&addr(1), &c("100stake")).unwrap();
        let mut staking = MemoryStaking::new("stake", 7);
        staking.add_validator(val, 1000).unwrap();

        // delegate 80 of the 100 while everything is still vesting
        {
            let mut ctx = Context::new(0, 1, &mut accounts, &mut bank, &mut staking);
            keeper.track_delegation(&mut ctx, &addr(1), &c("80stake")).unwrap();
        }
        bank.burn(&addr(1), &c("80stake")).unwrap();
        staking.delegate(&addr(1), &val, 80).unwrap();

        let mut ctx = Context::new(15, 2, &mut accounts, &mut bank, &mut staking);
        let va = keeper.get_clawback_account(&ctx, &addr(1)).unwrap();
        let out = keeper.clawback_from_account(&mut ctx, va, &addr(2)).unwrap();
        assert_eq!(out.unvested, c("75stake"));
        assert_eq!(out.sent, c("20stake"));
        assert_eq!(out.bonded, 55);

        let moved = ctx.staking.delegation(&addr(2), &val).unwrap().unwrap();
        assert_eq!(moved.shares.truncate_int().unwrap(), 55);
        let va = keeper.get_clawback_account(&ctx, &addr(1)).unwrap();
        assert_eq!(va.original_vesting, c("25stake"));
        assert_eq!(va.delegated_free, c("25stake"));
        assert!(va.delegated_vesting.is_zero());
    }
}
