//! Staking reward posting.
//!
//! A reward paid into a clawback vesting account is partly earned by unvested
//! stake. That part is added to the future vesting periods so a later
//! clawback can reclaim it. Rewards are never locked.

use tracing::debug;

use lockstep_core::address::Address;
use lockstep_core::coins::Coins;
use lockstep_core::context::Context;

use crate::delegation::{delegator_bonded, delegator_unbonding};
use crate::error::VestingError;
use crate::keeper::VestingKeeper;

impl VestingKeeper {
    /// Encumber the unvested share of a reward already credited to
    /// `address`. Returns the amount added to the vesting schedule.
    ///
    /// The share is estimated on the bond denom: scheduled unvested tokens,
    /// clamped by what the account really holds (ambiguous tokens count as
    /// unvested), then restricted to bonded tokens (preferring vested ones).
    pub fn post_reward(
        &self,
        ctx: &mut Context<'_>,
        address: &Address,
        reward: &Coins,
    ) -> Result<Coins, VestingError> {
        let va = self.get_clawback_account(ctx, address)?;
        let now = ctx.block_time;
        let bond_denom = ctx.staking.bond_denom();

        let vested = va.vested_only(now).amount_of(&bond_denom);
        let unvested = va.original_vesting.amount_of(&bond_denom).saturating_sub(vested);
        if unvested == 0 {
            return Ok(Coins::new());
        }

        let encumbered = if vested == 0 {
            reward.clone()
        } else {
            let max = self.params().max_iteration;
            let bonded = delegator_bonded(&*ctx.staking, address, max)?;
            let unbonding = delegator_unbonding(&*ctx.staking, address, max)?;
            let unbonded = ctx.bank.get_balance(address, &bond_denom)?;
            let total = bonded.saturating_add(unbonding).saturating_add(unbonded);
            // pre-reward holdings
            let total = total.saturating_sub(total.min(reward.amount_of(&bond_denom)));

            let unvested = unvested.min(total);
            let vested = (total - unvested).min(bonded);
            let unvested = bonded - vested;
            if unvested == 0 {
                return Ok(Coins::new());
            }
            if vested == 0 {
                reward.clone()
            } else {
                reward.scale(unvested, bonded)?
            }
        };

        let before = va.original_vesting.clone();
        let va = va.distribute_reward(now, &bond_denom, &encumbered)?;
        let added = va.original_vesting.saturating_sub(&before);
        if added.is_zero() {
            return Ok(added);
        }
        debug!(address = %address, amount = %added, "reward added to vesting schedule");
        self.set_clawback_account(ctx, va)?;
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::account::{BaseAccount, ClawbackVestingAccount};
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

    fn account() -> ClawbackVestingAccount {
        ClawbackVestingAccount::new(
            BaseAccount::new(addr(1), 0),
            addr(2),
            c("400stake"),
            0,
            &[Period::new(0, c("400stake"))],
            &[Period::new(100, c("200stake")), Period::new(100, c("200stake"))],
        )
    }

    #[test]
    fn fully_unvested_takes_whole_reward() {
        let keeper = VestingKeeper::default();
        let mut accounts = MemoryAccountStore::new();
        accounts.set_account(account().into()).unwrap();
        let mut bank = MemoryBank::new();
        bank.mint(&addr(1), &c("410stake")).unwrap();
        let mut staking = MemoryStaking::new("stake", 7);
        let mut ctx = Context::new(50, 1, &mut accounts, &mut bank, &mut staking);

        let added = keeper.post_reward(&mut ctx, &addr(1), &c("10stake")).unwrap();
        assert_eq!(added, c("10stake"));
        let va = keeper.get_clawback_account(&ctx, &addr(1)).unwrap();
        assert_eq!(va.original_vesting, c("410stake"));
        assert_eq!(va.vesting_periods[0].amount, c("205stake"));
        assert_eq!(va.vesting_periods[1].amount, c("205stake"));
        assert_eq!(va.lockup_periods[0].amount, c("410stake"));
    }

    #[test]
    fn fully_vested_ignores_reward() {
        let keeper = VestingKeeper::default();
        let mut accounts = MemoryAccountStore::new();
        accounts.set_account(account().into()).unwrap();
        let mut bank = MemoryBank::new();
        let mut staking = MemoryStaking::new("stake", 7);
        let mut ctx = Context::new(200, 1, &mut accounts, &mut bank, &mut staking);

        assert!(keeper.post_reward(&mut ctx, &addr(1), &c("10stake")).unwrap().is_zero());
        assert_eq!(keeper.get_clawback_account(&ctx, &addr(1)).unwrap(), account());
    }

    #[test]
    fn unbonded_stake_earns_nothing() {
        // half vested, nothing bonded: the reward cannot come from unvested stake
        let keeper = VestingKeeper::default();
        let mut accounts = MemoryAccountStore::new();
        accounts.set_account(account().into()).unwrap();
        let mut bank = MemoryBank::new();
        bank.mint(&addr(1), &c("410stake")).unwrap();
        let mut staking = MemoryStaking::new("stake", 7);
        let mut ctx = Context::new(100, 1, &mut accounts, &mut bank, &mut staking);

        assert!(keeper.post_reward(&mut ctx, &addr(1), &c("10stake")).unwrap().is_zero());
    }

    #[test]
    fn non_clawback_account_is_rejected() {
        let keeper = VestingKeeper::default();
        let mut accounts = MemoryAccountStore::new();
        accounts.set_account(BaseAccount::new(addr(1), 0).into()).unwrap();
        let mut bank = MemoryBank::new();
        let mut staking = MemoryStaking::new("stake", 7);
        let mut ctx = Context::new(0, 1, &mut accounts, &mut bank, &mut staking);
        assert!(keeper.post_reward(&mut ctx, &addr(1), &c("1stake")).is_err());
    }

    proptest::proptest! {
        #[test]
        fn added_never_exceeds_reward(bonded in 1u128..=400, reward in 0u128..1_000, t in 0i64..=250) {
            let keeper = VestingKeeper::default();
            let mut accounts = MemoryAccountStore::new();
            accounts.set_account(account().into()).unwrap();
            let mut bank = MemoryBank::new();
            let mut staking = MemoryStaking::new("stake", 7);
            let validator = Address::validator([9; ADDRESS_LEN]);
            staking.add_validator(validator, 0).unwrap();
            staking.delegate(&addr(1), &validator, bonded).unwrap();
            let reward = Coins::single("stake", reward).unwrap();
            bank.mint(&addr(1), &Coins::single("stake", 400 - bonded).unwrap().add(&reward)).unwrap();
            let mut ctx = Context::new(t, 1, &mut accounts, &mut bank, &mut staking);

            let added = keeper.post_reward(&mut ctx, &addr(1), &reward).unwrap();
            proptest::prop_assert!(added.is_all_lte(&reward));
            let va = keeper.get_clawback_account(&ctx, &addr(1)).unwrap();
            proptest::prop_assert_eq!(&va.original_vesting, &c("400stake").add(&added));
            proptest::prop_assert!(va.validate().is_ok());
        }
    }
}
