//! Merging a further grant into an existing clawback vesting account.

use tracing::{debug, warn};

use lockstep_core::account::ClawbackVestingAccount;
use lockstep_core::coins::Coins;
use lockstep_core::context::Context;
use lockstep_core::types::{Period, Timestamp};

use crate::delegation::{delegator_bonded, delegator_unbonding};
use crate::error::VestingError;
use crate::keeper::VestingKeeper;

impl VestingKeeper {
    /// Bond-denom tokens `address` actually has in staking, bonded plus
    /// unbonding.
    pub(crate) fn delegated_coins(
        &self,
        ctx: &Context<'_>,
        account: &ClawbackVestingAccount,
    ) -> Result<Coins, VestingError> {
        let max = self.params().max_iteration;
        let bonded = delegator_bonded(&*ctx.staking, &account.address, max)?;
        let unbonding = delegator_unbonding(&*ctx.staking, &account.address, max)?;
        Ok(Coins::single(ctx.staking.bond_denom(), bonded.saturating_add(unbonding))?)
    }

    /// Merge a grant into `account`. Returns the updated account; the caller
    /// persists it.
    ///
    /// Unvested coins lost to slashing are first cut from the tail of both
    /// schedules, then the grant is merged in and the delegation split is
    /// recomputed against what staking really holds.
    pub fn add_grant(
        &self,
        ctx: &Context<'_>,
        account: ClawbackVestingAccount,
        grant_start: Timestamp,
        grant_lockup: &[Period],
        grant_vesting: &[Period],
        grant_coins: &Coins,
    ) -> Result<ClawbackVestingAccount, VestingError> {
        let delegated = self.delegated_coins(ctx, &account)?;

        let (account, slashed) = account.absorb_slashing(&delegated)?;
        if !slashed.is_zero() {
            warn!(address = %account.address, amount = %slashed, "absorbed slashed unvested coins");
        }

        let mut account = account.add_grant(grant_start, grant_lockup, grant_vesting, grant_coins)?;
        account.reset_delegation(ctx.block_time, &delegated);
        debug!(address = %account.address, amount = %grant_coins, start = grant_start, "merged grant");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::account::BaseAccount;
    use lockstep_core::address::Address;
    use lockstep_core::constants::ADDRESS_LEN;
    use lockstep_core::memory::{MemoryAccountStore, MemoryBank, MemoryStaking};

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
            c("100stake"),
            0,
            &[Period::new(50, c("100stake"))],
            &[Period::new(50, c("50stake")), Period::new(50, c("50stake"))],
        )
    }

    #[test]
    fn merge_without_staking() {
        let keeper = VestingKeeper::default();
        let mut accounts = MemoryAccountStore::new();
        let mut bank = MemoryBank::new();
        let mut staking = MemoryStaking::new("stake", 7);
        let ctx = Context::new(10, 1, &mut accounts, &mut bank, &mut staking);

        let merged = keeper
            .add_grant(
                &ctx,
                account(),
                20,
                &[Period::new(10, c("10stake"))],
                &[Period::new(100, c("10stake"))],
                &c("10stake"),
            )
            .unwrap();
        assert_eq!(merged.original_vesting, c("110stake"));
        assert_eq!(merged.start_time, 0);
        assert_eq!(merged.end_time, 120);
        assert!(merged.validate().is_ok());
        assert!(merged.delegated_vesting.is_zero());
    }

    #[test]
    fn merge_absorbs_slashing() {
        let keeper = VestingKeeper::default();
        let val = Address::validator([9; ADDRESS_LEN]);
        let mut accounts = MemoryAccountStore::new();
        let mut bank = MemoryBank::new();
        let mut staking = MemoryStaking::new("stake", 7);
        staking.add_validator(val, 0).unwrap();
        // 40 booked as delegated, only 30 left after a slash
        staking.delegate(&addr(1), &val, 40).unwrap();
        staking.slash(&val, 1, 4).unwrap();
        let ctx = Context::new(10, 1, &mut accounts, &mut bank, &mut staking);

        let mut va = account();
        va.delegated_vesting = c("40stake");

        let merged = keeper.add_grant(&ctx, va, 10, &[], &[], &Coins::new()).unwrap();
        assert_eq!(merged.original_vesting, c("90stake"));
        assert_eq!(merged.delegated_vesting, c("30stake"));
        assert!(merged.delegated_free.is_zero());
        assert!(merged.validate().is_ok());
    }
}
