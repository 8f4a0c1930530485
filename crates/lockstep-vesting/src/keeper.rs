//! The vesting keeper.
//!
//! [`VestingKeeper`] holds no state of its own: every operation takes a
//! [`Context`] carrying the block time and the account, bank and staking
//! collaborators. Clawback, grant merge, rewards and message handling are
//! implemented in sibling modules as further `impl VestingKeeper` blocks.

use tracing::debug;

use lockstep_core::account::{Account, ClawbackVestingAccount};
use lockstep_core::address::Address;
use lockstep_core::coins::Coins;
use lockstep_core::context::Context;

use crate::error::VestingError;
use crate::params::VestingParams;

#[derive(Clone, Debug, Default)]
pub struct VestingKeeper {
    params: VestingParams,
}

impl VestingKeeper {
    pub fn new(params: VestingParams) -> Result<Self, VestingError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &VestingParams {
        &self.params
    }

    /// Load the clawback vesting account at `address`.
    ///
    /// # Errors
    ///
    /// - [`VestingError::AccountNotFound`] if nothing is stored there
    /// - [`VestingError::NotClawbackAccount`] for any other kind of account
    pub fn get_clawback_account(
        &self,
        ctx: &Context<'_>,
        address: &Address,
    ) -> Result<ClawbackVestingAccount, VestingError> {
        match ctx.accounts.get_account(address)? {
            None => Err(VestingError::AccountNotFound(address.to_string())),
            Some(Account::Base(_)) => Err(VestingError::NotClawbackAccount(address.to_string())),
            Some(Account::ClawbackVesting(va)) => Ok(va),
        }
    }

    /// Persist a clawback vesting account, checking its invariants first when
    /// `strict_invariants` is set.
    pub fn set_clawback_account(
        &self,
        ctx: &mut Context<'_>,
        account: ClawbackVestingAccount,
    ) -> Result<(), VestingError> {
        if self.params.strict_invariants {
            account.validate()?;
        }
        ctx.accounts.set_account(account.into())?;
        Ok(())
    }

    /// Coins the bank must hold back for `address` at the context's time.
    pub fn locked_coins(&self, ctx: &Context<'_>, address: &Address) -> Result<Coins, VestingError> {
        Ok(ctx
            .accounts
            .get_account(address)?
            .map(|acc| acc.locked_coins(ctx.block_time))
            .unwrap_or_default())
    }

    /// Balance of `address` minus its locked coins.
    pub fn spendable_coins(
        &self,
        ctx: &Context<'_>,
        address: &Address,
    ) -> Result<Coins, VestingError> {
        let balance = ctx.bank.get_all_balances(address)?;
        Ok(balance.saturating_sub(&self.locked_coins(ctx, address)?))
    }

    /// Transfer through the bank, honouring the sender's lock as currently
    /// stored.
    pub fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<(), VestingError> {
        let locked = self.locked_coins(ctx, from)?;
        ctx.bank.send_coins(from, to, amount, &locked)?;
        Ok(())
    }

    /// Book a delegation of `amount` by `delegator` against its current bank
    /// balance. Plain accounts need no bookkeeping.
    pub fn track_delegation(
        &self,
        ctx: &mut Context<'_>,
        delegator: &Address,
        amount: &Coins,
    ) -> Result<(), VestingError> {
        let Some(Account::ClawbackVesting(mut va)) = ctx.accounts.get_account(delegator)? else {
            return Ok(());
        };
        let balance = ctx.bank.get_all_balances(delegator)?;
        va.track_delegation(ctx.block_time, &balance, amount)?;
        debug!(address = %delegator, amount = %amount, "tracked delegation");
        self.set_clawback_account(ctx, va)
    }

    /// Book an undelegation of `amount` by `delegator`.
    pub fn track_undelegation(
        &self,
        ctx: &mut Context<'_>,
        delegator: &Address,
        amount: &Coins,
    ) -> Result<(), VestingError> {
        let Some(Account::ClawbackVesting(mut va)) = ctx.accounts.get_account(delegator)? else {
            return Ok(());
        };
        va.track_undelegation(amount)?;
        debug!(address = %delegator, amount = %amount, "tracked undelegation");
        self.set_clawback_account(ctx, va)
    }
}
