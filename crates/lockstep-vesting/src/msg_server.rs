//! Message handlers.
//!
//! Each handler validates its message, then runs inside
//! [`Context::atomically`]: on error nothing it wrote survives.

use tracing::{info, warn};

use lockstep_core::account::{Account, ClawbackVestingAccount};
use lockstep_core::context::Context;

use crate::error::VestingError;
use crate::events::VestingEvent;
use crate::keeper::VestingKeeper;
use crate::msg::{
    CreateGrant, MsgClawback, MsgConvertVestingAccount, MsgCreateClawbackVestingAccount,
    MsgUpdateVestingFunder,
};

impl VestingKeeper {
    /// Create a clawback vesting account funded by the sender, or merge a
    /// grant into the recipient's existing one.
    ///
    /// # Errors
    ///
    /// - [`VestingError::Blocked`] if the recipient may not receive funds
    /// - [`VestingError::AccountExists`] / [`VestingError::MergeRequired`] if
    ///   the recipient exists and `merge` is unset
    /// - [`VestingError::NotClawbackAccount`] when merging into a plain account
    /// - [`VestingError::WrongFunder`] when merging a grant from another funder
    pub fn create_clawback_vesting_account(
        &self,
        ctx: &mut Context<'_>,
        msg: MsgCreateClawbackVestingAccount,
    ) -> Result<VestingEvent, VestingError> {
        let grant = msg.into_grant()?;
        ctx.atomically(|ctx| self.create_or_merge(ctx, grant))
            .inspect_err(|e| warn!(error = %e, "create clawback vesting account rolled back"))
    }

    fn create_or_merge(
        &self,
        ctx: &mut Context<'_>,
        grant: CreateGrant,
    ) -> Result<VestingEvent, VestingError> {
        let CreateGrant { funder, recipient, start_time, lockup_periods, vesting_periods, coins, merge } =
            grant;

        if ctx.bank.is_blocked(&recipient) {
            return Err(VestingError::Blocked(recipient.to_string()));
        }

        match ctx.accounts.get_account(&recipient)? {
            Some(existing) => {
                let va = match (merge, existing) {
                    (false, Account::ClawbackVesting(_)) => {
                        return Err(VestingError::MergeRequired(recipient.to_string()))
                    }
                    (false, Account::Base(_)) => {
                        return Err(VestingError::AccountExists(recipient.to_string()))
                    }
                    (true, Account::Base(_)) => {
                        return Err(VestingError::NotClawbackAccount(recipient.to_string()))
                    }
                    (true, Account::ClawbackVesting(va)) => va,
                };
                if va.funder_address != funder {
                    return Err(VestingError::WrongFunder {
                        account: recipient.to_string(),
                        funder: va.funder_address.to_string(),
                    });
                }
                let va =
                    self.add_grant(ctx, va, start_time, &lockup_periods, &vesting_periods, &coins)?;
                self.set_clawback_account(ctx, va)?;
                info!(address = %recipient, funder = %funder, amount = %coins, "merged grant into vesting account");
            }
            None => {
                let base = ctx.accounts.new_account(recipient)?;
                let va = ClawbackVestingAccount::new(
                    base,
                    funder,
                    coins.clone(),
                    start_time,
                    &lockup_periods,
                    &vesting_periods,
                );
                self.set_clawback_account(ctx, va)?;
                info!(address = %recipient, funder = %funder, amount = %coins, "created clawback vesting account");
            }
        }

        self.send_coins(ctx, &funder, &recipient, &coins)?;
        Ok(VestingEvent::CreateClawbackVestingAccount {
            funder,
            account: recipient,
            coins,
            start_time,
            merge,
        })
    }

    /// Claw back the unvested coins of an account on behalf of its funder.
    ///
    /// # Errors
    ///
    /// - [`VestingError::Blocked`] if the destination may not receive funds
    /// - [`VestingError::NotFunder`] if the sender is not the account's funder
    /// - [`VestingError::BeforeStart`] before the account's vesting starts
    pub fn clawback(
        &self,
        ctx: &mut Context<'_>,
        msg: MsgClawback,
    ) -> Result<VestingEvent, VestingError> {
        let (funder, account, dest) = msg.parsed()?;
        ctx.atomically(|ctx| {
            if ctx.bank.is_blocked(&dest) {
                return Err(VestingError::Blocked(dest.to_string()));
            }
            let va = self.get_clawback_account(ctx, &account)?;
            if va.funder_address != funder {
                return Err(VestingError::NotFunder(va.funder_address.to_string()));
            }
            if ctx.block_time < va.start_time {
                return Err(VestingError::BeforeStart { start: va.start_time });
            }
            let outcome = self.clawback_from_account(ctx, va, &dest)?;
            Ok(VestingEvent::Clawback { funder, account, destination: dest, outcome })
        })
        .inspect_err(|e| warn!(error = %e, "clawback rolled back"))
    }

    /// Replace the funder of a clawback vesting account.
    pub fn update_vesting_funder(
        &self,
        ctx: &mut Context<'_>,
        msg: MsgUpdateVestingFunder,
    ) -> Result<VestingEvent, VestingError> {
        let (funder, new_funder, account) = msg.parsed()?;
        ctx.atomically(|ctx| {
            // the funder is the default clawback destination
            if ctx.bank.is_blocked(&new_funder) {
                return Err(VestingError::Blocked(new_funder.to_string()));
            }
            let mut va = self.get_clawback_account(ctx, &account)?;
            if va.funder_address != funder {
                return Err(VestingError::NotFunder(va.funder_address.to_string()));
            }
            va.funder_address = new_funder;
            self.set_clawback_account(ctx, va)?;
            info!(address = %account, funder = %funder, new_funder = %new_funder, "updated vesting funder");
            Ok(VestingEvent::UpdateVestingFunder { funder, account, new_funder })
        })
        .inspect_err(|e| warn!(error = %e, "update vesting funder rolled back"))
    }

    /// Convert a clawback vesting account with nothing left vesting back into
    /// a plain account.
    pub fn convert_vesting_account(
        &self,
        ctx: &mut Context<'_>,
        msg: MsgConvertVestingAccount,
    ) -> Result<VestingEvent, VestingError> {
        let account = msg.parsed()?;
        ctx.atomically(|ctx| {
            let va = self.get_clawback_account(ctx, &account)?;
            if !va.vesting_coins(ctx.block_time).is_zero() {
                return Err(VestingError::StillVesting(account.to_string()));
            }
            ctx.accounts.set_account(Account::Base(va.into_base()))?;
            info!(address = %account, "converted vesting account");
            Ok(VestingEvent::ConvertVestingAccount { account })
        })
        .inspect_err(|e| warn!(error = %e, "convert vesting account rolled back"))
    }
}
