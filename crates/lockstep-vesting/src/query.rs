//! Read-only queries over clawback vesting accounts at the context's time.

use serde::{Deserialize, Serialize};

use lockstep_core::account::ClawbackVestingAccount;
use lockstep_core::address::Address;
use lockstep_core::coins::Coins;
use lockstep_core::context::Context;

use crate::error::VestingError;
use crate::keeper::VestingKeeper;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BalancesResponse {
    /// Still under lockup.
    pub locked: Coins,
    /// Not yet vested.
    pub unvested: Coins,
    /// Vested, whether or not unlocked.
    pub vested: Coins,
}

impl VestingKeeper {
    fn query_account(
        &self,
        ctx: &Context<'_>,
        address: &str,
    ) -> Result<ClawbackVestingAccount, VestingError> {
        let address = Address::parse_account(address)
            .map_err(|source| VestingError::InvalidAddress { field: "account", source })?;
        self.get_clawback_account(ctx, &address)
    }

    pub fn balances(&self, ctx: &Context<'_>, address: &str) -> Result<BalancesResponse, VestingError> {
        let va = self.query_account(ctx, address)?;
        let t = ctx.block_time;
        Ok(BalancesResponse {
            locked: va.locked_only(t),
            unvested: va.unvested_only(t),
            vested: va.vested_only(t),
        })
    }

    pub fn locked(&self, ctx: &Context<'_>, address: &str) -> Result<Coins, VestingError> {
        Ok(self.query_account(ctx, address)?.locked_only(ctx.block_time))
    }

    pub fn unvested(&self, ctx: &Context<'_>, address: &str) -> Result<Coins, VestingError> {
        Ok(self.query_account(ctx, address)?.unvested_only(ctx.block_time))
    }

    pub fn vested(&self, ctx: &Context<'_>, address: &str) -> Result<Coins, VestingError> {
        Ok(self.query_account(ctx, address)?.vested_only(ctx.block_time))
    }
}
