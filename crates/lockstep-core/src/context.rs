//! Execution context for one keeper operation.
//!
//! Carries the logical block time and height plus handles to the three
//! collaborators. [`Context::atomically`] wraps an operation so that either
//! every collaborator commits or every one rolls back.

use crate::error::LockstepError;
use crate::traits::{AccountKeeper, BankKeeper, StakingKeeper, Transactional};
use crate::types::Timestamp;

pub struct Context<'a> {
    pub block_time: Timestamp,
    pub block_height: i64,
    pub accounts: &'a mut dyn AccountKeeper,
    pub bank: &'a mut dyn BankKeeper,
    pub staking: &'a mut dyn StakingKeeper,
}

impl<'a> Context<'a> {
    pub fn new(
        block_time: Timestamp,
        block_height: i64,
        accounts: &'a mut dyn AccountKeeper,
        bank: &'a mut dyn BankKeeper,
        staking: &'a mut dyn StakingKeeper,
    ) -> Self {
        Self { block_time, block_height, accounts, bank, staking }
    }

    /// Run `f` inside a transaction on every collaborator.
    ///
    /// On `Ok` the account store commits first: it is the collaborator whose
    /// commit can fail on a backend write. Bank and staking follow, and a
    /// failed commit rolls back whatever has not committed yet. On `Err`
    /// everything rolls back and the error is returned unchanged.
    pub fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<LockstepError>,
    {
        self.accounts.begin();
        self.bank.begin();
        self.staking.begin();

        match f(self) {
            Ok(value) => {
                if let Err(e) = self.accounts.commit() {
                    self.bank.rollback();
                    self.staking.rollback();
                    return Err(e.into());
                }
                if let Err(e) = self.bank.commit() {
                    self.staking.rollback();
                    return Err(e.into());
                }
                self.staking.commit().map_err(E::from)?;
                Ok(value)
            }
            Err(e) => {
                self.staking.rollback();
                self.bank.rollback();
                self.accounts.rollback();
                Err(e)
            }
        }
    }
}
