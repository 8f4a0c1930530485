//! Trait interfaces for the collaborators the vesting keeper calls out to.
//!
//! - [`AccountKeeper`]: account records (lockstep-store implements, plus
//!   [`MemoryAccountStore`](crate::memory::MemoryAccountStore))
//! - [`BankKeeper`]: balances and transfers
//! - [`StakingKeeper`]: delegations, unbonding and redelegation records
//!
//! Every collaborator is [`Transactional`]: a keeper operation opens a
//! transaction on each of them and either commits all or rolls all back.

use crate::account::{Account, BaseAccount};
use crate::address::Address;
use crate::coins::Coins;
use crate::error::LockstepError;
use crate::math::Dec;
use crate::staking::{Delegation, Redelegation, UnbondingDelegation, Validator};
use crate::types::Timestamp;

/// Staged writes that become visible to later reads immediately and durable
/// only on [`commit`](Transactional::commit).
pub trait Transactional {
    /// Start staging writes. Nested calls are not supported.
    fn begin(&mut self);

    /// Make staged writes durable.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NoTransaction`](crate::error::StoreError::NoTransaction) if `begin` was not called
    /// - [`StoreError::Backend`](crate::error::StoreError::Backend) if the backend rejects the write
    fn commit(&mut self) -> Result<(), LockstepError>;

    /// Discard staged writes. A no-op outside a transaction.
    fn rollback(&mut self);
}

/// Account records keyed by address.
pub trait AccountKeeper: Transactional {
    /// Look up an account. Returns `None` if the address has never been used.
    fn get_account(&self, address: &Address) -> Result<Option<Account>, LockstepError>;

    /// Insert or replace the account at `account.address()`.
    fn set_account(&mut self, account: Account) -> Result<(), LockstepError>;

    /// Allocate the next account number.
    fn next_account_number(&mut self) -> Result<u64, LockstepError>;

    /// A fresh base account with a newly allocated number. Not persisted.
    fn new_account(&mut self, address: Address) -> Result<BaseAccount, LockstepError> {
        Ok(BaseAccount::new(address, self.next_account_number()?))
    }

    fn has_account(&self, address: &Address) -> Result<bool, LockstepError> {
        Ok(self.get_account(address)?.is_some())
    }
}

/// Balances and transfers.
pub trait BankKeeper: Transactional {
    /// Full balance of `address`, including locked coins.
    fn get_all_balances(&self, address: &Address) -> Result<Coins, LockstepError>;

    fn get_balance(&self, address: &Address, denom: &str) -> Result<u128, LockstepError> {
        Ok(self.get_all_balances(address)?.amount_of(denom))
    }

    /// Whether `address` is barred from receiving funds.
    fn is_blocked(&self, address: &Address) -> bool;

    /// Move `amount` from `from` to `to`. Only the part of the sender's
    /// balance above `sender_locked` may be spent.
    ///
    /// # Errors
    ///
    /// - [`BankError::InsufficientFunds`](crate::error::BankError::InsufficientFunds) if any denom exceeds the spendable balance
    fn send_coins(
        &mut self,
        from: &Address,
        to: &Address,
        amount: &Coins,
        sender_locked: &Coins,
    ) -> Result<(), LockstepError>;
}

/// Staking state. Only the primitive record operations are exposed; the
/// vesting keeper composes transfers out of them.
pub trait StakingKeeper: Transactional {
    fn bond_denom(&self) -> String;

    /// Cap on entries in one unbonding delegation or redelegation.
    fn max_entries(&self) -> u32;

    fn validator(&self, operator: &Address) -> Result<Option<Validator>, LockstepError>;

    fn delegation(
        &self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Option<Delegation>, LockstepError>;

    /// Up to `max` delegations of `delegator`, ordered by validator.
    fn delegator_delegations(
        &self,
        delegator: &Address,
        max: u16,
    ) -> Result<Vec<Delegation>, LockstepError>;

    fn set_delegation(&mut self, delegation: Delegation) -> Result<(), LockstepError>;

    fn remove_delegation(
        &mut self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<(), LockstepError>;

    fn unbonding_delegation(
        &self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Option<UnbondingDelegation>, LockstepError>;

    /// Up to `max` unbonding delegations of `delegator`, ordered by validator.
    fn delegator_unbonding_delegations(
        &self,
        delegator: &Address,
        max: u16,
    ) -> Result<Vec<UnbondingDelegation>, LockstepError>;

    fn set_unbonding_delegation(&mut self, ubd: UnbondingDelegation) -> Result<(), LockstepError>;

    fn remove_unbonding_delegation(
        &mut self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<(), LockstepError>;

    /// Append an entry, merging into an existing entry with the same creation
    /// height and completion time. Creates the record if absent.
    fn set_unbonding_delegation_entry(
        &mut self,
        delegator: &Address,
        validator: &Address,
        creation_height: i64,
        completion_time: Timestamp,
        balance: u128,
    ) -> Result<UnbondingDelegation, LockstepError>;

    fn has_max_unbonding_delegation_entries(
        &self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<bool, LockstepError> {
        let max = self.max_entries() as usize;
        Ok(self
            .unbonding_delegation(delegator, validator)?
            .is_some_and(|ubd| ubd.entries.len() >= max))
    }

    /// Up to `max` redelegations of `delegator`, ordered by source then
    /// destination validator.
    fn delegator_redelegations(
        &self,
        delegator: &Address,
        max: u16,
    ) -> Result<Vec<Redelegation>, LockstepError>;

    fn redelegation(
        &self,
        delegator: &Address,
        validator_src: &Address,
        validator_dst: &Address,
    ) -> Result<Option<Redelegation>, LockstepError>;

    fn set_redelegation(&mut self, red: Redelegation) -> Result<(), LockstepError>;

    fn remove_redelegation(
        &mut self,
        delegator: &Address,
        validator_src: &Address,
        validator_dst: &Address,
    ) -> Result<(), LockstepError>;

    /// Append a redelegation entry, creating the record if absent.
    #[allow(clippy::too_many_arguments)]
    fn set_redelegation_entry(
        &mut self,
        delegator: &Address,
        validator_src: &Address,
        validator_dst: &Address,
        creation_height: i64,
        completion_time: Timestamp,
        initial_balance: u128,
        shares_dst: Dec,
    ) -> Result<Redelegation, LockstepError>;
}
