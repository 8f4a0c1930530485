//! In-memory collaborators for tests and simulations.
//!
//! Each store keeps its state in `BTreeMap`s (canonical iteration order) and
//! implements [`Transactional`] by snapshotting the whole state on `begin`.
//! No persistence; lockstep-store provides the RocksDB-backed account store.

use std::collections::{BTreeMap, BTreeSet};

use crate::account::Account;
use crate::address::Address;
use crate::coins::Coins;
use crate::error::{BankError, CoinError, LockstepError, StakingError, StoreError};
use crate::math::{mul_div, Dec, Rounding};
use crate::staking::{
    Delegation, Redelegation, RedelegationEntry, UnbondingDelegation, UnbondingEntry, Validator,
};
use crate::traits::{AccountKeeper, BankKeeper, StakingKeeper, Transactional};
use crate::types::Timestamp;

/// Snapshot-on-begin state holder shared by the memory stores.
#[derive(Clone, Debug, Default)]
struct Staged<S: Clone> {
    state: S,
    snapshot: Option<S>,
}

impl<S: Clone> Staged<S> {
    fn begin(&mut self) {
        self.snapshot = Some(self.state.clone());
    }

    fn commit(&mut self) -> Result<(), LockstepError> {
        match self.snapshot.take() {
            Some(_) => Ok(()),
            None => Err(StoreError::NoTransaction.into()),
        }
    }

    fn rollback(&mut self) {
        if let Some(previous) = self.snapshot.take() {
            self.state = previous;
        }
    }
}

// ------------------------------------------------------------------------- //
// Accounts

#[derive(Clone, Debug, Default)]
struct AccountState {
    accounts: BTreeMap<Address, Account>,
    next_number: u64,
}

/// In-memory account store.
#[derive(Clone, Debug, Default)]
pub struct MemoryAccountStore {
    inner: Staged<AccountState>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.state.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.accounts.is_empty()
    }
}

impl Transactional for MemoryAccountStore {
    fn begin(&mut self) {
        self.inner.begin();
    }

    fn commit(&mut self) -> Result<(), LockstepError> {
        self.inner.commit()
    }

    fn rollback(&mut self) {
        self.inner.rollback();
    }
}

impl AccountKeeper for MemoryAccountStore {
    fn get_account(&self, address: &Address) -> Result<Option<Account>, LockstepError> {
        Ok(self.inner.state.accounts.get(address).cloned())
    }

    fn set_account(&mut self, account: Account) -> Result<(), LockstepError> {
        self.inner.state.accounts.insert(account.address(), account);
        Ok(())
    }

    fn next_account_number(&mut self) -> Result<u64, LockstepError> {
        let n = self.inner.state.next_number;
        self.inner.state.next_number = n.saturating_add(1);
        Ok(n)
    }
}

// ------------------------------------------------------------------------- //
// Bank

#[derive(Clone, Debug, Default)]
struct BankState {
    balances: BTreeMap<Address, Coins>,
}

/// In-memory bank with a fixed set of blocked addresses.
#[derive(Clone, Debug, Default)]
pub struct MemoryBank {
    inner: Staged<BankState>,
    blocked: BTreeSet<Address>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` out of thin air.
    pub fn mint(&mut self, address: &Address, amount: &Coins) -> Result<(), LockstepError> {
        let balance = self.inner.state.balances.entry(*address).or_default();
        *balance = balance.checked_add(amount)?;
        Ok(())
    }

    /// Debit `amount`, ignoring any lock.
    pub fn burn(&mut self, address: &Address, amount: &Coins) -> Result<(), LockstepError> {
        let balance = self.inner.state.balances.entry(*address).or_default();
        *balance = balance.checked_sub(amount)?;
        Ok(())
    }

    pub fn block(&mut self, address: Address) {
        self.blocked.insert(address);
    }
}

impl Transactional for MemoryBank {
    fn begin(&mut self) {
        self.inner.begin();
    }

    fn commit(&mut self) -> Result<(), LockstepError> {
        self.inner.commit()
    }

    fn rollback(&mut self) {
        self.inner.rollback();
    }
}

impl BankKeeper for MemoryBank {
    fn get_all_balances(&self, address: &Address) -> Result<Coins, LockstepError> {
        Ok(self.inner.state.balances.get(address).cloned().unwrap_or_default())
    }

    fn is_blocked(&self, address: &Address) -> bool {
        self.blocked.contains(address)
    }

    fn send_coins(
        &mut self,
        from: &Address,
        to: &Address,
        amount: &Coins,
        sender_locked: &Coins,
    ) -> Result<(), LockstepError> {
        let balance = self.get_all_balances(from)?;
        let spendable = balance.saturating_sub(sender_locked);
        if let Some((denom, need)) = amount.iter().find(|(d, a)| *a > spendable.amount_of(d)) {
            return Err(BankError::InsufficientFunds {
                denom: denom.to_string(),
                have: spendable.amount_of(denom),
                need,
            }
            .into());
        }
        self.burn(from, amount)?;
        self.mint(to, amount)
    }
}

// ------------------------------------------------------------------------- //
// Staking

type PairKey = (Address, Address);
type TripleKey = (Address, Address, Address);

#[derive(Clone, Debug, Default)]
struct StakingState {
    validators: BTreeMap<Address, Validator>,
    delegations: BTreeMap<PairKey, Delegation>,
    unbonding: BTreeMap<PairKey, UnbondingDelegation>,
    redelegations: BTreeMap<TripleKey, Redelegation>,
}

/// In-memory staking state.
///
/// Token movements between the bank and the bonded pool are the caller's
/// business: [`delegate`](Self::delegate) and friends only touch staking
/// records.
#[derive(Clone, Debug)]
pub struct MemoryStaking {
    inner: Staged<StakingState>,
    bond_denom: String,
    max_entries: u32,
}

impl MemoryStaking {
    pub fn new(bond_denom: impl Into<String>, max_entries: u32) -> Self {
        Self { inner: Staged::default(), bond_denom: bond_denom.into(), max_entries }
    }

    fn state(&self) -> &StakingState {
        &self.inner.state
    }

    fn state_mut(&mut self) -> &mut StakingState {
        &mut self.inner.state
    }

    fn validator_or_err(&self, operator: &Address) -> Result<Validator, LockstepError> {
        self.state()
            .validators
            .get(operator)
            .cloned()
            .ok_or_else(|| StakingError::ValidatorNotFound(operator.to_string()).into())
    }

    /// Register a validator with `tokens` self-bonded.
    pub fn add_validator(&mut self, operator: Address, tokens: u128) -> Result<(), LockstepError> {
        let validator = Validator::new(operator, tokens);
        self.state_mut().validators.insert(operator, validator);
        Ok(())
    }

    /// Bond `tokens` to `validator`, returning the shares issued.
    pub fn delegate(
        &mut self,
        delegator: &Address,
        validator: &Address,
        tokens: u128,
    ) -> Result<Dec, LockstepError> {
        let mut val = self.validator_or_err(validator)?;
        let shares = if val.tokens == 0 {
            Dec::from_int(tokens)
        } else {
            val.shares_from_tokens_truncated(tokens)?
        };
        val.tokens = val.tokens.checked_add(tokens).ok_or(CoinError::Overflow)?;
        val.delegator_shares = val.delegator_shares.checked_add(shares)?;
        self.state_mut().validators.insert(*validator, val);

        let mut delegation = self.delegation(delegator, validator)?.unwrap_or(Delegation {
            delegator: *delegator,
            validator: *validator,
            shares: Dec::ZERO,
        });
        delegation.shares = delegation.shares.checked_add(shares)?;
        self.set_delegation(delegation)?;
        Ok(shares)
    }

    /// Remove `shares` from a delegation and burn them on the validator,
    /// returning the tokens they were worth.
    fn unbond(
        &mut self,
        delegator: &Address,
        validator: &Address,
        shares: Dec,
    ) -> Result<u128, LockstepError> {
        let mut delegation = self.delegation(delegator, validator)?.ok_or_else(|| {
            StakingError::DelegationNotFound {
                delegator: delegator.to_string(),
                validator: validator.to_string(),
            }
        })?;
        if shares > delegation.shares {
            return Err(StakingError::InsufficientShares {
                have: delegation.shares.to_string(),
                need: shares.to_string(),
            }
            .into());
        }
        let mut val = self.validator_or_err(validator)?;
        let tokens = val.tokens_from_shares_truncated(shares)?.truncate_int()?;
        val.tokens = val.tokens.saturating_sub(tokens);
        val.delegator_shares = val.delegator_shares.saturating_sub(shares);
        self.state_mut().validators.insert(*validator, val);

        delegation.shares = delegation.shares.saturating_sub(shares);
        if delegation.shares.is_zero() {
            self.remove_delegation(delegator, validator)?;
        } else {
            self.set_delegation(delegation)?;
        }
        Ok(tokens)
    }

    /// Begin unbonding `shares`, creating an unbonding entry. Returns the
    /// tokens entering the unbonding queue.
    pub fn undelegate(
        &mut self,
        delegator: &Address,
        validator: &Address,
        shares: Dec,
        creation_height: i64,
        completion_time: Timestamp,
    ) -> Result<u128, LockstepError> {
        if self.has_max_unbonding_delegation_entries(delegator, validator)? {
            return Err(StakingError::MaxEntries {
                delegator: delegator.to_string(),
                validator: validator.to_string(),
            }
            .into());
        }
        let tokens = self.unbond(delegator, validator, shares)?;
        self.set_unbonding_delegation_entry(
            delegator,
            validator,
            creation_height,
            completion_time,
            tokens,
        )?;
        Ok(tokens)
    }

    /// Move `shares` from `src` to `dst`, recording a redelegation entry.
    /// Returns the shares issued by `dst`.
    pub fn redelegate(
        &mut self,
        delegator: &Address,
        src: &Address,
        dst: &Address,
        shares: Dec,
        creation_height: i64,
        completion_time: Timestamp,
    ) -> Result<Dec, LockstepError> {
        let tokens = self.unbond(delegator, src, shares)?;
        let shares_dst = self.delegate(delegator, dst, tokens)?;
        self.set_redelegation_entry(
            delegator,
            src,
            dst,
            creation_height,
            completion_time,
            tokens,
            shares_dst,
        )?;
        Ok(shares_dst)
    }

    /// Burn `numerator / denominator` of the validator's bonded tokens.
    /// Returns the amount burned.
    pub fn slash(
        &mut self,
        validator: &Address,
        numerator: u128,
        denominator: u128,
    ) -> Result<u128, LockstepError> {
        let mut val = self.validator_or_err(validator)?;
        let burned = mul_div(val.tokens, numerator, denominator, Rounding::Down)?;
        val.tokens = val.tokens.saturating_sub(burned);
        self.state_mut().validators.insert(*validator, val);
        Ok(burned)
    }
}

impl Transactional for MemoryStaking {
    fn begin(&mut self) {
        self.inner.begin();
    }

    fn commit(&mut self) -> Result<(), LockstepError> {
        self.inner.commit()
    }

    fn rollback(&mut self) {
        self.inner.rollback();
    }
}

impl StakingKeeper for MemoryStaking {
    fn bond_denom(&self) -> String {
        self.bond_denom.clone()
    }

    fn max_entries(&self) -> u32 {
        self.max_entries
    }

    fn validator(&self, operator: &Address) -> Result<Option<Validator>, LockstepError> {
        Ok(self.state().validators.get(operator).cloned())
    }

    fn delegation(
        &self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Option<Delegation>, LockstepError> {
        Ok(self.state().delegations.get(&(*delegator, *validator)).cloned())
    }

    fn delegator_delegations(
        &self,
        delegator: &Address,
        max: u16,
    ) -> Result<Vec<Delegation>, LockstepError> {
        Ok(self
            .state()
            .delegations
            .values()
            .filter(|d| d.delegator == *delegator)
            .take(max as usize)
            .cloned()
            .collect())
    }

    fn set_delegation(&mut self, delegation: Delegation) -> Result<(), LockstepError> {
        self.state_mut()
            .delegations
            .insert((delegation.delegator, delegation.validator), delegation);
        Ok(())
    }

    fn remove_delegation(
        &mut self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<(), LockstepError> {
        self.state_mut().delegations.remove(&(*delegator, *validator));
        Ok(())
    }

    fn unbonding_delegation(
        &self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Option<UnbondingDelegation>, LockstepError> {
        Ok(self.state().unbonding.get(&(*delegator, *validator)).cloned())
    }

    fn delegator_unbonding_delegations(
        &self,
        delegator: &Address,
        max: u16,
    ) -> Result<Vec<UnbondingDelegation>, LockstepError> {
        Ok(self
            .state()
            .unbonding
            .values()
            .filter(|u| u.delegator == *delegator)
            .take(max as usize)
            .cloned()
            .collect())
    }

    fn set_unbonding_delegation(&mut self, ubd: UnbondingDelegation) -> Result<(), LockstepError> {
        self.state_mut().unbonding.insert((ubd.delegator, ubd.validator), ubd);
        Ok(())
    }

    fn remove_unbonding_delegation(
        &mut self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<(), LockstepError> {
        self.state_mut().unbonding.remove(&(*delegator, *validator));
        Ok(())
    }

    fn set_unbonding_delegation_entry(
        &mut self,
        delegator: &Address,
        validator: &Address,
        creation_height: i64,
        completion_time: Timestamp,
        balance: u128,
    ) -> Result<UnbondingDelegation, LockstepError> {
        let mut ubd = self.unbonding_delegation(delegator, validator)?.unwrap_or(
            UnbondingDelegation { delegator: *delegator, validator: *validator, entries: Vec::new() },
        );
        match ubd.entries.iter_mut().find(|e| {
            e.creation_height == creation_height && e.completion_time == completion_time
        }) {
            Some(entry) => {
                entry.initial_balance = entry.initial_balance.saturating_add(balance);
                entry.balance = entry.balance.saturating_add(balance);
            }
            None => ubd.entries.push(UnbondingEntry {
                creation_height,
                completion_time,
                initial_balance: balance,
                balance,
            }),
        }
        self.set_unbonding_delegation(ubd.clone())?;
        Ok(ubd)
    }

    fn delegator_redelegations(
        &self,
        delegator: &Address,
        max: u16,
    ) -> Result<Vec<Redelegation>, LockstepError> {
        Ok(self
            .state()
            .redelegations
            .values()
            .filter(|r| r.delegator == *delegator)
            .take(max as usize)
            .cloned()
            .collect())
    }

    fn redelegation(
        &self,
        delegator: &Address,
        validator_src: &Address,
        validator_dst: &Address,
    ) -> Result<Option<Redelegation>, LockstepError> {
        Ok(self
            .state()
            .redelegations
            .get(&(*delegator, *validator_src, *validator_dst))
            .cloned())
    }

    fn set_redelegation(&mut self, red: Redelegation) -> Result<(), LockstepError> {
        self.state_mut()
            .redelegations
            .insert((red.delegator, red.validator_src, red.validator_dst), red);
        Ok(())
    }

    fn remove_redelegation(
        &mut self,
        delegator: &Address,
        validator_src: &Address,
        validator_dst: &Address,
    ) -> Result<(), LockstepError> {
        self.state_mut()
            .redelegations
            .remove(&(*delegator, *validator_src, *validator_dst));
        Ok(())
    }

    fn set_redelegation_entry(
        &mut self,
        delegator: &Address,
        validator_src: &Address,
        validator_dst: &Address,
        creation_height: i64,
        completion_time: Timestamp,
        initial_balance: u128,
        shares_dst: Dec,
    ) -> Result<Redelegation, LockstepError> {
        let mut red = self
            .redelegation(delegator, validator_src, validator_dst)?
            .unwrap_or(Redelegation {
                delegator: *delegator,
                validator_src: *validator_src,
                validator_dst: *validator_dst,
                entries: Vec::new(),
            });
        red.entries.push(RedelegationEntry {
            creation_height,
            completion_time,
            initial_balance,
            shares_dst,
        });
        self.set_redelegation(red.clone())?;
        Ok(red)
    }
}
