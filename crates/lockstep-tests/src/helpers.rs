//! Shared fixtures for scenario tests.
//!
//! [`Harness`] owns a keeper and the three collaborators and plays the part
//! of the staking module: it books delegations with the keeper before moving
//! tokens out of the bank, and books undelegations only once unbonding
//! completes.

use lockstep_core::account::{Account, BaseAccount, ClawbackVestingAccount};
use lockstep_core::address::Address;
use lockstep_core::coins::Coins;
use lockstep_core::constants::ADDRESS_LEN;
use lockstep_core::context::Context;
use lockstep_core::math::Dec;
use lockstep_core::memory::{MemoryAccountStore, MemoryBank, MemoryStaking};
use lockstep_core::traits::{AccountKeeper, BankKeeper, StakingKeeper};
use lockstep_core::types::{total_amount, Period, Timestamp};
use lockstep_vesting::{VestingError, VestingKeeper};

pub const BOND_DENOM: &str = "stake";
pub const MAX_ENTRIES: u32 = 7;
pub const HOUR: Timestamp = 3_600;

/// Account address filled with `seed`.
pub fn acc(seed: u8) -> Address {
    Address::account([seed; ADDRESS_LEN])
}

/// Validator operator address filled with `seed`.
pub fn val(seed: u8) -> Address {
    Address::validator([seed; ADDRESS_LEN])
}

/// Parse a coin list such as `"100fee,50stake"`.
pub fn coins(s: &str) -> Coins {
    s.parse().unwrap_or_else(|e| panic!("bad coins {s:?}: {e}"))
}

pub fn stake(amount: u128) -> Coins {
    Coins::single(BOND_DENOM, amount).unwrap_or_default()
}

pub fn period(length: i64, amount: &str) -> Period {
    Period::new(length, coins(amount))
}

pub struct Harness<A = MemoryAccountStore> {
    pub keeper: VestingKeeper,
    pub accounts: A,
    pub bank: MemoryBank,
    pub staking: MemoryStaking,
    pub now: Timestamp,
    pub height: i64,
}

impl Harness<MemoryAccountStore> {
    pub fn new() -> Self {
        Self::with_accounts(MemoryAccountStore::new())
    }
}

impl Default for Harness<MemoryAccountStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: AccountKeeper> Harness<A> {
    pub fn with_accounts(accounts: A) -> Self {
        Self {
            keeper: VestingKeeper::default(),
            accounts,
            bank: MemoryBank::new(),
            staking: MemoryStaking::new(BOND_DENOM, MAX_ENTRIES),
            now: 0,
            height: 1,
        }
    }

    /// Run `f` with the keeper and a context at the current block.
    pub fn run<T>(&mut self, f: impl FnOnce(&VestingKeeper, &mut Context<'_>) -> T) -> T {
        let mut ctx = Context::new(
            self.now,
            self.height,
            &mut self.accounts,
            &mut self.bank,
            &mut self.staking,
        );
        f(&self.keeper, &mut ctx)
    }

    /// Move the clock to `t` and open a new block.
    pub fn advance_to(&mut self, t: Timestamp) {
        self.now = t;
        self.height += 1;
    }

    pub fn fund(&mut self, address: &Address, amount: &Coins) {
        self.bank.mint(address, amount).unwrap_or_else(|e| panic!("mint to {address}: {e}"));
    }

    /// Store a clawback vesting account under a fresh account number.
    pub fn put_vesting_account(
        &mut self,
        address: Address,
        funder: Address,
        start_time: Timestamp,
        lockup: &[Period],
        vesting: &[Period],
    ) -> ClawbackVestingAccount {
        let base = self.accounts.new_account(address).unwrap_or_else(|e| panic!("new account: {e}"));
        let original = total_amount(vesting).unwrap_or_else(|e| panic!("schedule total: {e}"));
        let va = ClawbackVestingAccount::new(base, funder, original, start_time, lockup, vesting);
        self.set_vesting_account(va.clone());
        va
    }

    pub fn set_vesting_account(&mut self, va: ClawbackVestingAccount) {
        self.accounts
            .set_account(va.into())
            .unwrap_or_else(|e| panic!("set account: {e}"));
    }

    pub fn put_base_account(&mut self, address: Address) -> BaseAccount {
        let base = self.accounts.new_account(address).unwrap_or_else(|e| panic!("new account: {e}"));
        self.accounts
            .set_account(Account::Base(base.clone()))
            .unwrap_or_else(|e| panic!("set account: {e}"));
        base
    }

    pub fn vesting_account(&self, address: &Address) -> ClawbackVestingAccount {
        match self.accounts.get_account(address) {
            Ok(Some(Account::ClawbackVesting(va))) => va,
            other => panic!("{address} is not a clawback vesting account: {other:?}"),
        }
    }

    pub fn add_validator(&mut self, operator: Address, tokens: u128) {
        self.staking
            .add_validator(operator, tokens)
            .unwrap_or_else(|e| panic!("add validator: {e}"));
    }

    pub fn balance(&self, address: &Address) -> Coins {
        self.bank.get_all_balances(address).unwrap_or_default()
    }

    /// Bond `tokens` from `delegator` to `validator`, returning the shares
    /// issued.
    pub fn delegate(
        &mut self,
        delegator: &Address,
        validator: &Address,
        tokens: u128,
    ) -> Result<Dec, VestingError> {
        let amount = stake(tokens);
        self.run(|keeper, ctx| keeper.track_delegation(ctx, delegator, &amount))?;
        self.bank.burn(delegator, &amount)?;
        Ok(self.staking.delegate(delegator, validator, tokens)?)
    }

    /// Start unbonding `tokens` worth of shares, maturing at `completion`.
    pub fn undelegate(
        &mut self,
        delegator: &Address,
        validator: &Address,
        tokens: u128,
        completion: Timestamp,
    ) -> Result<u128, VestingError> {
        let shares = self
            .staking
            .validator(validator)?
            .map(|v| v.shares_from_tokens_truncated(tokens))
            .transpose()?
            .unwrap_or(Dec::ZERO);
        Ok(self.staking.undelegate(delegator, validator, shares, self.height, completion)?)
    }

    /// Pay out every matured unbonding entry and book the undelegation with
    /// the keeper. Returns the tokens released.
    pub fn complete_unbonding(
        &mut self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<u128, VestingError> {
        let Some(mut ubd) = self.staking.unbonding_delegation(delegator, validator)? else {
            return Ok(0);
        };
        let now = self.now;
        let released: u128 = ubd
            .entries
            .iter()
            .filter(|e| e.completion_time <= now)
            .map(|e| e.balance)
            .sum();
        if released == 0 {
            return Ok(0);
        }
        ubd.entries.retain(|e| e.completion_time > now);
        if ubd.entries.is_empty() {
            self.staking.remove_unbonding_delegation(delegator, validator)?;
        } else {
            self.staking.set_unbonding_delegation(ubd)?;
        }

        let amount = stake(released);
        self.bank.mint(delegator, &amount)?;
        self.run(|keeper, ctx| keeper.track_undelegation(ctx, delegator, &amount))?;
        Ok(released)
    }

    /// Tokens currently bonded by `delegator` to `validator`.
    pub fn bonded(&self, delegator: &Address, validator: &Address) -> u128 {
        let Ok(Some(delegation)) = self.staking.delegation(delegator, validator) else {
            return 0;
        };
        let Ok(Some(v)) = self.staking.validator(validator) else {
            return 0;
        };
        v.tokens_from_shares_truncated(delegation.shares)
            .ok()
            .and_then(|d| d.round_int().ok())
            .unwrap_or(0)
    }

    /// Tokens `delegator` has unbonding from `validator`.
    pub fn unbonding(&self, delegator: &Address, validator: &Address) -> u128 {
        match self.staking.unbonding_delegation(delegator, validator) {
            Ok(Some(ubd)) => ubd.total_balance(),
            _ => 0,
        }
    }

    /// Plain bank transfer honouring the sender's lock.
    pub fn send(&mut self, from: &Address, to: &Address, amount: &Coins) -> Result<(), VestingError> {
        self.run(|keeper, ctx| keeper.send_coins(ctx, from, to, amount))
    }

    /// Mint `reward` to `address` and let the keeper vest it.
    pub fn reward(&mut self, address: &Address, reward: &Coins) -> Result<Coins, VestingError> {
        self.fund(address, reward);
        self.run(|keeper, ctx| keeper.post_reward(ctx, address, reward))
    }
}
