//! Error types for the Lockstep protocol.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinError {
    #[error("invalid denom: {0}")] InvalidDenom(String),
    #[error("duplicate denom: {0}")] DuplicateDenom(String),
    #[error("invalid coin expression: {0}")] InvalidCoin(String),
    #[error("negative result for {denom}: have {have}, need {need}")] Negative { denom: String, have: u128, need: u128 },
    #[error("amount overflow")] Overflow,
    #[error("division by zero")] DivisionByZero,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid HRP")] InvalidHrp,
    #[error("invalid length")] InvalidLength,
    #[error("invalid checksum")] InvalidChecksum,
    #[error("invalid character: {0}")] InvalidCharacter(char),
    #[error("invalid padding bits")] InvalidPadding,
    #[error("unknown prefix: {0}")] UnknownPrefix(String),
    #[error("missing separator")] MissingSeparator,
    #[error("mixed case")] MixedCase,
    #[error("wrong address kind: expected {expected}, got {got}")] WrongKind { expected: &'static str, got: &'static str },
    #[error("empty address")] Empty,
}

/// Violations of the account and schedule invariants.
///
/// These indicate a defect in whatever produced the account, never a user
/// mistake; user input is screened by message validation first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("vesting start-time {start} must be before end-time {end}")] StartNotBeforeEnd { start: i64, end: i64 },
    #[error("lockup schedule ends at {lockup_end}, beyond account end time {end}")] LockupBeyondEnd { lockup_end: i64, end: i64 },
    #[error("vesting schedule ends at {vesting_end}, beyond account end time {end}")] VestingBeyondEnd { vesting_end: i64, end: i64 },
    #[error("original vesting {original} does not match lockup total {total}")] LockupTotalMismatch { original: String, total: String },
    #[error("original vesting {original} does not match vesting total {total}")] VestingTotalMismatch { original: String, total: String },
    #[error("invalid period length of {length} in period {index}, length must be greater than 0")] NonPositiveLength { index: usize, length: i64 },
    #[error("negative period length of {length} in period {index}")] NegativeLength { index: usize, length: i64 },
    #[error("vesting start time {vesting} should match lockup start {lockup}")] StartMismatch { lockup: i64, vesting: i64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("insufficient funds for {denom}: have {have}, need {need}")] InsufficientFunds { denom: String, have: u128, need: u128 },
    #[error(transparent)] Schedule(#[from] ScheduleError),
    #[error(transparent)] Coin(#[from] CoinError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BankError {
    #[error("insufficient funds for {denom}: spendable {have}, need {need}")] InsufficientFunds { denom: String, have: u128, need: u128 },
    #[error("{0} is not allowed to receive funds")] BlockedAddress(String),
    #[error(transparent)] Coin(#[from] CoinError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("validator not found: {0}")] ValidatorNotFound(String),
    #[error("delegation not found: {delegator} -> {validator}")] DelegationNotFound { delegator: String, validator: String },
    #[error("insufficient shares: have {have}, need {need}")] InsufficientShares { have: String, need: String },
    #[error("too many entries for {delegator} -> {validator}")] MaxEntries { delegator: String, validator: String },
    #[error("validator has no tokens: {0}")] NoTokens(String),
    #[error(transparent)] Coin(#[from] CoinError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("backend: {0}")] Backend(String),
    #[error("codec: {0}")] Codec(String),
    #[error("no open transaction")] NoTransaction,
}

#[derive(Error, Debug)]
pub enum LockstepError {
    #[error(transparent)] Coin(#[from] CoinError),
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Schedule(#[from] ScheduleError),
    #[error(transparent)] Account(#[from] AccountError),
    #[error(transparent)] Bank(#[from] BankError),
    #[error(transparent)] Staking(#[from] StakingError),
    #[error(transparent)] Store(#[from] StoreError),
}
