//! Error types for the vesting keeper.
use thiserror::Error;

use lockstep_core::error::{
    AccountError, AddressError, BankError, CoinError, LockstepError, ScheduleError, StakingError,
    StoreError,
};

/// Coarse classification of keeper failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected before any state was touched.
    Validation,
    NotFound,
    InsufficientFunds,
    Unauthorized,
    /// The addressed account exists but cannot take this operation.
    InvalidArgument,
    /// An account invariant would have been broken. Indicates a defect.
    Invariant,
    Store,
}

#[derive(Error, Debug)]
pub enum VestingError {
    #[error("invalid {field} address: {source}")] InvalidAddress { field: &'static str, source: AddressError },
    #[error("invalid schedule: {0}")] InvalidSchedule(ScheduleError),
    #[error("vesting and lockup schedules must have same total coins")] TotalsMismatch,
    #[error("new funder address is equal to current funder address")] SameFunder,
    #[error("invalid params: {0}")] InvalidParams(String),
    #[error("clawback can only be executed after vesting begins at {start}")] BeforeStart { start: i64 },
    #[error("account {0} does not exist")] AccountNotFound(String),
    #[error("account {0} already exists")] AccountExists(String),
    #[error("account {0} already exists; set merge to add a grant")] MergeRequired(String),
    #[error("account {0} is not a clawback vesting account")] NotClawbackAccount(String),
    #[error("vesting coins still left in account {0}")] StillVesting(String),
    #[error("{0} is not allowed to receive funds")] Blocked(String),
    #[error("account {account} only accepts grants from {funder}")] WrongFunder { account: String, funder: String },
    #[error("clawback can only be requested by original funder {0}")] NotFunder(String),
    #[error("account invariant violated: {0}")] Invariant(#[from] ScheduleError),
    #[error(transparent)] Core(#[from] LockstepError),
}

impl From<AccountError> for VestingError {
    fn from(e: AccountError) -> Self {
        Self::Core(e.into())
    }
}

impl From<CoinError> for VestingError {
    fn from(e: CoinError) -> Self {
        Self::Core(e.into())
    }
}

impl From<BankError> for VestingError {
    fn from(e: BankError) -> Self {
        Self::Core(e.into())
    }
}

impl From<StakingError> for VestingError {
    fn from(e: StakingError) -> Self {
        Self::Core(e.into())
    }
}

impl From<StoreError> for VestingError {
    fn from(e: StoreError) -> Self {
        Self::Core(e.into())
    }
}

fn coin_kind(e: &CoinError) -> ErrorKind {
    match e {
        CoinError::Negative { .. } => ErrorKind::InsufficientFunds,
        CoinError::Overflow | CoinError::DivisionByZero => ErrorKind::Invariant,
        _ => ErrorKind::Validation,
    }
}

impl VestingError {
    pub fn kind(&self) -> ErrorKind {
        use VestingError::*;
        match self {
            InvalidAddress { .. } | InvalidSchedule(_) | TotalsMismatch | SameFunder
            | InvalidParams(_) | BeforeStart { .. } => ErrorKind::Validation,
            AccountNotFound(_) => ErrorKind::NotFound,
            AccountExists(_) | MergeRequired(_) | NotClawbackAccount(_) | StillVesting(_) => {
                ErrorKind::InvalidArgument
            }
            Blocked(_) | WrongFunder { .. } | NotFunder(_) => ErrorKind::Unauthorized,
            Invariant(_) => ErrorKind::Invariant,
            Core(e) => match e {
                LockstepError::Coin(c) => coin_kind(c),
                LockstepError::Address(_) => ErrorKind::Validation,
                LockstepError::Schedule(_) => ErrorKind::Invariant,
                LockstepError::Account(a) => match a {
                    AccountError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
                    AccountError::Schedule(_) => ErrorKind::Invariant,
                    AccountError::Coin(c) => coin_kind(c),
                },
                LockstepError::Bank(b) => match b {
                    BankError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
                    BankError::BlockedAddress(_) => ErrorKind::Unauthorized,
                    BankError::Coin(c) => coin_kind(c),
                },
                LockstepError::Staking(s) => match s {
                    StakingError::ValidatorNotFound(_) | StakingError::DelegationNotFound { .. } => {
                        ErrorKind::NotFound
                    }
                    StakingError::InsufficientShares { .. } => ErrorKind::InsufficientFunds,
                    StakingError::MaxEntries { .. } | StakingError::NoTokens(_) => {
                        ErrorKind::InvalidArgument
                    }
                    StakingError::Coin(c) => coin_kind(c),
                },
                LockstepError::Store(_) => ErrorKind::Store,
            },
        }
    }
}
