//! Messages accepted by the vesting keeper and their stateless checks.
//!
//! Addresses travel as bech32 strings and are parsed in `validate_basic`.
//! Handlers in [`msg_server`](crate::msg_server) run `validate_basic` before
//! touching any state.

use serde::{Deserialize, Serialize};

use lockstep_core::address::Address;
use lockstep_core::coins::Coins;
use lockstep_core::types::{total_amount, validate_positive_lengths, Period, Timestamp};

use crate::error::VestingError;

fn parse(field: &'static str, s: &str) -> Result<Address, VestingError> {
    Address::parse_account(s).map_err(|source| VestingError::InvalidAddress { field, source })
}

/// Create a clawback vesting account at `to_address` funded by
/// `from_address`, or merge a grant into an existing one when `merge` is set.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MsgCreateClawbackVestingAccount {
    pub from_address: String,
    pub to_address: String,
    pub start_time: Timestamp,
    #[serde(default)]
    pub lockup_periods: Vec<Period>,
    #[serde(default)]
    pub vesting_periods: Vec<Period>,
    #[serde(default)]
    pub merge: bool,
}

/// Parsed form of [`MsgCreateClawbackVestingAccount`] with both schedules
/// filled in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateGrant {
    pub funder: Address,
    pub recipient: Address,
    pub start_time: Timestamp,
    pub lockup_periods: Vec<Period>,
    pub vesting_periods: Vec<Period>,
    pub coins: Coins,
    pub merge: bool,
}

impl MsgCreateClawbackVestingAccount {
    pub fn validate_basic(&self) -> Result<(), VestingError> {
        parse("from", &self.from_address)?;
        parse("to", &self.to_address)?;
        validate_positive_lengths(&self.lockup_periods).map_err(VestingError::InvalidSchedule)?;
        validate_positive_lengths(&self.vesting_periods).map_err(VestingError::InvalidSchedule)?;

        if !self.lockup_periods.is_empty() && !self.vesting_periods.is_empty() {
            let lockup = total_amount(&self.lockup_periods)?;
            let vesting = total_amount(&self.vesting_periods)?;
            if lockup != vesting {
                return Err(VestingError::TotalsMismatch);
            }
        }
        Ok(())
    }

    /// Validate and resolve the message. A missing schedule becomes an
    /// instant one over the other schedule's total.
    pub fn into_grant(self) -> Result<CreateGrant, VestingError> {
        self.validate_basic()?;
        let funder = parse("from", &self.from_address)?;
        let recipient = parse("to", &self.to_address)?;

        let mut lockup_periods = self.lockup_periods;
        let mut vesting_periods = self.vesting_periods;
        let mut lockup = total_amount(&lockup_periods)?;
        let mut vesting = total_amount(&vesting_periods)?;
        if !vesting.is_zero() && lockup_periods.is_empty() {
            lockup_periods = vec![Period::new(0, vesting.clone())];
            lockup = vesting.clone();
        }
        if !lockup.is_zero() && vesting_periods.is_empty() {
            vesting_periods = vec![Period::new(0, lockup.clone())];
            vesting = lockup.clone();
        }
        if lockup != vesting {
            return Err(VestingError::TotalsMismatch);
        }

        Ok(CreateGrant {
            funder,
            recipient,
            start_time: self.start_time,
            lockup_periods,
            vesting_periods,
            coins: vesting,
            merge: self.merge,
        })
    }
}

/// Reclaim the unvested coins of `account_address`. The destination defaults
/// to the funder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MsgClawback {
    pub funder_address: String,
    pub account_address: String,
    #[serde(default)]
    pub dest_address: Option<String>,
}

impl MsgClawback {
    pub fn validate_basic(&self) -> Result<(), VestingError> {
        self.parsed().map(|_| ())
    }

    /// Funder, account and destination addresses.
    pub fn parsed(&self) -> Result<(Address, Address, Address), VestingError> {
        let funder = parse("funder", &self.funder_address)?;
        let account = parse("account", &self.account_address)?;
        let dest = match self.dest_address.as_deref() {
            None | Some("") => funder,
            Some(dest) => parse("dest", dest)?,
        };
        Ok((funder, account, dest))
    }
}

/// Hand the clawback right over `vesting_address` to a new funder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MsgUpdateVestingFunder {
    pub funder_address: String,
    pub new_funder_address: String,
    pub vesting_address: String,
}

impl MsgUpdateVestingFunder {
    pub fn validate_basic(&self) -> Result<(), VestingError> {
        self.parsed().map(|_| ())
    }

    /// Funder, new funder and vesting account addresses.
    pub fn parsed(&self) -> Result<(Address, Address, Address), VestingError> {
        let funder = parse("funder", &self.funder_address)?;
        let new_funder = parse("new funder", &self.new_funder_address)?;
        if funder == new_funder {
            return Err(VestingError::SameFunder);
        }
        let vesting = parse("vesting account", &self.vesting_address)?;
        Ok((funder, new_funder, vesting))
    }
}

/// Turn a finished clawback vesting account back into a plain account.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MsgConvertVestingAccount {
    pub vesting_address: String,
}

impl MsgConvertVestingAccount {
    pub fn validate_basic(&self) -> Result<(), VestingError> {
        self.parsed().map(|_| ())
    }

    pub fn parsed(&self) -> Result<Address, VestingError> {
        parse("vesting account", &self.vesting_address)
    }
}
