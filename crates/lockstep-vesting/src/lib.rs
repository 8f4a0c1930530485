//! # lockstep-vesting — Clawback vesting keeper.
//!
//! Orchestrates clawback vesting accounts against the account, bank and
//! staking collaborators carried by a [`Context`](lockstep_core::context::Context):
//! - [`keeper::VestingKeeper`]: account access, locked/spendable coins and
//!   delegation tracking
//! - [`clawback`]: reclaiming unvested coins from balance, unbonding entries
//!   and delegations
//! - [`grant`]: merging further grants, absorbing slashed stake
//! - [`reward`]: encumbering the unvested share of staking rewards
//! - [`msg_server`]: atomic message handlers returning [`events::VestingEvent`]
//! - [`query`]: locked, vested and unvested views

pub mod clawback;
pub mod delegation;
pub mod error;
pub mod events;
pub mod grant;
pub mod keeper;
pub mod msg;
pub mod msg_server;
pub mod params;
pub mod query;
pub mod reward;

pub use clawback::ClawbackOutcome;
pub use error::{ErrorKind, VestingError};
pub use events::VestingEvent;
pub use keeper::VestingKeeper;
pub use msg::{MsgClawback, MsgConvertVestingAccount, MsgCreateClawbackVestingAccount, MsgUpdateVestingFunder};
pub use params::VestingParams;
pub use query::BalancesResponse;
