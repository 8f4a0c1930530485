//! Events returned by successful message handlers.

use serde::{Deserialize, Serialize};

use lockstep_core::address::Address;
use lockstep_core::coins::Coins;
use lockstep_core::types::Timestamp;

use crate::clawback::ClawbackOutcome;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VestingEvent {
    CreateClawbackVestingAccount {
        funder: Address,
        account: Address,
        coins: Coins,
        start_time: Timestamp,
        merge: bool,
    },
    Clawback {
        funder: Address,
        account: Address,
        destination: Address,
        outcome: ClawbackOutcome,
    },
    UpdateVestingFunder {
        funder: Address,
        account: Address,
        new_funder: Address,
    },
    ConvertVestingAccount {
        account: Address,
    },
}

impl VestingEvent {
    /// Short name used as the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateClawbackVestingAccount { .. } => "create_clawback_vesting_account",
            Self::Clawback { .. } => "clawback",
            Self::UpdateVestingFunder { .. } => "update_vesting_funder",
            Self::ConvertVestingAccount { .. } => "convert_vesting_account",
        }
    }
}
