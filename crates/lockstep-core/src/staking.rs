//! Staking records as seen through the staking collaborator.
//!
//! Only the fields clawback and grant merging touch are modelled. Share and
//! token conversions follow the usual pool arithmetic:
//! `tokens = shares * validator.tokens / validator.delegator_shares`.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{CoinError, StakingError};
use crate::math::Dec;
use crate::types::Timestamp;

#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Validator {
    pub operator: Address,
    pub tokens: u128,
    pub delegator_shares: Dec,
}

impl Validator {
    /// A validator with `tokens` self-bonded at one share per token.
    pub fn new(operator: Address, tokens: u128) -> Self {
        Self { operator, tokens, delegator_shares: Dec::from_int(tokens) }
    }

    /// Shares worth `amount` tokens, truncated. Fails when the validator holds
    /// no tokens.
    pub fn shares_from_tokens_truncated(&self, amount: u128) -> Result<Dec, StakingError> {
        if self.tokens == 0 {
            return Err(StakingError::NoTokens(self.operator.to_string()));
        }
        Ok(self.delegator_shares.mul_ratio_truncated(amount, self.tokens)?)
    }

    /// Tokens backing `shares`, truncated.
    pub fn tokens_from_shares_truncated(&self, shares: Dec) -> Result<Dec, CoinError> {
        if self.delegator_shares.is_zero() {
            return Ok(Dec::ZERO);
        }
        shares.mul_int_quo_truncated(self.tokens, self.delegator_shares)
    }

    /// Tokens backing `shares`, rounded up.
    pub fn tokens_from_shares_round_up(&self, shares: Dec) -> Result<Dec, CoinError> {
        if self.delegator_shares.is_zero() {
            return Ok(Dec::ZERO);
        }
        shares.mul_int_quo_round_up(self.tokens, self.delegator_shares)
    }
}

#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Delegation {
    pub delegator: Address,
    pub validator: Address,
    pub shares: Dec,
}

#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct UnbondingEntry {
    pub creation_height: i64,
    pub completion_time: Timestamp,
    pub initial_balance: u128,
    pub balance: u128,
}

#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct UnbondingDelegation {
    pub delegator: Address,
    pub validator: Address,
    pub entries: Vec<UnbondingEntry>,
}

impl UnbondingDelegation {
    pub fn total_balance(&self) -> u128 {
        self.entries.iter().fold(0u128, |acc, e| acc.saturating_add(e.balance))
    }
}

#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct RedelegationEntry {
    pub creation_height: i64,
    pub completion_time: Timestamp,
    pub initial_balance: u128,
    pub shares_dst: Dec,
}

#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Redelegation {
    pub delegator: Address,
    pub validator_src: Address,
    pub validator_dst: Address,
    pub entries: Vec<RedelegationEntry>,
}
