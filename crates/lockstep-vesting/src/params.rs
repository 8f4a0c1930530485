//! Keeper parameters.
//!
//! Provides [`VestingParams`] with defaults suitable for production. The bond
//! denom and entry cap belong to the staking collaborator and are read from it
//! at call time.

use serde::{Deserialize, Serialize};

use crate::error::VestingError;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct VestingParams {
    /// Upper bound on delegations and unbonding delegations visited per
    /// clawback.
    pub max_iteration: u16,
    /// Validate every account before it is persisted; a violation aborts the
    /// operation.
    pub strict_invariants: bool,
}

impl Default for VestingParams {
    fn default() -> Self {
        Self { max_iteration: u16::MAX, strict_invariants: true }
    }
}

impl VestingParams {
    /// Parse parameters from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, VestingError> {
        let params: Self =
            serde_json::from_str(json).map_err(|e| VestingError::InvalidParams(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), VestingError> {
        if self.max_iteration == 0 {
            return Err(VestingError::InvalidParams("max_iteration must be positive".into()));
        }
        Ok(())
    }
}
