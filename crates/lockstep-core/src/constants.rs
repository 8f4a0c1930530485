//! Protocol constants. All times are Unix seconds, all amounts are base units.

/// Human-readable prefix for account addresses (`lock1...`).
pub const ACCOUNT_HRP: &str = "lock";

/// Human-readable prefix for validator operator addresses (`lockvaloper1...`).
pub const VALIDATOR_HRP: &str = "lockvaloper";

/// Length in bytes of the raw address payload.
pub const ADDRESS_LEN: usize = 20;

/// Default staking denomination.
pub const DEFAULT_BOND_DENOM: &str = "stake";

/// Default cap on entries per unbonding delegation or redelegation pair.
pub const DEFAULT_MAX_ENTRIES: u32 = 7;

/// Length of the synthetic cap period used when clawback truncates the lockup
/// schedule. The cap takes effect at the schedule start.
pub const CLAWBACK_CAP_LENGTH: i64 = 0;

/// Length of the synthetic cap period used when a grant merge absorbs
/// slashing losses. Kept distinct from [`CLAWBACK_CAP_LENGTH`]; both paths are
/// tested on their own.
pub const SLASH_CAP_LENGTH: i64 = 1;

/// Fixed-point precision for share decimals (18 places).
pub const DEC_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Minimum denom length.
pub const MIN_DENOM_LEN: usize = 3;

/// Maximum denom length.
pub const MAX_DENOM_LEN: usize = 128;
