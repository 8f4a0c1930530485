//! # lockstep-core
//! Foundation types and pure algorithms for Lockstep clawback vesting.
//!
//! - [`coins`]: multi-denom amounts with clipped subtraction and scaling
//! - [`schedule`]: the schedule algebra (read, disjunct, conjunct, align)
//! - [`account`]: the clawback vesting account model
//! - [`traits`]: collaborator contracts for accounts, bank and staking
//! - [`memory`]: in-memory collaborators for tests and simulations

pub mod account;
pub mod address;
pub mod coins;
pub mod constants;
pub mod context;
pub mod error;
pub mod math;
pub mod memory;
pub mod schedule;
pub mod staking;
pub mod traits;
pub mod types;
