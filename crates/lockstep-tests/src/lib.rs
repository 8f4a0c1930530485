//! Scenario test suite for Lockstep.
//!
//! Drives the vesting keeper against the in-memory collaborators (and the
//! RocksDB account store) through whole account lifecycles: grants,
//! delegation, slashing, rewards and clawback.

pub mod helpers;
