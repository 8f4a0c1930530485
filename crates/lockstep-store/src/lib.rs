//! # lockstep-store — Persistent account storage.
//!
//! - [`accounts::RocksAccountStore`]: an
//!   [`AccountKeeper`](lockstep_core::traits::AccountKeeper) over RocksDB,
//!   committing each transaction as one atomic write batch
//! - [`config::StoreConfig`]: database location and open options

pub mod accounts;
pub mod config;

pub use accounts::RocksAccountStore;
pub use config::StoreConfig;
