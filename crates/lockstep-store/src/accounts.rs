//! RocksDB-backed account store.
//!
//! Accounts live in the `accounts` column family keyed by raw address bytes
//! and encoded with bincode. The next account number sits in `metadata`.
//!
//! Writes made between [`begin`](Transactional::begin) and
//! [`commit`](Transactional::commit) are staged in memory and visible to
//! reads; commit flushes them as one [`WriteBatch`]. Outside a transaction
//! every write goes straight to disk.

use std::collections::BTreeMap;
use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};
use tracing::debug;

use lockstep_core::account::Account;
use lockstep_core::address::Address;
use lockstep_core::error::{LockstepError, StoreError};
use lockstep_core::traits::{AccountKeeper, Transactional};

use crate::config::StoreConfig;

const CF_ACCOUNTS: &str = "accounts";
const CF_METADATA: &str = "metadata";

const ALL_CFS: &[&str] = &[CF_ACCOUNTS, CF_METADATA];

const META_NEXT_ACCOUNT_NUMBER: &[u8] = b"next_account_number";

fn backend(e: rocksdb::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[derive(Default)]
struct Pending {
    accounts: BTreeMap<Address, Account>,
    next_number: Option<u64>,
}

pub struct RocksAccountStore {
    db: DB,
    pending: Option<Pending>,
}

impl RocksAccountStore {
    /// Open the database described by `config`, creating missing column
    /// families.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(config.create_if_missing);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, &config.path, cf_descriptors).map_err(backend)?;
        debug!(path = %config.path.display(), "opened account store");
        Ok(Self { db, pending: None })
    }

    /// Open or create a database at `path`.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(&StoreConfig::new(path))
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map_err(backend)
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    // --- Internal helpers ---

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Backend(format!("missing column family: {name}")))
    }

    fn encode_account(account: &Account) -> Result<Vec<u8>, StoreError> {
        bincode::encode_to_vec(account, bincode::config::standard())
            .map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn load_account(&self, address: &Address) -> Result<Option<Account>, StoreError> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let Some(bytes) = self.db.get_cf(cf, address.as_bytes()).map_err(backend)? else {
            return Ok(None);
        };
        let (account, _): (Account, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard()).map_err(|e| {
                StoreError::Codec(format!("account {}: {e}", hex::encode(address.as_bytes())))
            })?;
        Ok(Some(account))
    }

    fn load_next_number(&self) -> Result<u64, StoreError> {
        let cf = self.cf_handle(CF_METADATA)?;
        match self.db.get_cf(cf, META_NEXT_ACCOUNT_NUMBER).map_err(backend)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::Codec("invalid account number length".into()))?;
                Ok(u64::from_le_bytes(raw))
            }
            None => Ok(0),
        }
    }

    fn write(&self, accounts: &BTreeMap<Address, Account>, next_number: Option<u64>) -> Result<(), StoreError> {
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let cf_meta = self.cf_handle(CF_METADATA)?;
        let mut batch = WriteBatch::default();
        for (address, account) in accounts {
            batch.put_cf(cf_accounts, address.as_bytes(), Self::encode_account(account)?);
        }
        if let Some(n) = next_number {
            batch.put_cf(cf_meta, META_NEXT_ACCOUNT_NUMBER, n.to_le_bytes());
        }
        self.db.write(batch).map_err(backend)
    }
}

impl Transactional for RocksAccountStore {
    fn begin(&mut self) {
        self.pending = Some(Pending::default());
    }

    fn commit(&mut self) -> Result<(), LockstepError> {
        let pending = self.pending.take().ok_or(StoreError::NoTransaction)?;
        self.write(&pending.accounts, pending.next_number)?;
        debug!(accounts = pending.accounts.len(), "committed account writes");
        Ok(())
    }

    fn rollback(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(accounts = pending.accounts.len(), "discarded account writes");
        }
    }
}

impl AccountKeeper for RocksAccountStore {
    fn get_account(&self, address: &Address) -> Result<Option<Account>, LockstepError> {
        if let Some(account) = self.pending.as_ref().and_then(|p| p.accounts.get(address)) {
            return Ok(Some(account.clone()));
        }
        Ok(self.load_account(address)?)
    }

    fn set_account(&mut self, account: Account) -> Result<(), LockstepError> {
        match self.pending.as_mut() {
            Some(pending) => {
                pending.accounts.insert(account.address(), account);
            }
            None => {
                let single = BTreeMap::from([(account.address(), account)]);
                self.write(&single, None)?;
            }
        }
        Ok(())
    }

    fn next_account_number(&mut self) -> Result<u64, LockstepError> {
        let staged = self.pending.as_ref().and_then(|p| p.next_number);
        let number = match staged {
            Some(n) => n,
            None => self.load_next_number()?,
        };
        let next = number.checked_add(1).ok_or_else(|| StoreError::Backend("account numbers exhausted".into()))?;
        match self.pending.as_mut() {
            Some(pending) => pending.next_number = Some(next),
            None => self.write(&BTreeMap::new(), Some(next))?,
        }
        Ok(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::account::{BaseAccount, ClawbackVestingAccount};
    use lockstep_core::constants::ADDRESS_LEN;
    use lockstep_core::types::Period;

    fn temp_store() -> (RocksAccountStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksAccountStore::open_path(dir.path().join("accounts")).unwrap();
        (store, dir)
    }

    fn addr(b: u8) -> Address {
        Address::account([b; ADDRESS_LEN])
    }

    fn vesting(b: u8) -> Account {
        ClawbackVestingAccount::new(
            BaseAccount::new(addr(b), 7),
            addr(99),
            "100stake".parse().unwrap(),
            1_000,
            &[Period::new(50, "100stake".parse().unwrap())],
            &[Period::new(100, "100stake".parse().unwrap())],
        )
        .into()
    }

    #[test]
    fn write_through_outside_transaction() {
        let (mut store, _dir) = temp_store();
        assert!(store.get_account(&addr(1)).unwrap().is_none());
        store.set_account(vesting(1)).unwrap();
        assert_eq!(store.get_account(&addr(1)).unwrap(), Some(vesting(1)));
        assert!(store.has_account(&addr(1)).unwrap());
    }

    #[test]
    fn staged_writes_visible_then_committed() {
        let (mut store, _dir) = temp_store();
        store.begin();
        store.set_account(vesting(1)).unwrap();
        assert_eq!(store.get_account(&addr(1)).unwrap(), Some(vesting(1)));
        assert!(store.load_account(&addr(1)).unwrap().is_none());
        store.commit().unwrap();
        assert!(!store.in_transaction());
        assert_eq!(store.load_account(&addr(1)).unwrap(), Some(vesting(1)));
    }

    #[test]
    fn rollback_discards() {
        let (mut store, _dir) = temp_store();
        store.begin();
        store.set_account(vesting(2)).unwrap();
        assert_eq!(store.next_account_number().unwrap(), 0);
        store.rollback();
        assert!(store.get_account(&addr(2)).unwrap().is_none());
        assert_eq!(store.next_account_number().unwrap(), 0);
    }

    #[test]
    fn commit_without_begin_fails() {
        let (mut store, _dir) = temp_store();
        assert!(matches!(
            store.commit(),
            Err(LockstepError::Store(StoreError::NoTransaction))
        ));
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts");
        {
            let mut store = RocksAccountStore::open_path(&path).unwrap();
            store.begin();
            assert_eq!(store.next_account_number().unwrap(), 0);
            assert_eq!(store.next_account_number().unwrap(), 1);
            store.set_account(vesting(3)).unwrap();
            store.commit().unwrap();
            store.flush().unwrap();
        }
        let mut store = RocksAccountStore::open_path(&path).unwrap();
        assert_eq!(store.get_account(&addr(3)).unwrap(), Some(vesting(3)));
        assert_eq!(store.next_account_number().unwrap(), 2);
    }

    #[test]
    fn missing_database_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig { path: dir.path().join("absent"), create_if_missing: false };
        assert!(matches!(RocksAccountStore::open(&config), Err(StoreError::Backend(_))));
    }
}
