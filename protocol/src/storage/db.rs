//! # VaultStore: Persistent Vault State
//!
//! The persistence layer for Kestrel vaults, built on sled's embedded
//! key-value store. One vault is one record spread over three trees:
//!
//! | Tree         | Key              | Value                   |
//! |--------------|------------------|-------------------------|
//! | `configs`    | vault id (16B)   | `bincode(VaultConfig)`  |
//! | `ledgers`    | vault id (16B)   | `bincode(ShareLedger)`  |
//! | `governance` | vault id (16B)   | `bincode(G)`            |
//!
//! The governance type is generic so this crate doesn't need to know what a
//! contract's parameter set looks like; it only has to be serde-friendly.
//!
//! ## Atomicity
//!
//! All three trees are written in a single sled transaction. A crash mid-way
//! leaves either the old record or the new one, never a ledger from one
//! operation paired with parameters from another.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use uuid::Uuid;

use crate::config::VaultConfig;
use crate::ledger::ShareLedger;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("vault {0} not found")]
    NotFound(Uuid),

    #[error("incomplete record for vault {0}")]
    Incomplete(Uuid),

    #[error("transaction aborted")]
    Aborted,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Everything persisted for one vault.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVault<G> {
    /// Immutable setup, including canonical token order.
    pub config: VaultConfig,
    /// Share balances and fee marks.
    pub ledger: ShareLedger,
    /// Contract-defined governance state.
    pub governance: G,
}

// ---------------------------------------------------------------------------
// VaultStore
// ---------------------------------------------------------------------------

/// sled-backed store of vault records.
///
/// Cheap to clone; sled handles are reference counted and thread-safe.
#[derive(Debug, Clone)]
pub struct VaultStore {
    db: Db,
    configs: Tree,
    ledgers: Tree,
    governance: Tree,
}

impl VaultStore {
    /// Open or create a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a store that lives in memory and disappears on drop.
    pub fn open_temporary() -> StorageResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StorageResult<Self> {
        let configs = db.open_tree("configs")?;
        let ledgers = db.open_tree("ledgers")?;
        let governance = db.open_tree("governance")?;
        Ok(Self {
            db,
            configs,
            ledgers,
            governance,
        })
    }

    /// Writes a complete vault record atomically and flushes it.
    pub fn put_vault<G: Serialize>(
        &self,
        id: Uuid,
        config: &VaultConfig,
        ledger: &ShareLedger,
        governance: &G,
    ) -> StorageResult<()> {
        let key = id.as_bytes().to_vec();
        let config_bytes = encode(config)?;
        let ledger_bytes = encode(ledger)?;
        let governance_bytes = encode(governance)?;

        (&self.configs, &self.ledgers, &self.governance)
            .transaction(|(configs, ledgers, governance)| {
                configs.insert(key.as_slice(), config_bytes.as_slice())?;
                ledgers.insert(key.as_slice(), ledger_bytes.as_slice())?;
                governance.insert(key.as_slice(), governance_bytes.as_slice())?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(()) => StorageError::Aborted,
                TransactionError::Storage(e) => StorageError::Sled(e),
            })?;

        self.db.flush()?;
        Ok(())
    }

    /// Loads a vault record, `None` if the id was never stored.
    pub fn get_vault<G: DeserializeOwned>(&self, id: Uuid) -> StorageResult<Option<StoredVault<G>>> {
        let key = id.as_bytes();
        let config = self.configs.get(key)?;
        let ledger = self.ledgers.get(key)?;
        let governance = self.governance.get(key)?;

        match (config, ledger, governance) {
            (None, None, None) => Ok(None),
            (Some(config), Some(ledger), Some(governance)) => Ok(Some(StoredVault {
                config: decode(&config)?,
                ledger: decode(&ledger)?,
                governance: decode(&governance)?,
            })),
            _ => Err(StorageError::Incomplete(id)),
        }
    }

    /// Removes a vault record. Returns whether it existed.
    pub fn remove_vault(&self, id: Uuid) -> StorageResult<bool> {
        let key = id.as_bytes().to_vec();
        let existed = (&self.configs, &self.ledgers, &self.governance)
            .transaction(|(configs, ledgers, governance)| {
                let existed = configs.remove(key.as_slice())?.is_some();
                ledgers.remove(key.as_slice())?;
                governance.remove(key.as_slice())?;
                Ok::<bool, ConflictableTransactionError<()>>(existed)
            })
            .map_err(|e| match e {
                TransactionError::Abort(()) => StorageError::Aborted,
                TransactionError::Storage(e) => StorageError::Sled(e),
            })?;
        Ok(existed)
    }

    /// Ids of every stored vault, in key order.
    pub fn vault_ids(&self) -> StorageResult<Vec<Uuid>> {
        let mut ids = Vec::new();
        for entry in self.configs.iter() {
            let (key, _) = entry?;
            let id = Uuid::from_slice(&key)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> StorageResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    bincode::deserialize(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config() -> VaultConfig {
        VaultConfig::new(vec!["usdc".into(), "weth".into()], vec![1_000, 1_000])
    }

    fn ledger() -> ShareLedger {
        let mut ledger = ShareLedger::new(1_700_000_000);
        ledger.mint("alice", 10_000).unwrap();
        ledger.raise_high_water_mark(1_000_000_000_000_000_000);
        ledger
    }

    #[test]
    fn missing_vault_is_none() {
        let store = VaultStore::open_temporary().unwrap();
        let loaded: Option<StoredVault<u32>> = store.get_vault(Uuid::new_v4()).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = VaultStore::open_temporary().unwrap();
        let id = Uuid::new_v4();
        let mut governance = BTreeMap::new();
        governance.insert("management_fee".to_string(), 100_000_000u128);

        store.put_vault(id, &config(), &ledger(), &governance).unwrap();

        let loaded: StoredVault<BTreeMap<String, u128>> =
            store.get_vault(id).unwrap().expect("stored");
        assert_eq!(loaded.config, config());
        assert_eq!(loaded.ledger, ledger());
        assert_eq!(loaded.governance, governance);
        assert_eq!(store.vault_ids().unwrap(), vec![id]);
    }

    #[test]
    fn remove_vault_clears_all_trees() {
        let store = VaultStore::open_temporary().unwrap();
        let id = Uuid::new_v4();
        store.put_vault(id, &config(), &ledger(), &0u8).unwrap();
        assert!(store.remove_vault(id).unwrap());
        assert!(!store.remove_vault(id).unwrap());
        let loaded: Option<StoredVault<u8>> = store.get_vault(id).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn survives_reopen_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let id = Uuid::new_v4();
        {
            let store = VaultStore::open(dir.path()).unwrap();
            store.put_vault(id, &config(), &ledger(), &7u64).unwrap();
        }
        let store = VaultStore::open(dir.path()).unwrap();
        let loaded: StoredVault<u64> = store.get_vault(id).unwrap().expect("persisted");
        assert_eq!(loaded.governance, 7);
        assert_eq!(loaded.ledger.balance_of("alice"), 10_000);
    }
}
