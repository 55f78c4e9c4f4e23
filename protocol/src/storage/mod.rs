//! # Storage Module
//!
//! Persistent storage for vault state. A vault record is its immutable
//! config, its share ledger and its governance parameters; see
//! [`db::VaultStore`] for the tree layout.
//!
//! Bincode for on-disk serialization. JSON is for events and debugging;
//! bincode is for storage.

pub mod db;

pub use db::{StorageError, StorageResult, StoredVault, VaultStore};
