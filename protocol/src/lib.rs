// Copyright (c) 2026 Kestrel Contributors. MIT License.
// See LICENSE for details.

//! # Kestrel Protocol: Core Primitives
//!
//! The building blocks every Kestrel vault is assembled from. Nothing in
//! here knows what a root vault is; the `kestrel-contracts` crate wires
//! these pieces into deposit, withdraw and fee accrual.
//!
//! ## Architecture
//!
//! - **config**: Protocol constants, fee caps and per-vault setup.
//! - **math**: 256-bit intermediate `mul_div`. Every share price goes through it.
//! - **clock**: Time source. Real in production, manual in tests.
//! - **timelock**: `TimelockedParameter<T>`: stage, wait, commit.
//! - **access**: Who may touch which knob.
//! - **ledger**: Share balances, supply, high-water mark.
//! - **valuation**: The adapter seam for TVL and reference pricing.
//! - **custody**: The adapter seam for moving underlying assets.
//! - **events** / **metrics** / **logging**: Observability.
//! - **storage**: sled-backed persistence of vault records.
//!
//! ## Design Philosophy
//!
//! 1. Integer math only. Floor rounding, always in the vault's favour.
//! 2. External collaborators are traits; the vault never trusts them.
//! 3. If it touches shares, it has tests. Plural.

pub mod access;
pub mod clock;
pub mod config;
pub mod custody;
pub mod events;
pub mod ledger;
pub mod logging;
pub mod math;
pub mod metrics;
pub mod storage;
pub mod timelock;
pub mod valuation;

pub use access::{AccessError, AccessTable, Role};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{ConfigError, GovernanceConfig, VaultConfig};
pub use custody::{Custody, CustodyError, InMemoryCustody};
pub use events::{EventLog, EventRecord, VaultEvent};
pub use ledger::{Account, Amount, FixedPoint18, LedgerError, ShareLedger};
pub use math::{mul_div, MathError};
pub use metrics::VaultMetrics;
pub use storage::{StorageError, VaultStore};
pub use timelock::{TimelockError, TimelockedParameter};
pub use valuation::{Tvl, UnitPriceAdapter, ValuationAdapter, ValuationError};
