//! # Kestrel Root Vault
//!
//! A pooled multi-asset vault whose ownership is a fungible share token.
//! The pieces:
//!
//! - **Governance**: every fee rate and treasury is a timelocked
//!   parameter; changes are staged, wait out the governance delay, then
//!   commit. Role checks decide who may touch which parameter.
//! - **Fees**: management and protocol fees accrue on supply over time;
//!   the performance fee is taken on share-price growth above the
//!   high-water mark. Always charged before any shares are minted or burned.
//! - **Deposit**: two-pass share math. Price the request, trim it to the
//!   vault's composition, price the trimmed basket again.
//! - **Withdraw**: proportional release against the conservative TVL bound.
//! - **Vault**: orchestration, covering serialization, reentrancy guard,
//!   all-or-nothing commits, events, metrics, persistence.
//!
//! ## Design Principles
//!
//! 1. Every `a * b / c` goes through a 256-bit intermediate. Floor rounding.
//! 2. An operation either commits completely or leaves no trace.
//! 3. Adapters and custody are untrusted, and may try to call back in.
//! 4. Every public type is serializable (serde) for persistent storage.

pub mod deposit;
pub mod error;
pub mod fees;
pub mod governance;
pub mod vault;
pub mod withdraw;

pub use error::{GovernanceError, VaultError};
pub use fees::{FeeCharge, SkipReason};
pub use governance::{DepositLimits, FeeSchedule, ParamId, ParamValue, VaultGovernance};
pub use vault::RootVault;
