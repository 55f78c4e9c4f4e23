//! Observability events.
//!
//! Every committed vault operation leaves a [`VaultEvent`] behind. Events are
//! appended only after the operation has fully succeeded, so the log never
//! shows a deposit that was later rolled back. Records carry a per-log
//! sequence number so consumers can detect gaps.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::access::Role;
use crate::clock::Timestamp;
use crate::ledger::{Account, Amount, FixedPoint18};

/// Something that happened to a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    /// A parameter value was staged.
    ParameterStaged {
        /// Parameter name.
        param: String,
        /// Earliest commit time.
        ready_at: Timestamp,
        /// Staging account.
        by: Account,
    },
    /// A staged parameter became active.
    ParameterCommitted {
        /// Parameter name.
        param: String,
        /// Committing account.
        by: Account,
    },
    /// A staged parameter was discarded.
    ParameterRolledBack {
        /// Parameter name.
        param: String,
        /// Rolling-back account.
        by: Account,
    },
    /// Fee accrual ran. Zeros mean throttled or nothing owed.
    FeesCharged {
        /// Management plus protocol shares minted.
        management: Amount,
        /// Performance shares minted.
        performance: Amount,
        /// High-water mark after the charge.
        new_high_water_mark: FixedPoint18,
    },
    /// Shares were issued against assets.
    Deposited {
        /// Depositing account.
        depositor: Account,
        /// Shares minted to the depositor.
        shares_issued: Amount,
        /// Assets actually taken, canonical order.
        amounts_taken: Vec<Amount>,
    },
    /// Shares were burned for assets.
    Withdrawn {
        /// Account whose shares were burned.
        owner: Account,
        /// Account that received the assets.
        recipient: Account,
        /// Shares burned.
        shares_burned: Amount,
        /// Assets released, canonical order.
        amounts_released: Vec<Amount>,
    },
    /// A governance role was granted.
    RoleGranted {
        /// Receiving account.
        account: Account,
        /// Role granted.
        role: Role,
    },
    /// A governance role was revoked.
    RoleRevoked {
        /// Affected account.
        account: Account,
        /// Role revoked.
        role: Role,
    },
    /// A depositor was added to or removed from the allowlist.
    DepositorAllowlisted {
        /// Affected account.
        account: Account,
        /// Whether it may now deposit into a private vault.
        allowed: bool,
    },
    /// Deposit limits or the private flag changed.
    DepositLimitsUpdated {
        /// Cap on total supply.
        token_limit: Amount,
        /// Cap on any single holder's balance.
        token_limit_per_address: Amount,
        /// Whether deposits are restricted to the allowlist.
        private_vault: bool,
    },
}

/// An event with its envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at zero.
    pub sequence: u64,
    /// Emitting vault.
    pub vault: Uuid,
    /// Vault clock time of the emitting operation.
    pub at: Timestamp,
    /// Payload.
    pub event: VaultEvent,
}

/// Append-only, thread-safe event sink.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Mutex<Vec<EventRecord>>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and returns its sequence number.
    pub fn emit(&self, vault: Uuid, at: Timestamp, event: VaultEvent) -> u64 {
        let mut records = self.records.lock();
        let sequence = records.len() as u64;
        debug!(%vault, sequence, ?event, "vault event");
        records.push(EventRecord {
            sequence,
            vault,
            at,
            event,
        });
        sequence
    }

    /// Snapshot of every record.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    /// Snapshot of payloads only.
    pub fn events(&self) -> Vec<VaultEvent> {
        self.records
            .lock()
            .iter()
            .map(|r| r.event.clone())
            .collect()
    }

    /// Most recent payload.
    pub fn last(&self) -> Option<VaultEvent> {
        self.records.lock().last().map(|r| r.event.clone())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_dense() {
        let log = EventLog::new();
        let vault = Uuid::new_v4();
        let first = log.emit(
            vault,
            10,
            VaultEvent::ParameterRolledBack {
                param: "management_fee".into(),
                by: "admin".into(),
            },
        );
        let second = log.emit(
            vault,
            11,
            VaultEvent::FeesCharged {
                management: 0,
                performance: 0,
                new_high_water_mark: 0,
            },
        );
        assert_eq!((first, second), (0, 1));
        assert_eq!(log.len(), 2);
        assert!(matches!(log.last(), Some(VaultEvent::FeesCharged { .. })));
    }

    #[test]
    fn events_serialize_to_json() {
        let event = VaultEvent::Deposited {
            depositor: "alice".into(),
            shares_issued: 5,
            amounts_taken: vec![1, 2],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Deposited"));
        let back: VaultEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
