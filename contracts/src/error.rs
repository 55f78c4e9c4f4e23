//! Error types for the root vault.
//!
//! Each engine fails with one of the protocol sub-errors; [`VaultError`]
//! composes them so every public entry point has a single error type.

use kestrel_protocol::access::AccessError;
use kestrel_protocol::clock::Timestamp;
use kestrel_protocol::config::ConfigError;
use kestrel_protocol::custody::CustodyError;
use kestrel_protocol::ledger::{Account, Amount, LedgerError};
use kestrel_protocol::math::MathError;
use kestrel_protocol::storage::StorageError;
use kestrel_protocol::timelock::TimelockError;
use kestrel_protocol::valuation::ValuationError;
use thiserror::Error;

use crate::governance::ParamId;

// ---------------------------------------------------------------------------
// GovernanceError
// ---------------------------------------------------------------------------

/// Errors from staging, committing or rolling back parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GovernanceError {
    /// Commit before the delay elapsed, or with nothing staged.
    #[error(transparent)]
    Timelock(#[from] TimelockError),

    /// Caller lacks a role that may act on this parameter.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Staged fee rate is above its configured cap.
    #[error("{param} of {value} exceeds cap {max}")]
    FeeTooHigh {
        /// The fee parameter.
        param: ParamId,
        /// The rejected value.
        value: u128,
        /// The configured cap.
        max: u128,
    },

    /// The value's kind does not fit the parameter, e.g. an account for a rate.
    #[error("value type does not match {param}")]
    TypeMismatch {
        /// The target parameter.
        param: ParamId,
    },

    /// A treasury cannot be the empty account.
    #[error("treasury account must not be empty")]
    EmptyTreasury,
}

// ---------------------------------------------------------------------------
// VaultError
// ---------------------------------------------------------------------------

/// Everything a root vault operation can fail with. Any error aborts the
/// operation with no state change.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("governance: {0}")]
    Governance(#[from] GovernanceError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("math: {0}")]
    Math(#[from] MathError),

    #[error("valuation: {0}")]
    Valuation(#[from] ValuationError),

    #[error("custody: {0}")]
    Custody(#[from] CustodyError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    /// An amounts vector does not have one entry per vault token.
    #[error("length mismatch: expected {expected} amounts, got {got}")]
    LengthMismatch {
        /// Vault token count.
        expected: usize,
        /// Entries supplied.
        got: usize,
    },

    /// Output fell below the caller's floor.
    #[error("slippage exceeded: {what} {actual} below minimum {minimum}")]
    SlippageExceeded {
        /// `"shares"` or `"asset #i"`.
        what: String,
        /// What the operation would deliver.
        actual: Amount,
        /// The caller's floor.
        minimum: Amount,
    },

    #[error("deadline {deadline} expired at {now}")]
    DeadlineExpired {
        /// Caller's deadline.
        deadline: Timestamp,
        /// Vault clock at entry.
        now: Timestamp,
    },

    /// A mutating call re-entered the vault while another was in progress
    /// on the same thread.
    #[error("reentrant call rejected")]
    Reentrant,

    /// The operation would mint or burn zero shares.
    #[error("operation would move zero shares")]
    ZeroShares,

    /// First deposit below the per-asset floor.
    #[error("first deposit of asset #{index} is {amount}, minimum is {minimum}")]
    FirstDepositTooSmall {
        /// Asset position in canonical order.
        index: usize,
        /// Normalized amount offered.
        amount: Amount,
        /// Required floor.
        minimum: Amount,
    },

    #[error("{limit} exceeded: {would_be} > {max}")]
    LimitExceeded {
        /// `"token_limit"` or `"token_limit_per_address"`.
        limit: &'static str,
        /// Resulting supply or balance.
        would_be: Amount,
        /// Configured limit.
        max: Amount,
    },

    #[error("{0} is not allowed to deposit into this private vault")]
    DepositorNotAllowed(Account),

    /// No registered valuation adapter answers to this reference.
    #[error("unknown valuation adapter: {0}")]
    UnknownAdapter(String),

    #[error("vault has no shares outstanding")]
    EmptyVault,
}

impl VaultError {
    /// Short label used for log fields and rejection metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultError::Config(_) => "config",
            VaultError::Governance(_) => "governance",
            VaultError::Ledger(_) => "ledger",
            VaultError::Math(_) => "math",
            VaultError::Valuation(_) => "valuation",
            VaultError::Custody(_) => "custody",
            VaultError::Storage(_) => "storage",
            VaultError::Metrics(_) => "metrics",
            VaultError::LengthMismatch { .. } => "length_mismatch",
            VaultError::SlippageExceeded { .. } => "slippage",
            VaultError::DeadlineExpired { .. } => "deadline",
            VaultError::Reentrant => "reentrant",
            VaultError::ZeroShares => "zero_shares",
            VaultError::FirstDepositTooSmall { .. } => "first_deposit",
            VaultError::LimitExceeded { .. } => "limit",
            VaultError::DepositorNotAllowed(_) => "not_allowed",
            VaultError::UnknownAdapter(_) => "unknown_adapter",
            VaultError::EmptyVault => "empty_vault",
        }
    }
}

/// Checks that `amounts` has one entry per token.
pub(crate) fn check_len(expected: usize, got: usize) -> Result<(), VaultError> {
    if expected != got {
        return Err(VaultError::LengthMismatch { expected, got });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_errors_convert_through_question_mark() {
        fn fails() -> Result<(), VaultError> {
            Err(TimelockError::NothingStaged).map_err(GovernanceError::from)?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(
            err,
            VaultError::Governance(GovernanceError::Timelock(TimelockError::NothingStaged))
        ));
        assert_eq!(err.kind(), "governance");
    }

    #[test]
    fn length_check() {
        assert!(check_len(2, 2).is_ok());
        assert!(matches!(
            check_len(2, 3),
            Err(VaultError::LengthMismatch { expected: 2, got: 3 })
        ));
    }
}
