//! Role-based authorization table.
//!
//! Governance entry points never consult ambient state to decide who may act.
//! They ask an [`AccessTable`], which maps accounts to the set of [`Role`]s
//! they hold. Admins grant and revoke roles; the table refuses to drop the
//! last admin so a vault can't lock itself out of its own governance.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::Account;

/// A governance role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full control over every parameter and the role table itself.
    Admin,
    /// Controls strategy-side parameters: its own fees and treasuries.
    Strategist,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::Strategist => write!(f, "Strategist"),
        }
    }
}

/// Authorization failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The caller holds none of the roles the operation accepts.
    #[error("unauthorized: {account} lacks {required}")]
    Unauthorized {
        /// The rejected caller.
        account: Account,
        /// Human-readable description of the accepted roles.
        required: String,
    },

    /// Revoking this role would leave the table without an admin.
    #[error("cannot revoke the last admin")]
    LastAdmin,
}

/// Accounts and the roles they hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTable {
    roles: BTreeMap<Account, BTreeSet<Role>>,
}

impl AccessTable {
    /// Creates a table with a single admin.
    pub fn with_admin(admin: impl Into<Account>) -> Self {
        let mut table = Self::default();
        table
            .roles
            .entry(admin.into())
            .or_default()
            .insert(Role::Admin);
        table
    }

    /// Whether `account` holds `role`.
    pub fn has_role(&self, account: &str, role: Role) -> bool {
        self.roles
            .get(account)
            .map(|set| set.contains(&role))
            .unwrap_or(false)
    }

    /// Succeeds if `account` holds at least one of `accepted`.
    pub fn require_any(&self, account: &str, accepted: &[Role]) -> Result<(), AccessError> {
        if accepted.iter().any(|role| self.has_role(account, *role)) {
            return Ok(());
        }
        let required = accepted
            .iter()
            .map(Role::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(AccessError::Unauthorized {
            account: account.to_string(),
            required,
        })
    }

    /// Grants `role` to `account`. Only admins may call this.
    pub fn grant(&mut self, caller: &str, account: &str, role: Role) -> Result<(), AccessError> {
        self.require_any(caller, &[Role::Admin])?;
        self.roles
            .entry(account.to_string())
            .or_default()
            .insert(role);
        Ok(())
    }

    /// Revokes `role` from `account`. Only admins may call this.
    pub fn revoke(&mut self, caller: &str, account: &str, role: Role) -> Result<(), AccessError> {
        self.require_any(caller, &[Role::Admin])?;
        if role == Role::Admin && self.has_role(account, Role::Admin) && self.admin_count() == 1 {
            return Err(AccessError::LastAdmin);
        }
        if let Some(set) = self.roles.get_mut(account) {
            set.remove(&role);
            if set.is_empty() {
                self.roles.remove(account);
            }
        }
        Ok(())
    }

    fn admin_count(&self) -> usize {
        self.roles
            .values()
            .filter(|set| set.contains(&Role::Admin))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_grant_strategist() {
        let mut table = AccessTable::with_admin("admin");
        table.grant("admin", "strategist", Role::Strategist).unwrap();
        assert!(table.has_role("strategist", Role::Strategist));
        assert!(!table.has_role("strategist", Role::Admin));
    }

    #[test]
    fn non_admin_cannot_grant() {
        let mut table = AccessTable::with_admin("admin");
        let err = table.grant("mallory", "mallory", Role::Admin).unwrap_err();
        assert!(matches!(err, AccessError::Unauthorized { .. }));
    }

    #[test]
    fn require_any_accepts_either_role() {
        let mut table = AccessTable::with_admin("admin");
        table.grant("admin", "strat", Role::Strategist).unwrap();
        let accepted = [Role::Admin, Role::Strategist];
        assert!(table.require_any("admin", &accepted).is_ok());
        assert!(table.require_any("strat", &accepted).is_ok());
        let err = table.require_any("random", &accepted).unwrap_err();
        assert_eq!(
            err,
            AccessError::Unauthorized {
                account: "random".into(),
                required: "Admin or Strategist".into(),
            }
        );
    }

    #[test]
    fn last_admin_cannot_be_revoked() {
        let mut table = AccessTable::with_admin("admin");
        assert_eq!(
            table.revoke("admin", "admin", Role::Admin),
            Err(AccessError::LastAdmin)
        );

        table.grant("admin", "second", Role::Admin).unwrap();
        table.revoke("second", "admin", Role::Admin).unwrap();
        assert!(!table.has_role("admin", Role::Admin));
    }
}
