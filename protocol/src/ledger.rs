//! # Share Ledger
//!
//! The fungible balance and supply store behind a vault. Every share that
//! exists is in exactly one account's balance, so
//! `sum(balances) == total_supply` holds after every operation. Mint, burn
//! and transfer all update both sides or neither.
//!
//! The ledger also carries the two pieces of fee-accrual state that belong
//! to the share token rather than to governance: the per-share high-water
//! mark and the timestamp of the last fee charge. Only the fee engine moves
//! them, and the high-water mark can only go up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Timestamp;

/// Token or share quantity in smallest units.
pub type Amount = u128;

/// Account identifier. Opaque to the ledger.
pub type Account = String;

/// Fixed-point value scaled by [`D18`](crate::config::D18).
pub type FixedPoint18 = u128;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Burn or transfer exceeds the account's holdings.
    #[error("insufficient balance: {account} has {balance}, requested {requested}")]
    InsufficientBalance {
        /// The debited account.
        account: Account,
        /// Its current balance.
        balance: Amount,
        /// The amount that was requested.
        requested: Amount,
    },

    /// Supply or a balance would exceed `u128::MAX`.
    #[error("share supply overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// ShareLedger
// ---------------------------------------------------------------------------

/// Balances, supply and fee-accrual marks of a vault's share token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLedger {
    total_supply: Amount,
    balances: BTreeMap<Account, Amount>,
    high_water_mark_per_share: FixedPoint18,
    last_fee_charge_at: Timestamp,
}

impl ShareLedger {
    /// An empty ledger whose fee clock starts at `created_at`.
    pub fn new(created_at: Timestamp) -> Self {
        Self {
            total_supply: 0,
            balances: BTreeMap::new(),
            high_water_mark_per_share: 0,
            last_fee_charge_at: created_at,
        }
    }

    /// Total shares outstanding.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Shares held by `account`, zero if unknown.
    pub fn balance_of(&self, account: &str) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Highest per-share reference value observed by a fee charge.
    pub fn high_water_mark_per_share(&self) -> FixedPoint18 {
        self.high_water_mark_per_share
    }

    /// Time of the last fee charge that got past the throttle.
    pub fn last_fee_charge_at(&self) -> Timestamp {
        self.last_fee_charge_at
    }

    /// Iterates over non-zero balances in account order.
    pub fn balances(&self) -> impl Iterator<Item = (&Account, &Amount)> {
        self.balances.iter()
    }

    /// Number of accounts holding shares.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Checks `sum(balances) == total_supply`.
    pub fn is_consistent(&self) -> bool {
        let mut sum: Amount = 0;
        for balance in self.balances.values() {
            match sum.checked_add(*balance) {
                Some(next) => sum = next,
                None => return false,
            }
        }
        sum == self.total_supply
    }

    /// Creates `amount` new shares in `to`'s balance.
    pub fn mint(&mut self, to: &str, amount: Amount) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let new_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.total_supply = new_supply;
        self.balances.insert(to.to_string(), new_balance);
        Ok(())
    }

    /// Destroys `amount` shares from `from`'s balance.
    pub fn burn(&mut self, from: &str, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.debit_check(from, amount)?;
        self.set_balance(from, balance - amount);
        // Supply is at least every single balance, so this cannot underflow.
        self.total_supply -= amount;
        Ok(())
    }

    /// Moves `amount` shares from `from` to `to`. Supply is unchanged.
    pub fn transfer(&mut self, from: &str, to: &str, amount: Amount) -> Result<(), LedgerError> {
        let from_balance = self.debit_check(from, amount)?;
        if from == to || amount == 0 {
            return Ok(());
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.set_balance(from, from_balance - amount);
        self.set_balance(to, to_balance);
        Ok(())
    }

    /// Raises the high-water mark to `candidate` if it is higher.
    /// Returns the mark after the update.
    pub fn raise_high_water_mark(&mut self, candidate: FixedPoint18) -> FixedPoint18 {
        if candidate > self.high_water_mark_per_share {
            self.high_water_mark_per_share = candidate;
        }
        self.high_water_mark_per_share
    }

    /// Records that fees were charged at `now`.
    pub fn record_fee_charge(&mut self, now: Timestamp) {
        self.last_fee_charge_at = now;
    }

    fn debit_check(&self, account: &str, amount: Amount) -> Result<Amount, LedgerError> {
        let balance = self.balance_of(account);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                account: account.to_string(),
                balance,
                requested: amount,
            });
        }
        Ok(balance)
    }

    fn set_balance(&mut self, account: &str, balance: Amount) {
        if balance == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(account.to_string(), balance);
        }
    }
}
