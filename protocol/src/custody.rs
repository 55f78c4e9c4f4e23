//! Asset custody seam.
//!
//! Moving real tokens between a depositor and the vault's sub-accounts is
//! somebody else's problem. The vault only needs to know how much it holds
//! and to ask for transfers in and out; [`Custody`] is that contract.
//!
//! [`InMemoryCustody`] keeps everything in a `parking_lot::Mutex` and is what
//! the tests and the demo run against.

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

use crate::ledger::{Account, Amount};

/// Custody failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CustodyError {
    /// A source account can't cover a transfer.
    #[error("insufficient funds in {holder} for asset #{index}: has {available}, needs {requested}")]
    InsufficientFunds {
        /// The debited party (`"vault"` for the vault itself).
        holder: String,
        /// Asset index.
        index: usize,
        /// Available amount.
        available: Amount,
        /// Requested amount.
        requested: Amount,
    },

    /// The amounts vector does not match the asset count.
    #[error("custody length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// Asset count.
        expected: usize,
        /// Entries supplied.
        got: usize,
    },

    /// Balance arithmetic overflowed.
    #[error("custody balance overflow")]
    Overflow,
}

/// Holds the vault's underlying assets.
pub trait Custody: Send + Sync {
    /// Current balance of every asset held for the vault, canonical order.
    fn holdings(&self) -> Result<Vec<Amount>, CustodyError>;

    /// Moves `amounts` from `from` into the vault. All or nothing.
    fn pull(&self, from: &str, amounts: &[Amount]) -> Result<(), CustodyError>;

    /// Moves `amounts` out of the vault to `to`. All or nothing.
    fn release(&self, to: &str, amounts: &[Amount]) -> Result<(), CustodyError>;
}

#[derive(Debug, Default)]
struct Books {
    vault: Vec<Amount>,
    wallets: HashMap<Account, Vec<Amount>>,
}

/// Custody backed by in-process balances.
#[derive(Debug)]
pub struct InMemoryCustody {
    assets: usize,
    books: Mutex<Books>,
}

impl InMemoryCustody {
    /// Empty custody for `assets` underlying tokens.
    pub fn new(assets: usize) -> Self {
        Self {
            assets,
            books: Mutex::new(Books {
                vault: vec![0; assets],
                wallets: HashMap::new(),
            }),
        }
    }

    /// Credits an external wallet, e.g. a depositor's starting funds.
    pub fn fund(&self, account: &str, amounts: &[Amount]) -> Result<(), CustodyError> {
        self.check_len(amounts)?;
        let mut books = self.books.lock();
        let assets = self.assets;
        let wallet = books
            .wallets
            .entry(account.to_string())
            .or_insert_with(|| vec![0; assets]);
        credit(wallet, amounts)
    }

    /// Adds assets straight into the vault, e.g. strategy yield.
    pub fn donate(&self, amounts: &[Amount]) -> Result<(), CustodyError> {
        self.check_len(amounts)?;
        credit(&mut self.books.lock().vault, amounts)
    }

    /// Removes assets from the vault without paying anyone, e.g. a loss or
    /// funds sitting in a slower sub-account.
    pub fn remove(&self, amounts: &[Amount]) -> Result<(), CustodyError> {
        self.check_len(amounts)?;
        debit(&mut self.books.lock().vault, "vault", amounts)
    }

    /// Balances of an external wallet.
    pub fn wallet(&self, account: &str) -> Vec<Amount> {
        self.books
            .lock()
            .wallets
            .get(account)
            .cloned()
            .unwrap_or_else(|| vec![0; self.assets])
    }

    fn check_len(&self, amounts: &[Amount]) -> Result<(), CustodyError> {
        if amounts.len() != self.assets {
            return Err(CustodyError::LengthMismatch {
                expected: self.assets,
                got: amounts.len(),
            });
        }
        Ok(())
    }
}

impl Custody for InMemoryCustody {
    fn holdings(&self) -> Result<Vec<Amount>, CustodyError> {
        Ok(self.books.lock().vault.clone())
    }

    fn pull(&self, from: &str, amounts: &[Amount]) -> Result<(), CustodyError> {
        self.check_len(amounts)?;
        let mut books = self.books.lock();
        let mut wallet = books
            .wallets
            .get(from)
            .cloned()
            .unwrap_or_else(|| vec![0; self.assets]);
        let mut vault = books.vault.clone();
        debit(&mut wallet, from, amounts)?;
        credit(&mut vault, amounts)?;
        books.wallets.insert(from.to_string(), wallet);
        books.vault = vault;
        Ok(())
    }

    fn release(&self, to: &str, amounts: &[Amount]) -> Result<(), CustodyError> {
        self.check_len(amounts)?;
        let mut books = self.books.lock();
        let assets = self.assets;
        let mut vault = books.vault.clone();
        let mut wallet = books
            .wallets
            .get(to)
            .cloned()
            .unwrap_or_else(|| vec![0; assets]);
        debit(&mut vault, "vault", amounts)?;
        credit(&mut wallet, amounts)?;
        books.vault = vault;
        books.wallets.insert(to.to_string(), wallet);
        Ok(())
    }
}

fn credit(balances: &mut [Amount], amounts: &[Amount]) -> Result<(), CustodyError> {
    for (balance, amount) in balances.iter_mut().zip(amounts) {
        *balance = balance.checked_add(*amount).ok_or(CustodyError::Overflow)?;
    }
    Ok(())
}

fn debit(balances: &mut [Amount], holder: &str, amounts: &[Amount]) -> Result<(), CustodyError> {
    for (index, (balance, amount)) in balances.iter().zip(amounts).enumerate() {
        if balance < amount {
            return Err(CustodyError::InsufficientFunds {
                holder: holder.to_string(),
                index,
                available: *balance,
                requested: *amount,
            });
        }
    }
    for (balance, amount) in balances.iter_mut().zip(amounts) {
        *balance -= amount;
    }
    Ok(())
}
