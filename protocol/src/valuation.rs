//! # Valuation Adapters
//!
//! A vault does not price its own holdings. It hands them to a
//! [`ValuationAdapter`], which answers two questions:
//!
//! 1. What are these holdings worth per asset, as a conservative lower bound
//!    and a generous upper bound? ([`ValuationAdapter::tvl`])
//! 2. What is a basket of asset amounts worth in the reference asset?
//!    ([`ValuationAdapter::convert_to_reference`])
//!
//! Adapters are external code. The vault treats every call into one as
//! untrusted: it may fail, lie within its bounds, or try to call back into
//! the vault. The vault guards against the last one (see the reentrancy
//! guard in the contracts crate); the first two surface as
//! [`ValuationError`]s or as bounds the share math is built to tolerate.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::D18;
use crate::ledger::Amount;
use crate::math::{checked_add, mul_div, MathError};

/// Basis-point denominator for adapter spreads.
const BPS_DENOMINATOR: u128 = 10_000;

/// Errors an adapter can report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValuationError {
    /// The holdings vector does not match the adapter's asset count.
    #[error("valuation length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// Assets the adapter prices.
        expected: usize,
        /// Entries supplied.
        got: usize,
    },

    /// No usable price for the asset at this index.
    #[error("no price for asset #{0}")]
    MissingPrice(usize),

    /// Price math overflowed.
    #[error("valuation math: {0}")]
    Math(#[from] MathError),

    /// The adapter could not produce a value right now.
    #[error("valuation unavailable: {0}")]
    Unavailable(String),
}

/// Lower and upper net-asset-value bounds, one entry per asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tvl {
    /// Conservative bound, used for fees and withdrawals.
    pub lower: Vec<Amount>,
    /// Generous bound, used for deposits.
    pub upper: Vec<Amount>,
}

/// Prices a vault's holdings.
pub trait ValuationAdapter: Send + Sync {
    /// Identifier governance uses to select this adapter.
    fn reference(&self) -> &str;

    /// Per-asset lower/upper valuation of `holdings`.
    fn tvl(&self, holdings: &[Amount]) -> Result<Tvl, ValuationError>;

    /// Value of `amounts` expressed in the reference asset.
    fn convert_to_reference(&self, amounts: &[Amount]) -> Result<Amount, ValuationError>;
}

// ---------------------------------------------------------------------------
// UnitPriceAdapter
// ---------------------------------------------------------------------------

/// Prices every asset at a fixed D18 unit price against the reference asset.
///
/// The upper bound is the holdings themselves; the lower bound shaves
/// `spread_bps` off each asset. Prices can be moved after construction to
/// simulate a market.
#[derive(Debug)]
pub struct UnitPriceAdapter {
    reference: String,
    prices_d18: RwLock<Vec<u128>>,
    spread_bps: u128,
}

impl UnitPriceAdapter {
    /// Creates an adapter with the given D18 prices and a zero spread.
    pub fn new(reference: impl Into<String>, prices_d18: Vec<u128>) -> Self {
        Self {
            reference: reference.into(),
            prices_d18: RwLock::new(prices_d18),
            spread_bps: 0,
        }
    }

    /// Every asset priced at exactly one reference unit.
    pub fn at_par(reference: impl Into<String>, assets: usize) -> Self {
        Self::new(reference, vec![D18; assets])
    }

    /// Sets the lower-bound haircut in basis points (capped at 100%).
    pub fn with_spread_bps(mut self, spread_bps: u32) -> Self {
        self.spread_bps = u128::from(spread_bps).min(BPS_DENOMINATOR);
        self
    }

    /// Replaces the D18 price of asset `index`.
    pub fn set_price(&self, index: usize, price_d18: u128) -> Result<(), ValuationError> {
        let mut prices = self.prices_d18.write();
        let slot = prices
            .get_mut(index)
            .ok_or(ValuationError::MissingPrice(index))?;
        *slot = price_d18;
        Ok(())
    }

    fn check_len(&self, got: usize) -> Result<(), ValuationError> {
        let expected = self.prices_d18.read().len();
        if expected != got {
            return Err(ValuationError::LengthMismatch { expected, got });
        }
        Ok(())
    }
}

impl ValuationAdapter for UnitPriceAdapter {
    fn reference(&self) -> &str {
        &self.reference
    }

    fn tvl(&self, holdings: &[Amount]) -> Result<Tvl, ValuationError> {
        self.check_len(holdings.len())?;
        let keep = BPS_DENOMINATOR - self.spread_bps;
        let lower = holdings
            .iter()
            .map(|h| mul_div(*h, keep, BPS_DENOMINATOR))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Tvl {
            lower,
            upper: holdings.to_vec(),
        })
    }

    fn convert_to_reference(&self, amounts: &[Amount]) -> Result<Amount, ValuationError> {
        self.check_len(amounts.len())?;
        let prices = self.prices_d18.read();
        let mut total: Amount = 0;
        for (amount, price) in amounts.iter().zip(prices.iter()) {
            total = checked_add(total, mul_div(*amount, *price, D18)?)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_par_values_holdings_one_to_one() {
        let adapter = UnitPriceAdapter::at_par("par", 2);
        let tvl = adapter.tvl(&[100, 200]).unwrap();
        assert_eq!(tvl.lower, vec![100, 200]);
        assert_eq!(tvl.upper, vec![100, 200]);
        assert_eq!(adapter.convert_to_reference(&[100, 200]).unwrap(), 300);
    }

    #[test]
    fn spread_lowers_only_the_lower_bound() {
        let adapter = UnitPriceAdapter::at_par("par", 1).with_spread_bps(100);
        let tvl = adapter.tvl(&[10_000]).unwrap();
        assert_eq!(tvl.lower, vec![9_900]);
        assert_eq!(tvl.upper, vec![10_000]);
    }

    #[test]
    fn price_updates_affect_conversion() {
        let adapter = UnitPriceAdapter::at_par("par", 2);
        adapter.set_price(1, 2 * D18).unwrap();
        assert_eq!(adapter.convert_to_reference(&[10, 10]).unwrap(), 30);
        assert_eq!(
            adapter.set_price(5, D18),
            Err(ValuationError::MissingPrice(5))
        );
    }

    #[test]
    fn wrong_length_rejected() {
        let adapter = UnitPriceAdapter::at_par("par", 2);
        assert_eq!(
            adapter.tvl(&[1]),
            Err(ValuationError::LengthMismatch {
                expected: 2,
                got: 1
            })
        );
    }
}
