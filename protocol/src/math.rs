//! Full-precision integer helpers.
//!
//! Share and fee math multiplies two `u128` quantities before dividing by a
//! third. With 18-decimal assets the product routinely exceeds `u128::MAX`,
//! so the intermediate is carried in a 256-bit integer and only the final
//! quotient has to fit back into `u128`. All divisions round toward zero.

use thiserror::Error;
use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer used for intermediate products.
    pub struct U256(4);
}

/// Arithmetic failures in accounting paths.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MathError {
    /// The result does not fit in `u128`.
    #[error("arithmetic overflow")]
    Overflow,

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,
}

/// Computes `floor(a * b / denominator)` without intermediate overflow.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(MathError::Overflow)?;
    let quotient = product / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(quotient.as_u128())
}

/// `a + b`, or [`MathError::Overflow`].
pub fn checked_add(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}
