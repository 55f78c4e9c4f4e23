//! Withdraw Engine: the inverse of a deposit.
//!
//! Shares are redeemed against the *lower* TVL bound, so a leaver never
//! takes more than their conservative share and the remaining holders
//! carry no valuation risk for them.

use kestrel_protocol::ledger::Amount;
use kestrel_protocol::math::mul_div;

use crate::error::{check_len, VaultError};

/// Assets to release for burning `shares` out of the post-fee `supply`.
///
/// Each amount is `lower_tvl[i] * shares / supply`, capped at what custody
/// actually holds, and must reach `min_amounts[i]`.
pub fn plan_withdraw(
    lower_tvl: &[Amount],
    holdings: &[Amount],
    shares: Amount,
    supply: Amount,
    min_amounts: &[Amount],
) -> Result<Vec<Amount>, VaultError> {
    check_len(lower_tvl.len(), min_amounts.len())?;
    check_len(lower_tvl.len(), holdings.len())?;
    if supply == 0 {
        return Err(VaultError::EmptyVault);
    }
    if shares == 0 {
        return Err(VaultError::ZeroShares);
    }

    let mut amounts = Vec::with_capacity(lower_tvl.len());
    for (index, ((tvl, held), minimum)) in lower_tvl
        .iter()
        .zip(holdings)
        .zip(min_amounts)
        .enumerate()
    {
        let amount = mul_div(*tvl, shares, supply)?.min(*held);
        if amount < *minimum {
            return Err(VaultError::SlippageExceeded {
                what: format!("asset #{index}"),
                actual: amount,
                minimum: *minimum,
            });
        }
        amounts.push(amount);
    }
    Ok(amounts)
}
