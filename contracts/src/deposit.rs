//! # Deposit Engine
//!
//! Turns a requested asset basket into a share amount and the basket the
//! vault will actually take. The depositor is paid for the asset they
//! under-supplied relative to the vault's composition; any excess of the
//! other assets is simply left with them.
//!
//! Two passes:
//!
//! 1. [`get_share_amount`] on the requested amounts gives a provisional
//!    share count (the minimum over significant assets).
//! 2. [`normalize`] trims every amount down to exactly what that share count
//!    buys, then [`get_share_amount`] runs again on the trimmed basket. The
//!    second count is what gets minted, so shares always match the assets
//!    pulled in rather than the assets asked for.
//!
//! Deposits are priced against the *upper* TVL bound so a new depositor
//! cannot buy in cheaply at the expense of existing holders.

use kestrel_protocol::config::FIRST_DEPOSIT_EXISTENTIAL_MULTIPLIER;
use kestrel_protocol::ledger::Amount;
use kestrel_protocol::math::{mul_div, MathError};

use crate::error::{check_len, VaultError};

/// Shares for `amounts` against `tvl` and `supply`.
///
/// Returns `(shares, significant)`. `significant` is false when the supply is
/// zero or no asset's TVL reaches its existential; the share count then
/// falls back to the largest single amount. Ties for the minimum keep the
/// first asset in canonical order.
pub fn get_share_amount(
    tvl: &[Amount],
    amounts: &[Amount],
    supply: Amount,
    existentials: &[Amount],
) -> Result<(Amount, bool), MathError> {
    let bootstrap = || amounts.iter().copied().max().unwrap_or(0);
    if supply == 0 {
        return Ok((bootstrap(), false));
    }

    let mut shares: Option<Amount> = None;
    for ((tvl, amount), existential) in tvl.iter().zip(amounts).zip(existentials) {
        if tvl < existential {
            continue;
        }
        let candidate = mul_div(*amount, supply, *tvl)?;
        match shares {
            Some(current) if current <= candidate => {}
            _ => shares = Some(candidate),
        }
    }

    Ok(match shares {
        Some(shares) => (shares, true),
        None => (bootstrap(), false),
    })
}

/// Trims `amounts` to what `shares` buys at the current composition.
///
/// Outside bootstrap, a dust asset is never taken and a significant asset is
/// capped at `tvl * shares / supply`.
pub fn normalize(
    tvl: &[Amount],
    amounts: &[Amount],
    shares: Amount,
    supply: Amount,
    significant: bool,
    existentials: &[Amount],
) -> Result<Vec<Amount>, MathError> {
    if !significant {
        return Ok(amounts.to_vec());
    }
    tvl.iter()
        .zip(amounts)
        .zip(existentials)
        .map(|((tvl, amount), existential)| {
            if tvl < existential {
                Ok(0)
            } else {
                Ok((*amount).min(mul_div(*tvl, shares, supply)?))
            }
        })
        .collect()
}

/// Shares to mint and assets to pull for one deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositPlan {
    pub shares: Amount,
    pub amounts: Vec<Amount>,
}

/// Plans a deposit of `requested` against the post-fee `supply`.
///
/// Fails on a length mismatch, a zero share count, or a first deposit
/// (zero supply) that puts less than
/// `FIRST_DEPOSIT_EXISTENTIAL_MULTIPLIER * existential` of any asset in.
pub fn plan_deposit(
    upper_tvl: &[Amount],
    requested: &[Amount],
    supply: Amount,
    existentials: &[Amount],
) -> Result<DepositPlan, VaultError> {
    check_len(existentials.len(), requested.len())?;
    check_len(existentials.len(), upper_tvl.len())?;

    let (provisional, significant) = get_share_amount(upper_tvl, requested, supply, existentials)?;
    let amounts = normalize(
        upper_tvl,
        requested,
        provisional,
        supply,
        significant,
        existentials,
    )?;
    let (shares, _) = get_share_amount(upper_tvl, &amounts, supply, existentials)?;

    if supply == 0 {
        for (index, (amount, existential)) in amounts.iter().zip(existentials).enumerate() {
            let minimum = existential.saturating_mul(FIRST_DEPOSIT_EXISTENTIAL_MULTIPLIER);
            if *amount < minimum {
                return Err(VaultError::FirstDepositTooSmall {
                    index,
                    amount: *amount,
                    minimum,
                });
            }
        }
    }
    if shares == 0 {
        return Err(VaultError::ZeroShares);
    }

    Ok(DepositPlan { shares, amounts })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EX: [Amount; 2] = [10, 10];

    #[test]
    fn bootstrap_takes_max_amount() {
        let (shares, significant) = get_share_amount(&[0, 0], &[500, 900], 0, &EX).unwrap();
        assert_eq!((shares, significant), (900, false));
    }

    #[test]
    fn all_dust_with_supply_falls_back_to_max() {
        let (shares, significant) = get_share_amount(&[5, 5], &[300, 200], 1_000, &EX).unwrap();
        assert_eq!((shares, significant), (300, false));
    }

    #[test]
    fn minimum_over_significant_assets() {
        // tvl 1000/2000, supply 1000: asset 0 buys 100 shares, asset 1 buys 50.
        let (shares, significant) =
            get_share_amount(&[1_000, 2_000], &[100, 100], 1_000, &EX).unwrap();
        assert_eq!((shares, significant), (50, true));
    }

    #[test]
    fn dust_asset_excluded_and_not_taken() {
        let plan = plan_deposit(&[1_000, 3], &[100, 100], 1_000, &EX).unwrap();
        assert_eq!(plan.shares, 100);
        assert_eq!(plan.amounts, vec![100, 0]);
    }

    #[test]
    fn excess_asset_is_trimmed() {
        let plan = plan_deposit(&[1_000, 2_000], &[100, 100], 1_000, &EX).unwrap();
        assert_eq!(plan.shares, 50);
        assert_eq!(plan.amounts, vec![50, 100]);
    }

    #[test]
    fn first_deposit_floor() {
        let err = plan_deposit(&[0, 0], &[100, 99], 0, &EX).unwrap_err();
        assert!(matches!(
            err,
            VaultError::FirstDepositTooSmall {
                index: 1,
                amount: 99,
                minimum: 100
            }
        ));
        let plan = plan_deposit(&[0, 0], &[100, 400], 0, &EX).unwrap();
        assert_eq!(plan.shares, 400);
        assert_eq!(plan.amounts, vec![100, 400]);
    }

    #[test]
    fn tiny_deposit_is_zero_shares() {
        let err = plan_deposit(&[1_000_000, 1_000_000], &[1, 1], 10, &EX).unwrap_err();
        assert!(matches!(err, VaultError::ZeroShares));
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(matches!(
            plan_deposit(&[1, 1], &[1], 1, &EX),
            Err(VaultError::LengthMismatch {
                expected: 2,
                got: 1
            })
        ));
    }
}
