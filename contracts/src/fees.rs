//! # Fee Accrual Engine
//!
//! Runs first in every deposit and withdrawal. Management and protocol fees
//! accrue linearly on the share supply since the last charge; the
//! performance fee is taken only on growth of the per-share reference value
//! above its high-water mark.
//!
//! All ratios are computed against the supply as it was *before* any fee
//! shares are minted, then every mint is applied to the ledger in one go.
//! Callers hand in a working copy of the ledger, so a failure anywhere
//! leaves the committed ledger untouched.
//!
//! ## Skips
//!
//! A charge inside the throttle window, or against a vault whose every
//! asset is dust, mints nothing and leaves `last_fee_charge_at` where it
//! was. A vault with zero supply mints nothing but does advance the fee
//! clock, so the first depositor is not charged for time before they came.

use kestrel_protocol::clock::Timestamp;
use kestrel_protocol::config::{D18, FEE_DENOMINATOR, SECONDS_PER_YEAR};
use kestrel_protocol::ledger::{Amount, FixedPoint18, ShareLedger};
use kestrel_protocol::math::{self, mul_div, MathError};
use kestrel_protocol::valuation::ValuationAdapter;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::VaultError;
use crate::governance::FeeSchedule;

/// Why a charge minted nothing without looking at rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Less than `fee_charge_throttle` seconds since the last charge.
    Throttled,
    /// Every asset's lower TVL is below its existential threshold.
    AllDust,
}

/// Result of one fee charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCharge {
    /// Shares minted to the strategy treasury.
    pub strategy_minted: Amount,
    /// Shares minted to the protocol treasury.
    pub protocol_minted: Amount,
    /// Shares minted to the performance treasury.
    pub performance_minted: Amount,
    /// Reference value per share observed by this charge, `0` if not priced.
    pub price_per_share: FixedPoint18,
    /// High-water mark after the charge.
    pub high_water_mark: FixedPoint18,
    /// Set when the charge was skipped outright.
    pub skipped: Option<SkipReason>,
}

impl FeeCharge {
    fn skipped(reason: SkipReason, high_water_mark: FixedPoint18) -> Self {
        Self {
            strategy_minted: 0,
            protocol_minted: 0,
            performance_minted: 0,
            price_per_share: 0,
            high_water_mark,
            skipped: Some(reason),
        }
    }

    /// Management plus protocol shares.
    pub fn management(&self) -> Amount {
        self.strategy_minted.saturating_add(self.protocol_minted)
    }

    /// Every fee share minted.
    pub fn total(&self) -> Amount {
        self.management().saturating_add(self.performance_minted)
    }
}

/// Management shares owed for `elapsed` seconds at a combined annual `rate`.
///
/// `rate * elapsed * supply / (SECONDS_PER_YEAR * FEE_DENOMINATOR)`, floored.
pub fn management_fee_shares(rate: u128, elapsed: u64, supply: Amount) -> Result<Amount, MathError> {
    let rate_time = rate
        .checked_mul(u128::from(elapsed))
        .ok_or(MathError::Overflow)?;
    let year_scale = u128::from(SECONDS_PER_YEAR)
        .checked_mul(FEE_DENOMINATOR)
        .ok_or(MathError::Overflow)?;
    mul_div(rate_time, supply, year_scale)
}

/// Performance shares owed when the share price moved from `high_water_mark`
/// to `price_per_share`.
///
/// Zero unless `price_per_share > high_water_mark > 0`; otherwise
/// `supply * (price - hwm) / hwm * rate / FEE_DENOMINATOR`, each step floored.
pub fn performance_fee_shares(
    supply: Amount,
    price_per_share: FixedPoint18,
    high_water_mark: FixedPoint18,
    rate: u128,
) -> Result<Amount, MathError> {
    if high_water_mark == 0 || price_per_share <= high_water_mark {
        return Ok(0);
    }
    let growth = mul_div(supply, price_per_share - high_water_mark, high_water_mark)?;
    mul_div(growth, rate, FEE_DENOMINATOR)
}

/// Charges fees on `ledger` and mints them to the schedule's treasuries.
pub fn charge_fees(
    ledger: &mut ShareLedger,
    schedule: &FeeSchedule,
    lower_tvl: &[Amount],
    existentials: &[Amount],
    adapter: &dyn ValuationAdapter,
    now: Timestamp,
) -> Result<FeeCharge, VaultError> {
    let last = ledger.last_fee_charge_at();
    let elapsed = now.saturating_sub(last);
    let high_water_mark = ledger.high_water_mark_per_share();

    if elapsed < schedule.fee_charge_throttle {
        debug!(elapsed, throttle = schedule.fee_charge_throttle, "fee charge throttled");
        return Ok(FeeCharge::skipped(SkipReason::Throttled, high_water_mark));
    }
    let all_dust = lower_tvl
        .iter()
        .zip(existentials)
        .all(|(tvl, existential)| tvl < existential);
    if all_dust {
        debug!("fee charge skipped, every asset below existential");
        return Ok(FeeCharge::skipped(SkipReason::AllDust, high_water_mark));
    }

    let supply = ledger.total_supply();
    let mut charge = FeeCharge {
        strategy_minted: 0,
        protocol_minted: 0,
        performance_minted: 0,
        price_per_share: 0,
        high_water_mark,
        skipped: None,
    };
    if supply == 0 {
        ledger.record_fee_charge(now.max(last));
        return Ok(charge);
    }

    let management_rate = math::checked_add(schedule.management_fee, schedule.protocol_fee)?;
    if management_rate > 0 {
        let management = management_fee_shares(management_rate, elapsed, supply)?;
        charge.strategy_minted = mul_div(management, schedule.management_fee, management_rate)?;
        charge.protocol_minted = management - charge.strategy_minted;
    }

    if schedule.performance_fee > 0 {
        let reference_value = adapter.convert_to_reference(lower_tvl)?;
        let price_per_share = mul_div(reference_value, D18, supply)?;
        charge.price_per_share = price_per_share;
        charge.performance_minted = performance_fee_shares(
            supply,
            price_per_share,
            high_water_mark,
            schedule.performance_fee,
        )?;
        charge.high_water_mark = ledger.raise_high_water_mark(price_per_share);
    }

    ledger.mint(&schedule.strategy_treasury, charge.strategy_minted)?;
    ledger.mint(&schedule.protocol_treasury, charge.protocol_minted)?;
    ledger.mint(&schedule.performance_treasury, charge.performance_minted)?;
    ledger.record_fee_charge(now.max(last));

    debug!(
        elapsed,
        supply,
        strategy = charge.strategy_minted,
        protocol = charge.protocol_minted,
        performance = charge.performance_minted,
        high_water_mark = charge.high_water_mark,
        "fees charged"
    );
    Ok(charge)
}

/// What [`charge_fees`] would do, computed on a copy of `ledger`.
pub fn preview_fees(
    ledger: &ShareLedger,
    schedule: &FeeSchedule,
    lower_tvl: &[Amount],
    existentials: &[Amount],
    adapter: &dyn ValuationAdapter,
    now: Timestamp,
) -> Result<FeeCharge, VaultError> {
    let mut scratch = ledger.clone();
    charge_fees(&mut scratch, schedule, lower_tvl, existentials, adapter, now)
}
