//! # Prometheus Metrics
//!
//! Operational counters for a single vault. Each vault owns its own
//! [`prometheus::Registry`] labelled with the vault id, so several vaults in
//! one process never collide and a host can gather them into whatever
//! exporter it runs.

use std::collections::HashMap;

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use uuid::Uuid;

/// Metric handles for one vault.
///
/// Clone-friendly: prometheus handles are reference counted internally.
#[derive(Clone, Debug)]
pub struct VaultMetrics {
    registry: Registry,
    /// Committed deposits.
    pub deposits_total: IntCounter,
    /// Committed withdrawals.
    pub withdrawals_total: IntCounter,
    /// Deposits, withdrawals and governance calls that returned an error.
    pub rejected_operations_total: IntCounter,
    /// Fee shares minted to treasuries. Saturates at `i64::MAX` per increment.
    pub fee_shares_minted_total: IntCounter,
    /// Share supply after the last committed operation, saturating.
    pub total_supply: IntGauge,
}

impl VaultMetrics {
    /// Creates and registers all metrics for `vault`.
    pub fn new(vault: Uuid) -> Result<Self, prometheus::Error> {
        let mut labels = HashMap::new();
        labels.insert("vault".to_string(), vault.to_string());
        let registry = Registry::new_custom(Some("kestrel".into()), Some(labels))?;

        let deposits_total = IntCounter::new("deposits_total", "Committed deposits")?;
        registry.register(Box::new(deposits_total.clone()))?;

        let withdrawals_total = IntCounter::new("withdrawals_total", "Committed withdrawals")?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let rejected_operations_total = IntCounter::new(
            "rejected_operations_total",
            "Vault operations rejected with an error",
        )?;
        registry.register(Box::new(rejected_operations_total.clone()))?;

        let fee_shares_minted_total = IntCounter::new(
            "fee_shares_minted_total",
            "Shares minted to fee treasuries",
        )?;
        registry.register(Box::new(fee_shares_minted_total.clone()))?;

        let total_supply = IntGauge::new("total_supply", "Outstanding vault shares")?;
        registry.register(Box::new(total_supply.clone()))?;

        Ok(Self {
            registry,
            deposits_total,
            withdrawals_total,
            rejected_operations_total,
            fee_shares_minted_total,
            total_supply,
        })
    }

    /// Adds `shares` to the fee counter.
    pub fn record_fee_shares(&self, shares: u128) {
        self.fee_shares_minted_total.inc_by(saturate_u64(shares));
    }

    /// Updates the supply gauge.
    pub fn record_supply(&self, supply: u128) {
        self.total_supply
            .set(i64::try_from(supply).unwrap_or(i64::MAX));
    }

    /// Encodes every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn saturate_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
