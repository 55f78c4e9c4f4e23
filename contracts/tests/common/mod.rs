//! Shared fixtures for the vault integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use kestrel_contracts::governance::FeeSchedule;
use kestrel_contracts::vault::RootVault;
use kestrel_protocol::clock::ManualClock;
use kestrel_protocol::config::VaultConfig;
use kestrel_protocol::custody::{Custody, InMemoryCustody};
use kestrel_protocol::ledger::Amount;
use kestrel_protocol::math::U256;
use kestrel_protocol::valuation::UnitPriceAdapter;

pub const START: u64 = 1_700_000_000;
pub const USDC_EXISTENTIAL: Amount = 1_000;
pub const WETH_EXISTENTIAL: Amount = 1_000_000_000;

/// A two-asset vault with everything a test needs to poke at.
pub struct Harness {
    pub vault: Arc<RootVault>,
    pub custody: Arc<InMemoryCustody>,
    pub clock: Arc<ManualClock>,
    pub adapter: Arc<UnitPriceAdapter>,
}

impl Harness {
    pub fn new(schedule: FeeSchedule) -> Self {
        let config = VaultConfig::new(
            vec!["usdc".into(), "weth".into()],
            vec![USDC_EXISTENTIAL, WETH_EXISTENTIAL],
        );
        let custody = Arc::new(InMemoryCustody::new(2));
        let clock = Arc::new(ManualClock::new(START));
        let adapter = Arc::new(UnitPriceAdapter::at_par("usd", 2));
        let vault = RootVault::new(
            config,
            "admin",
            schedule,
            adapter.clone(),
            custody.clone(),
            clock.clone(),
        )
        .expect("vault");
        Self {
            vault: Arc::new(vault),
            custody,
            clock,
            adapter,
        }
    }

    pub fn fee_free() -> Self {
        Self::new(FeeSchedule::fee_free("treasury", "usd"))
    }

    /// Credits `account` with a large balance of both assets.
    pub fn fund(&self, account: &str) {
        self.custody
            .fund(account, &[1_000_000_000_000_000, 1_000_000_000_000_000_000_000_000])
            .expect("fund");
    }

    /// Assets currently held by the vault.
    pub fn holdings(&self) -> Vec<Amount> {
        self.custody.holdings().expect("holdings")
    }

    /// The smallest first deposit the vault accepts.
    pub fn seed(&self, account: &str) -> Amount {
        self.fund(account);
        let (shares, _) = self
            .vault
            .deposit(
                account,
                &[USDC_EXISTENTIAL * 10, WETH_EXISTENTIAL * 10],
                0,
                u64::MAX,
            )
            .expect("seed deposit");
        shares
    }
}

/// Fee schedule with distinct treasuries so each mint is visible.
pub fn schedule(management: u128, performance: u128, protocol: u128, throttle: u64) -> FeeSchedule {
    FeeSchedule {
        management_fee: management,
        performance_fee: performance,
        protocol_fee: protocol,
        fee_charge_throttle: throttle,
        strategy_treasury: "strategy".into(),
        performance_treasury: "performance".into(),
        protocol_treasury: "protocol".into(),
        valuation_reference: "usd".into(),
    }
}

/// `a * b / c` in 256 bits, written out independently of the vault's math.
pub fn wide(a: Amount, b: Amount, c: Amount) -> Amount {
    (U256::from(a) * U256::from(b) / U256::from(c)).as_u128()
}

/// Expected shares for a deposit, computed the long way.
pub fn expected_shares(
    tvl: &[Amount],
    amounts: &[Amount],
    supply: Amount,
    existentials: &[Amount],
) -> Amount {
    let lp = |amounts: &[Amount]| -> (Amount, bool) {
        if supply == 0 {
            return (*amounts.iter().max().unwrap(), false);
        }
        let candidates: Vec<Amount> = (0..tvl.len())
            .filter(|&i| tvl[i] >= existentials[i])
            .map(|i| wide(amounts[i], supply, tvl[i]))
            .collect();
        match candidates.iter().min() {
            Some(min) => (*min, true),
            None => (*amounts.iter().max().unwrap(), false),
        }
    };
    let (first, significant) = lp(amounts);
    if !significant {
        return first;
    }
    let normalized: Vec<Amount> = (0..tvl.len())
        .map(|i| {
            if tvl[i] < existentials[i] {
                0
            } else {
                amounts[i].min(wide(tvl[i], first, supply))
            }
        })
        .collect();
    lp(&normalized).0
}
