//! Walk-through of a root vault's life.
//!
//! Creates a two-asset vault, takes a first deposit, schedules and commits
//! a fee change through the timelock, lets a year pass, then deposits,
//! withdraws and persists. Everything runs on a manual clock and in-memory
//! custody so the numbers are reproducible.
//!
//! Run with:
//!   cargo run -p kestrel-contracts --example demo

use std::sync::Arc;

use anyhow::Context;

use kestrel_contracts::governance::{FeeSchedule, ParamId, ParamValue};
use kestrel_contracts::vault::RootVault;
use kestrel_protocol::clock::ManualClock;
use kestrel_protocol::config::{VaultConfig, D18, SECONDS_PER_YEAR};
use kestrel_protocol::custody::{Custody, InMemoryCustody};
use kestrel_protocol::logging::{init_logging, LogFormat};
use kestrel_protocol::storage::VaultStore;
use kestrel_protocol::valuation::{UnitPriceAdapter, ValuationAdapter};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]==================================================={RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn info(label: &str, value: impl std::fmt::Display) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn balances(vault: &RootVault, accounts: &[&str]) {
    for account in accounts {
        println!(
            "  {BOLD}{account:<12}{RESET} {WHITE}{:>28}{RESET} {DIM}shares{RESET}",
            vault.balance_of(account)
        );
    }
}

fn main() -> anyhow::Result<()> {
    let format = std::env::var("LOG_FORMAT")
        .map(|f| LogFormat::from_str_lossy(&f))
        .unwrap_or(LogFormat::Pretty);
    init_logging("info", format);

    section(1, "Create a USDC/WETH vault");
    let config = VaultConfig::new(vec!["usdc".into(), "weth".into()], vec![1_000, 1_000_000_000]);
    let custody = Arc::new(InMemoryCustody::new(2));
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let adapter = Arc::new(UnitPriceAdapter::new("usd", vec![D18 * 1_000_000_000_000, D18 * 2]));
    let schedule = FeeSchedule {
        management_fee: 0,
        performance_fee: 100_000_000,
        protocol_fee: 10_000_000,
        fee_charge_throttle: 3_600,
        strategy_treasury: "strategy".into(),
        performance_treasury: "performance".into(),
        protocol_treasury: "protocol".into(),
        valuation_reference: "usd".into(),
    };
    let vault = RootVault::new(
        config,
        "admin",
        schedule,
        adapter.clone(),
        custody.clone(),
        clock.clone(),
    )
    .context("creating vault")?;
    info("vault", vault.id());
    info("governance delay (s)", vault.config().governance.governance_delay);

    section(2, "First deposit");
    custody.fund("alice", &[5_000_000_000, 5_000_000_000_000_000_000])?;
    custody.fund("bob", &[5_000_000_000, 5_000_000_000_000_000_000])?;
    let (shares, taken) = vault.deposit("alice", &[1_000_000_000, 1_000_000_000_000_000_000], 0, u64::MAX)?;
    success(&format!("alice minted {shares} shares for {taken:?}"));

    section(3, "Stage a 2% management fee and wait out the timelock");
    let ready = vault.stage("admin", ParamId::ManagementFee, ParamValue::Rate(20_000_000))?;
    info("ready at", ready);
    match vault.commit("admin", ParamId::ManagementFee) {
        Err(err) => println!("{DIM}  early commit refused: {err}{RESET}"),
        Ok(_) => anyhow::bail!("timelock let an early commit through"),
    }
    clock.set(ready);
    vault.commit("admin", ParamId::ManagementFee)?;
    success("management fee committed");

    section(4, "A year passes and WETH rallies 25%");
    clock.advance(SECONDS_PER_YEAR);
    adapter.set_price(1, D18 * 5 / 2)?;
    let preview = vault.preview_fees()?;
    info("pending management shares", preview.management());
    info("pending performance shares", preview.performance_minted);

    let (shares, taken) = vault.deposit("bob", &[500_000_000, 1_000_000_000_000_000_000], 0, u64::MAX)?;
    success(&format!("bob minted {shares} shares for {taken:?}"));
    balances(&vault, &["alice", "bob", "strategy", "performance", "protocol"]);

    section(5, "Bob withdraws half");
    let half = vault.balance_of("bob") / 2;
    let released = vault.withdraw("bob", half, &[0, 0], "bob")?;
    success(&format!("released {released:?}"));
    info("vault holdings", format!("{:?}", custody.holdings()?));
    info("total supply", vault.total_supply());

    section(6, "Persist and restore");
    let dir = std::env::temp_dir().join(format!("kestrel-demo-{}", vault.id()));
    let store = VaultStore::open(&dir).context("opening store")?;
    vault.persist(&store)?;
    let restored = RootVault::restore(
        &store,
        vault.id(),
        vec![adapter.clone() as Arc<dyn ValuationAdapter>],
        custody.clone() as Arc<dyn Custody>,
        clock.clone(),
    )?;
    info("restored supply", restored.total_supply());
    info("high-water mark", restored.high_water_mark_per_share());
    drop(store);
    let _ = std::fs::remove_dir_all(&dir);

    section(7, "Metrics");
    print!("{}", vault.metrics().encode()?);
    Ok(())
}
