// Root vault benchmarks.
//
// Covers the pure share math, a fee charge, and full deposit/withdraw
// round trips through the vault lock and in-memory custody.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use kestrel_contracts::deposit::plan_deposit;
use kestrel_contracts::fees::charge_fees;
use kestrel_contracts::governance::FeeSchedule;
use kestrel_contracts::vault::RootVault;
use kestrel_protocol::clock::ManualClock;
use kestrel_protocol::config::VaultConfig;
use kestrel_protocol::custody::InMemoryCustody;
use kestrel_protocol::ledger::ShareLedger;
use kestrel_protocol::valuation::UnitPriceAdapter;

fn schedule() -> FeeSchedule {
    FeeSchedule {
        management_fee: 20_000_000,
        performance_fee: 200_000_000,
        protocol_fee: 5_000_000,
        fee_charge_throttle: 0,
        strategy_treasury: "strategy".into(),
        performance_treasury: "performance".into(),
        protocol_treasury: "protocol".into(),
        valuation_reference: "usd".into(),
    }
}

fn bench_plan_deposit(c: &mut Criterion) {
    let mut group = c.benchmark_group("deposit/plan");
    for assets in [2usize, 4, 8] {
        let tvl: Vec<u128> = (0..assets).map(|i| 1_000_000_000 * (i as u128 + 1)).collect();
        let amounts: Vec<u128> = (0..assets).map(|_| 5_000_000).collect();
        let existentials = vec![1_000u128; assets];
        group.throughput(Throughput::Elements(assets as u64));
        group.bench_with_input(BenchmarkId::from_parameter(assets), &assets, |b, _| {
            b.iter(|| {
                plan_deposit(
                    black_box(&tvl),
                    black_box(&amounts),
                    black_box(3_000_000_000),
                    &existentials,
                )
            });
        });
    }
    group.finish();
}

fn bench_charge_fees(c: &mut Criterion) {
    let adapter = UnitPriceAdapter::at_par("usd", 2);
    let schedule = schedule();
    let mut base = ShareLedger::new(0);
    base.mint("alice", 1_000_000_000_000).unwrap();
    base.raise_high_water_mark(1_000_000_000_000_000_000);

    c.bench_function("fees/charge", |b| {
        b.iter(|| {
            let mut ledger = base.clone();
            charge_fees(
                &mut ledger,
                &schedule,
                black_box(&[2_000_000_000_000, 2_000_000_000_000]),
                &[1_000, 1_000],
                &adapter,
                86_400,
            )
        });
    });
}

fn bench_deposit_withdraw(c: &mut Criterion) {
    let custody = Arc::new(InMemoryCustody::new(2));
    let clock = Arc::new(ManualClock::new(0));
    let vault = RootVault::new(
        VaultConfig::new(vec!["a".into(), "b".into()], vec![1_000, 1_000]),
        "admin",
        schedule(),
        Arc::new(UnitPriceAdapter::at_par("usd", 2)),
        custody.clone(),
        clock.clone(),
    )
    .unwrap();
    custody.fund("seed", &[1_000_000, 1_000_000]).unwrap();
    vault.deposit("seed", &[1_000_000, 1_000_000], 0, u64::MAX).unwrap();
    custody.fund("bench", &[u128::MAX / 4, u128::MAX / 4]).unwrap();

    c.bench_function("vault/deposit_withdraw", |b| {
        b.iter(|| {
            clock.advance(60);
            let (shares, _) = vault
                .deposit("bench", black_box(&[10_000, 10_000]), 0, u64::MAX)
                .unwrap();
            vault.withdraw("bench", shares, &[0, 0], "bench").unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_plan_deposit,
    bench_charge_fees,
    bench_deposit_withdraw
);
criterion_main!(benches);
