use budgetwise_core::{
    core::services::{BalanceService, ExpenseService, NewExpense, ParticipantService},
    currency::CurrencyTable,
    ledger::{Participant, ParticipantId, SplitLedger},
    utils::persistence::{load_ledger_from_file, save_ledger_to_file},
};
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::tempdir;

const CURRENCIES: [&str; 3] = ["INR", "USD", "EUR"];

fn build_sample_ledger(expense_count: usize) -> SplitLedger {
    let me = ParticipantId::acting_default();
    let mut ledger = SplitLedger::new(Participant::active(me.clone(), "me@example.com"));
    let currencies = CurrencyTable::default();
    let friends: Vec<ParticipantId> = (0..12)
        .map(|idx| {
            ParticipantService::invite(&mut ledger, &format!("friend{idx}@example.com"), None)
                .expect("invite")
                .id
        })
        .collect();

    let start_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    for idx in 0..expense_count {
        let payer = if idx % 4 == 0 {
            friends[idx % friends.len()].clone()
        } else {
            me.clone()
        };
        let participants = (0..1 + idx % 5)
            .map(|offset| friends[(idx + offset) % friends.len()].clone())
            .collect::<Vec<_>>();
        let draft = NewExpense::new(
            format!("Expense {idx}"),
            25.0 + (idx % 400) as f64,
            CURRENCIES[idx % CURRENCIES.len()],
            payer,
            start_date + Duration::days((idx % 365) as i64),
        )
        .with_participants(participants);
        let expense = ExpenseService::add(&mut ledger, &currencies, &me, draft).expect("add expense");
        if idx % 3 == 0 {
            if let Some(split) = expense.outstanding().next() {
                let debtor = split.user_id.clone();
                ExpenseService::settle(&mut ledger, expense.id, &debtor).expect("settle");
            }
        }
    }
    ledger
}

fn bench_balances(c: &mut Criterion) {
    let ledger = build_sample_ledger(black_box(10_000));
    let currencies = CurrencyTable::default();
    let me = ParticipantId::acting_default();

    c.bench_function("global_balances_10k", |b| {
        b.iter(|| {
            let balances =
                BalanceService::global_balances(&ledger, &currencies, "INR").expect("balances");
            black_box(balances);
        })
    });

    c.bench_function("friend_balances_10k", |b| {
        b.iter(|| {
            let balances = BalanceService::friend_balances(&ledger, &currencies, &me, "USD")
                .expect("friend balances");
            black_box(balances);
        })
    });

    c.bench_function("suggest_transfers_10k", |b| {
        b.iter_batched(
            || BalanceService::global_balances(&ledger, &currencies, "INR").expect("balances"),
            |balances| black_box(BalanceService::suggest_transfers(&balances)),
            BatchSize::SmallInput,
        );
    });
}

fn bench_snapshot_io(c: &mut Criterion) {
    let ledger = build_sample_ledger(black_box(10_000));
    let dir = tempdir().expect("tempdir");
    let file_path = dir.path().join("ledger.json");

    c.bench_function("snapshot_save_10k", |b| {
        b.iter(|| {
            save_ledger_to_file(&ledger, &file_path).expect("save ledger");
        })
    });

    save_ledger_to_file(&ledger, &file_path).expect("seed");

    c.bench_function("snapshot_load_10k", |b| {
        b.iter(|| {
            let loaded = load_ledger_from_file(&file_path).expect("load ledger");
            black_box(loaded);
        })
    });
}

criterion_group!(benches, bench_balances, bench_snapshot_io);
criterion_main!(benches);
