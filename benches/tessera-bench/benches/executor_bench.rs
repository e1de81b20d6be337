//! Transaction executor benchmarks.
//!
//! Measures:
//! - Transfer batches of 10, 100 and 1000 transactions
//! - Batches where every other transaction is rejected for its nonce
//! - Vote and unvote round trips against one delegate

use {
    criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput},
    std::{hint::black_box, sync::Arc},
    tessera_bench::helpers::{accounts, transfers, FEE},
    tessera_executor::{BlockContext, ChainSpec, TransactionExecutor},
    tessera_ledger_types::{Address, Amount, Transaction, TransactionType},
    tessera_state::{AccountState, DelegateState, MemoryStore},
};

const DELEGATE: Address = Address::from_low_u64(0xde1e);

struct Ledger {
    executor: TransactionExecutor,
    accounts: AccountState,
    delegates: DelegateState,
    context: BlockContext,
}

fn ledger(senders: &[Address]) -> Ledger {
    let mut accounts = AccountState::new(Arc::new(MemoryStore::new()));
    let mut delegates = DelegateState::new(Arc::new(MemoryStore::new()));
    for sender in senders {
        accounts
            .add_available(sender, Amount::from_units(1_000))
            .unwrap_or_else(|err| panic!("funding failed: {err}"));
    }
    delegates
        .register(&DELEGATE, "bench", 0)
        .unwrap_or_else(|err| panic!("registration failed: {err}"));
    accounts.commit().unwrap_or_else(|err| panic!("{err}"));
    delegates.commit().unwrap_or_else(|err| panic!("{err}"));

    let spec = ChainSpec::dev_default();
    let context = BlockContext {
        number: 1,
        gas_limit: spec.max_block_gas_limit,
        ..BlockContext::default()
    };
    Ledger {
        executor: TransactionExecutor::new(spec, None),
        accounts,
        delegates,
        context,
    }
}

impl Ledger {
    /// Executes `transactions` in fresh block layers that are thrown away.
    fn run(&self, transactions: &[Transaction]) -> usize {
        let mut accounts = self.accounts.track();
        let mut delegates = self.delegates.track();
        let results = self
            .executor
            .execute(transactions, &mut accounts, &mut delegates, &self.context, 0)
            .unwrap_or_else(|err| panic!("execution failed: {err}"));
        accounts.rollback();
        delegates.rollback();
        results.iter().filter(|result| result.is_acceptable()).count()
    }
}

fn bench_transfer_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("executor/transfers");
    let senders = accounts(10);
    let ledger = ledger(&senders);

    for &count in &[10usize, 100, 1_000] {
        let batch = transfers(&senders, count, 0);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("accepted", count), &batch, |b, batch| {
            b.iter(|| black_box(ledger.run(batch)));
        });

        let mut mixed = batch.clone();
        for tx in mixed.iter_mut().skip(1).step_by(2) {
            tx.nonce = tx.nonce.saturating_add(1_000);
        }
        group.bench_with_input(BenchmarkId::new("half_rejected", count), &mixed, |b, mixed| {
            b.iter(|| black_box(ledger.run(mixed)));
        });
    }
    group.finish();
}

fn bench_vote_round_trip(c: &mut Criterion) {
    let senders = accounts(100);
    let ledger = ledger(&senders);
    let batch: Vec<Transaction> = senders
        .iter()
        .flat_map(|sender| {
            let vote = Transaction {
                tx_type: TransactionType::Vote,
                from: *sender,
                to: DELEGATE,
                value: Amount::from_nano(1_000),
                fee: Amount::from_nano(FEE),
                nonce: 0,
                ..Transaction::default()
            };
            let unvote = Transaction {
                tx_type: TransactionType::Unvote,
                nonce: 1,
                ..vote.clone()
            };
            [vote, unvote]
        })
        .collect();

    let mut group = c.benchmark_group("executor/votes");
    group.throughput(Throughput::Elements(batch.len() as u64));
    group.bench_function("vote_unvote", |b| b.iter(|| black_box(ledger.run(&batch))));
    group.finish();
}

criterion_group!(benches, bench_transfer_batches, bench_vote_round_trip);
criterion_main!(benches);
