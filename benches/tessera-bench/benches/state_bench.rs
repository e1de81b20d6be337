//! State layer benchmarks.
//!
//! Measures:
//! - Reads that fall through 1, 4 and 16 layers to the store
//! - Committing a tracked layer into its parent and a root into the store
//! - Account updates through a block layer and per-transaction children

use {
    criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput},
    std::{hint::black_box, sync::Arc},
    tessera_bench::helpers::accounts,
    tessera_ledger_types::Amount,
    tessera_state::{AccountState, KeyValueStore, MemoryStore, StateLayer},
};

fn seeded_store(entries: u64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for key in 0..entries {
        store
            .put(&key.to_be_bytes(), &[0xab; 64])
            .unwrap_or_else(|err| panic!("seed failed: {err}"));
    }
    store
}

fn bench_layered_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("state/layered_read");
    let store = seeded_store(10_000);

    for &depth in &[1usize, 4, 16] {
        group.throughput(Throughput::Elements(1_000));
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, &depth| {
            let root = StateLayer::root(store.clone());
            let mut layers = vec![root];
            for level in 0..depth {
                let mut child = layers[level].track();
                // one shadowed key per level so lookups pass through pending maps
                child.put((level as u64).to_be_bytes().to_vec(), vec![0xcd; 64]);
                layers.push(child);
            }
            let top = &layers[depth];
            b.iter(|| {
                for key in (0..10_000u64).step_by(10) {
                    black_box(top.get(&key.to_be_bytes()).ok());
                }
            });
        });
    }
    group.finish();
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("state/commit");

    for &entries in &[100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(entries as u64));
        group.bench_with_input(BenchmarkId::new("into_parent", entries), &entries, |b, &entries| {
            b.iter_batched(
                || {
                    let root = StateLayer::root(Arc::new(MemoryStore::new()));
                    let mut child = root.track();
                    for key in 0..entries as u64 {
                        child.put(key.to_be_bytes().to_vec(), vec![0x11; 32]);
                    }
                    (root, child)
                },
                |(root, mut child)| {
                    black_box(child.commit().ok());
                    root
                },
                BatchSize::SmallInput,
            );
        });
        group.bench_with_input(BenchmarkId::new("root_to_store", entries), &entries, |b, &entries| {
            b.iter_batched(
                || {
                    let mut root = StateLayer::root(Arc::new(MemoryStore::new()));
                    for key in 0..entries as u64 {
                        root.put(key.to_be_bytes().to_vec(), vec![0x11; 32]);
                    }
                    root
                },
                |mut root| black_box(root.commit().ok()),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_account_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("state/account_updates");
    let addresses = accounts(1_000);

    for &per_tx in &[1usize, 8] {
        group.throughput(Throughput::Elements(addresses.len() as u64));
        group.bench_with_input(BenchmarkId::new("writes_per_tx", per_tx), &per_tx, |b, &per_tx| {
            let accounts = AccountState::new(Arc::new(MemoryStore::new()));
            b.iter(|| {
                let mut block = accounts.track();
                for address in &addresses {
                    let mut tx = block.track();
                    for _ in 0..per_tx {
                        black_box(tx.add_available(address, Amount::from_nano(1)).ok());
                    }
                    black_box(tx.commit().ok());
                }
                block.rollback();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_layered_reads, bench_commit, bench_account_updates);
criterion_main!(benches);
