//! Fork activation benchmarks.
//!
//! Measures:
//! - Sequential height queries answered from the previous height's memo
//! - The same queries with a cleared memo, forcing a full window scan
//! - Window sizes 64, 1000 and 2016

use {
    criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput},
    rand::{rngs::StdRng, Rng, SeedableRng},
    std::hint::black_box,
    tessera_forks::{ActivatedForks, ForkConfig, ForkRule},
    tessera_ledger_types::{Fork, ForkSignalSet},
};

const HEIGHTS: u64 = 2_000;

fn tracker(blocks_to_check: u64) -> ActivatedForks {
    let rule = ForkRule {
        fork: Fork::VirtualMachine,
        // never reached, so every query has to count
        blocks_required: blocks_to_check.saturating_add(1),
        blocks_to_check,
        signaling_start: 0,
        signaling_end: u64::MAX,
    };
    ActivatedForks::new(
        ForkConfig {
            rules: vec![rule],
            ..ForkConfig::default()
        },
        [],
    )
}

/// Signal pattern over `0..2 * HEIGHTS`, roughly half set.
fn pattern() -> Vec<bool> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..HEIGHTS.saturating_mul(2)).map(|_| rng.random_bool(0.5)).collect()
}

fn signals(pattern: &[bool]) -> impl Fn(u64) -> ForkSignalSet + '_ {
    let signaled = ForkSignalSet::of(&[Fork::VirtualMachine]).unwrap_or_default();
    move |height| {
        let hit = usize::try_from(height)
            .ok()
            .and_then(|index| pattern.get(index))
            .copied()
            .unwrap_or(false);
        if hit {
            signaled.clone()
        } else {
            ForkSignalSet::default()
        }
    }
}

fn bench_sequential_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("forks/sequential_queries");
    let pattern = pattern();
    let source = signals(&pattern);

    for &window in &[64u64, 1_000, 2_016] {
        group.throughput(Throughput::Elements(HEIGHTS));
        group.bench_with_input(BenchmarkId::new("memoized", window), &window, |b, &window| {
            let tracker = tracker(window);
            b.iter(|| {
                tracker.clear_memo();
                for height in 1..=HEIGHTS {
                    black_box(tracker.is_activated(&source, Fork::VirtualMachine, height));
                }
            });
        });
        group.bench_with_input(BenchmarkId::new("full_scan", window), &window, |b, &window| {
            let tracker = tracker(window);
            b.iter(|| {
                for height in 1..=HEIGHTS {
                    black_box(tracker.count_full_scan(&source, Fork::VirtualMachine, height));
                }
            });
        });
    }
    group.finish();
}

fn bench_memo_hit(c: &mut Criterion) {
    let pattern = pattern();
    let source = signals(&pattern);
    let tracker = tracker(1_000);
    for height in 1..=HEIGHTS {
        tracker
            .is_activated(&source, Fork::VirtualMachine, height)
            .unwrap_or_else(|err| panic!("warming the memo failed: {err}"));
    }

    c.bench_function("forks/memo_hit", |b| {
        b.iter(|| black_box(tracker.is_activated(&source, Fork::VirtualMachine, HEIGHTS)));
    });
}

criterion_group!(benches, bench_sequential_queries, bench_memo_hit);
criterion_main!(benches);
