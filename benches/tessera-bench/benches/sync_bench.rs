//! Block sync benchmarks.
//!
//! Measures:
//! - A full session over 500 and 2000 blocks, stepped by hand against
//!   simulated peers that answer every request immediately
//! - Full blocks versus block parts without votes (fast sync)

use {
    criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput},
    std::{hint::black_box, sync::Arc},
    tessera_block_sync::{
        simulated::{build_chain, serve_request, SimulatedChain, SimulatedChannel, SimulatedNetwork},
        Capability, SyncConfig, SyncManager,
    },
    tessera_ledger_types::Block,
};

const PEERS: usize = 4;

struct Session {
    chain: Arc<SimulatedChain>,
    peers: Vec<Arc<SimulatedChannel>>,
    manager: SyncManager,
}

fn session(len: u64, fast_sync: bool) -> Session {
    let config = SyncConfig {
        fast_sync,
        max_queued_jobs: 256,
        max_pending_jobs: 64,
        max_pending_blocks: 512,
        ..SyncConfig::dev_default()
    };
    let chain = Arc::new(SimulatedChain::new());
    let network = Arc::new(SimulatedNetwork::new());
    let peers = (0..PEERS)
        .map(|index| {
            network.connect(
                SimulatedChannel::new(&format!("peer{index}"), len)
                    .with_capabilities(&[Capability::Core, Capability::FastSync]),
            )
        })
        .collect();
    let manager = SyncManager::new(config, 100, chain.clone(), network)
        .unwrap_or_else(|err| panic!("invalid sync config: {err}"));
    Session {
        chain,
        peers,
        manager,
    }
}

/// Steps the session until it stops; returns the imported height.
fn run(session: &Session, remote: &[Block]) -> u64 {
    let target = (remote.len() as u64).saturating_add(1);
    session.manager.begin_session(target);
    while session.manager.is_running() {
        for _ in 0..PEERS {
            session.manager.run_download_once();
        }
        for peer in &session.peers {
            for request in peer.take_sent() {
                if let Some(message) = serve_request(remote, &request) {
                    session.manager.on_message(peer.clone(), message);
                }
            }
        }
        session.manager.run_import_once();
    }
    session.chain.blocks().len() as u64
}

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync/session");
    group.sample_size(10);

    for &len in &[500u64, 2_000] {
        let remote = build_chain(len);
        group.throughput(Throughput::Elements(len));
        for fast_sync in [false, true] {
            let name = if fast_sync { "fast_sync" } else { "full_blocks" };
            group.bench_with_input(BenchmarkId::new(name, len), &remote, |b, remote| {
                b.iter_batched(
                    || session(len, fast_sync),
                    |session| black_box(run(&session, remote)),
                    BatchSize::PerIteration,
                );
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_session);
criterion_main!(benches);
