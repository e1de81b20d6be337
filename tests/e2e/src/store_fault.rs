//! E2E Test: Store Failure During Sync
//!
//! - The syncing node's account store rejects writes while block #1 imports
//! - The block stays queued for import and the serving peer keeps its standing
//! - Once the store heals the same session finishes from the queued blocks

use {
    std::{
        sync::Arc,
        thread,
        time::{Duration, Instant},
    },
    tessera_block_sync::Capability,
    tessera_chain::{ChainStores, NodeConfig},
    tessera_e2e_tests::helpers::*,
    tessera_ledger_types::Amount,
    tessera_state::MemoryStore,
};

#[test]
fn test_store_failure_keeps_block_queued_for_retry() {
    init_logging();
    let config = NodeConfig::dev_default();
    let keys = validator_keys(4);
    let genesis = dev_genesis(&keys);
    let source = open_chain(&config, &genesis);
    produce_blocks(&source, &keys, 3);

    let accounts = Arc::new(MemoryStore::new());
    let stores = ChainStores {
        blocks: Arc::new(MemoryStore::new()),
        accounts: accounts.clone(),
        delegates: Arc::new(MemoryStore::new()),
    };
    let net = SyncNetwork::with_stores(&config, &genesis, source.clone(), stores);
    let alice = net.connect("alice", &[Capability::Core]);

    assert!(net.manager.begin_session(4));
    let deadline = Instant::now().checked_add(Duration::from_secs(10)).unwrap();
    while net.manager.queue_snapshot().to_validate != vec![1, 2, 3] {
        assert!(Instant::now() < deadline, "blocks were not downloaded");
        net.manager.run_download_once();
        thread::sleep(Duration::from_millis(1));
    }

    accounts.set_fail_writes(true);
    net.manager.run_import_once();
    assert_eq!(net.node.latest_block_number(), 0);
    assert!(net.node.get_block(1).unwrap().is_none());
    let faucet = net.node.get_account(&FAUCET).unwrap();
    assert_eq!(faucet.nonce, 0);
    assert_eq!(faucet.available, Amount::from_units(1_000_000));
    let snapshot = net.manager.queue_snapshot();
    assert!(snapshot.to_import.contains(&1));
    assert!(!snapshot.to_download.contains(&1));
    assert!(!net.manager.is_bad_peer("alice"));
    assert_eq!(alice.disconnected(), None);
    assert_eq!(net.metrics.sync.invalid_blocks.get(), 0);
    assert!(net.manager.is_running());

    accounts.set_fail_writes(false);
    let deadline = Instant::now().checked_add(Duration::from_secs(10)).unwrap();
    while net.manager.is_running() && Instant::now() < deadline {
        net.manager.run_import_once();
        thread::sleep(Duration::from_millis(1));
    }
    assert!(!net.manager.is_running(), "session did not finish");
    assert!(!net.manager.is_bad_peer("alice"));
    assert_same_chain(&source, &net.node);
    assert_eq!(
        net.node.get_account(&FAUCET).unwrap(),
        source.get_account(&FAUCET).unwrap()
    );
}
