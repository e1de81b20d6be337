//! E2E Test: Full Sync From Honest Peers
//!
//! - A source chain produces signed blocks
//! - A fresh node downloads every block from two peers and imports in order
//! - Both chains end with identical blocks, results and state

use {
    std::time::Duration,
    tessera_block_sync::Capability,
    tessera_chain::NodeConfig,
    tessera_e2e_tests::helpers::*,
    tessera_ledger_types::Address,
};

#[test]
fn test_sync_35_blocks_from_two_peers() {
    init_logging();
    let config = NodeConfig::dev_default();
    let keys = validator_keys(4);
    let genesis = dev_genesis(&keys);
    let source = open_chain(&config, &genesis);
    produce_blocks(&source, &keys, 35);

    let net = SyncNetwork::new(&config, &genesis, source.clone());
    net.connect("alice", &[Capability::Core]);
    net.connect("bob", &[Capability::Core]);

    assert!(net.sync(Duration::from_secs(30)), "sync did not finish");
    assert!(!net.manager.is_running());
    assert_same_chain(&source, &net.node);

    // every faucet transfer landed
    for number in 0..35u64 {
        let recipient = Address::from_low_u64(number.saturating_add(0x1000));
        assert_eq!(
            net.node.get_account(&recipient).unwrap(),
            source.get_account(&recipient).unwrap()
        );
    }
    assert_eq!(
        net.node.get_account(&FAUCET).unwrap().nonce,
        35,
        "faucet nonce after 35 transfers"
    );

    assert_eq!(net.metrics.sync.blocks_imported.get(), 35);
    assert_eq!(net.metrics.chain.blocks_imported.get(), 35);
    assert_eq!(net.metrics.chain.latest_block.get(), 35);
    assert_eq!(net.metrics.sync.invalid_blocks.get(), 0);
}

#[test]
fn test_synced_node_keeps_following() {
    init_logging();
    let config = NodeConfig::dev_default();
    let keys = validator_keys(4);
    let genesis = dev_genesis(&keys);
    let source = open_chain(&config, &genesis);
    produce_blocks(&source, &keys, 12);

    let net = SyncNetwork::new(&config, &genesis, source.clone());
    let peer = net.connect("alice", &[Capability::Core]);
    assert!(net.sync(Duration::from_secs(30)));
    assert_eq!(net.node.latest_block_number(), 12);

    // the source moves on; a second session picks up from the new head
    produce_blocks(&source, &keys, 8);
    peer.set_remote_height(source.latest_block_number());
    assert!(net.sync(Duration::from_secs(30)));
    assert_same_chain(&source, &net.node);

    let progress = net.manager.progress();
    assert_eq!(progress.starting_height, 13);
    assert_eq!(progress.target_height, 21);
    assert_eq!(progress.remaining(), 0);
}

#[test]
fn test_already_synced_node_returns_immediately() {
    init_logging();
    let config = NodeConfig::dev_default();
    let keys = validator_keys(4);
    let genesis = dev_genesis(&keys);
    let source = open_chain(&config, &genesis);

    let net = SyncNetwork::new(&config, &genesis, source);
    net.connect("alice", &[Capability::Core]);
    assert!(net.sync(Duration::from_secs(5)));
    assert_eq!(net.node.latest_block_number(), 0);
    assert_eq!(net.metrics.sync.blocks_requested.get(), 0);
}
