//! E2E Test: Fast Sync
//!
//! - Peers advertise the fast sync capability and answer with block parts
//! - Votes are downloaded only for validator-set pivots and the last
//!   interval before the target
//! - The node re-executes every block, so results and state still match

use {
    std::time::Duration,
    tessera_block_sync::Capability,
    tessera_chain::NodeConfig,
    tessera_e2e_tests::helpers::*,
};

fn fast_config() -> NodeConfig {
    let mut config = NodeConfig::dev_default();
    config.sync.fast_sync = true;
    config
}

#[test]
fn test_fast_sync_fetches_votes_only_where_checked() {
    init_logging();
    let config = fast_config();
    let interval = config.chain.validator_update_interval;
    let keys = validator_keys(4);
    let genesis = dev_genesis(&keys);
    let source = open_chain(&config, &genesis);
    produce_blocks(&source, &keys, 45);

    let net = SyncNetwork::new(&config, &genesis, source.clone());
    net.connect("alice", &[Capability::Core, Capability::FastSync]);
    net.connect("carol", &[Capability::Core, Capability::FastSync]);

    assert!(net.sync(Duration::from_secs(30)), "fast sync did not finish");
    assert_same_chain(&source, &net.node);
    assert_eq!(
        net.node.get_account(&FAUCET).unwrap(),
        source.get_account(&FAUCET).unwrap()
    );

    let target = source.latest_block_number().saturating_add(1);
    for number in 1..target {
        let stored = net.node.get_block(number).unwrap().unwrap();
        let checked = number % interval == 0 || number >= target - interval;
        assert_eq!(
            !stored.votes.is_empty(),
            checked,
            "votes of block #{number}"
        );
    }
}

#[test]
fn test_fast_sync_ignores_peers_without_capability() {
    init_logging();
    let config = fast_config();
    let keys = validator_keys(4);
    let genesis = dev_genesis(&keys);
    let source = open_chain(&config, &genesis);
    produce_blocks(&source, &keys, 5);

    let net = SyncNetwork::new(&config, &genesis, source.clone());
    let legacy = net.connect("legacy", &[Capability::Core]);
    assert!(!net.sync(Duration::from_millis(300)));
    assert!(legacy.take_sent().is_empty());
    assert_eq!(net.node.latest_block_number(), 0);

    net.connect("modern", &[Capability::Core, Capability::FastSync]);
    assert!(net.sync(Duration::from_secs(30)));
    assert_same_chain(&source, &net.node);
    assert!(legacy.take_sent().is_empty());
}
