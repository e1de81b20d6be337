//! E2E Test: Peers Serving Invalid Blocks
//!
//! - A block at a checkpoint height arrives without a vote quorum
//! - The height goes back to the download queue, the peer is banned and
//!   disconnected, and the session finishes from an honest peer
//! - Blocks with broken hash links never reach the chain

use {
    std::{
        thread,
        time::{Duration, Instant},
    },
    tessera_block_sync::{simulated::SimulatedChannel, Capability, DisconnectReason},
    tessera_chain::NodeConfig,
    tessera_e2e_tests::helpers::*,
};

#[test]
fn test_invalid_votes_at_height_10() {
    init_logging();
    let config = NodeConfig::dev_default();
    assert_eq!(config.chain.validator_update_interval, 10);
    let keys = validator_keys(4);
    let genesis = dev_genesis(&keys);
    let source = open_chain(&config, &genesis);
    produce_blocks(&source, &keys, 25);

    let net = SyncNetwork::new(&config, &genesis, source.clone());
    // answered by hand, not by the responder thread
    let mallory = net
        .network
        .connect(SimulatedChannel::new("mallory", source.latest_block_number()));
    let mut forged = source.get_block(10).unwrap().unwrap();
    forged.votes.truncate(2);

    assert!(net.manager.begin_session(26));
    for _ in 0..100 {
        net.manager.run_download_once();
        for request in mallory.take_sent() {
            let replacement = (request.number() == 10).then(|| forged.clone());
            let message = serve(&source, &request, replacement).unwrap();
            net.manager.on_message(mallory.clone(), message);
        }
    }
    let snapshot = net.manager.queue_snapshot();
    assert!(snapshot.to_download.is_empty());
    assert_eq!(snapshot.to_validate, (1..=25).collect::<Vec<u64>>());

    net.manager.run_import_once();
    let snapshot = net.manager.queue_snapshot();
    assert!(snapshot.to_download.contains(&10));
    assert!(!snapshot.to_validate.contains(&10));
    assert!(!snapshot.to_import.contains(&10));
    assert!(net.manager.is_bad_peer("mallory"));
    assert_eq!(mallory.disconnected(), Some(DisconnectReason::BadPeer));
    assert_eq!(net.node.latest_block_number(), 0);
    assert_eq!(net.metrics.sync.invalid_blocks.get(), 1);

    // an honest peer finishes the same session
    net.connect("alice", &[Capability::Core]);
    let deadline = Instant::now().checked_add(Duration::from_secs(30)).unwrap();
    while net.manager.is_running() && Instant::now() < deadline {
        net.manager.run_download_once();
        net.manager.run_import_once();
        thread::sleep(Duration::from_micros(200));
    }
    assert!(!net.manager.is_running(), "session did not finish");
    assert!(mallory.take_sent().is_empty());
    assert_same_chain(&source, &net.node);
    // the stored block carries the honest votes
    assert_eq!(net.node.get_block(10).unwrap().unwrap().votes.len(), 4);
}

#[test]
fn test_broken_hash_link_never_reaches_chain() {
    init_logging();
    let config = NodeConfig::dev_default();
    let keys = validator_keys(4);
    let genesis = dev_genesis(&keys);
    let source = open_chain(&config, &genesis);
    produce_blocks(&source, &keys, 15);

    let net = SyncNetwork::new(&config, &genesis, source.clone());
    let mut bad = source.get_block(5).unwrap().unwrap();
    bad.header.timestamp = bad.header.timestamp.saturating_add(1);
    net.tamper("mallory", bad);
    let mallory = net.connect("mallory", &[Capability::Core]);
    net.connect("alice", &[Capability::Core]);

    assert!(net.sync(Duration::from_secs(30)), "sync did not finish");
    assert_same_chain(&source, &net.node);

    // mallory is banned exactly when she got to serve #5
    let served_five = net.metrics.sync.invalid_blocks.get() > 0;
    assert_eq!(
        mallory.disconnected().is_some(),
        served_five,
        "disconnect follows the invalid block"
    );
}
