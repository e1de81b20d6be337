//! E2E Test: Ledger Scenarios Replayed by a Syncing Node
//!
//! - Transfers move value and fees and bump the sender nonce
//! - Votes lock stake on a delegate; unvoting more than is locked is left
//!   out of the proposal and changes nothing
//! - Delegate registration burns the fee and claims a name once
//!
//! The source proposes the blocks; the synced node must end in the same
//! state.

use {
    std::time::Duration,
    tessera_block_sync::Capability,
    tessera_chain::{Chain, NodeConfig},
    tessera_e2e_tests::helpers::*,
    tessera_ledger_types::{Address, Amount, TransactionType},
};

const RECIPIENT: Address = Address::from_low_u64(0xbeef);

/// Checks the balances both chains must agree on after the scenario.
fn assert_ledger(chain: &Chain) {
    let sender = chain.get_account(&SENDER).unwrap();
    assert_eq!(sender.available, Amount::from_nano(940));
    assert_eq!(sender.nonce, 1);
    assert_eq!(chain.get_account(&RECIPIENT).unwrap().available, Amount::from_nano(50));

    let voter = chain.get_account(&VOTER).unwrap();
    assert_eq!(voter.available, Amount::from_nano(10));
    assert_eq!(voter.locked, Amount::from_nano(100));
    assert_eq!(voter.nonce, 1);
    assert_eq!(chain.get_vote(&VOTER, &DELEGATE).unwrap(), Amount::from_nano(100));
    let delegate = chain.get_delegate_by_name(DELEGATE_NAME).unwrap().unwrap();
    assert_eq!(delegate.votes, Amount::from_nano(100));

    let registered = chain.get_delegate_by_name("faucet_pool").unwrap().unwrap();
    assert_eq!(registered.address, FAUCET);
    assert_eq!(chain.get_delegates().unwrap().len(), 2);
}

#[test]
fn test_ledger_scenarios_replay_on_synced_node() {
    init_logging();
    let config = NodeConfig::dev_default();
    let keys = validator_keys(4);
    let genesis = dev_genesis(&keys);
    let source = open_chain(&config, &genesis);

    let transfer = transaction(TransactionType::Transfer, SENDER, RECIPIENT, 50, 0);
    let block = produce_block(&source, &keys, &[transfer]);
    assert_eq!(block.transactions.len(), 1);

    let vote = transaction(TransactionType::Vote, VOTER, DELEGATE, 100, 0);
    let block = produce_block(&source, &keys, &[vote]);
    assert_eq!(block.transactions.len(), 1);

    // only 100 is locked
    let voter_before = source.get_account(&VOTER).unwrap();
    let unvote = transaction(TransactionType::Unvote, VOTER, DELEGATE, 150, 1);
    let block = produce_block(&source, &keys, &[unvote]);
    assert!(block.transactions.is_empty());
    assert_eq!(source.get_account(&VOTER).unwrap(), voter_before);

    let faucet_nonce = source.get_account(&FAUCET).unwrap().nonce;
    let register = |nonce| {
        let mut tx = transaction(TransactionType::Delegate, FAUCET, Address::ZERO, 1_000, nonce);
        tx.data = b"faucet_pool".to_vec();
        tx
    };
    let block = produce_block(&source, &keys, &[register(faucet_nonce)]);
    assert_eq!(block.transactions.len(), 1);
    // the name is taken now
    let block = produce_block(&source, &keys, &[register(faucet_nonce.saturating_add(1))]);
    assert!(block.transactions.is_empty());

    produce_blocks(&source, &keys, 5);
    assert_ledger(&source);

    let net = SyncNetwork::new(&config, &genesis, source.clone());
    net.connect("alice", &[Capability::Core]);
    net.connect("bob", &[Capability::Core]);
    assert!(net.sync(Duration::from_secs(30)), "sync did not finish");

    assert_same_chain(&source, &net.node);
    assert_ledger(&net.node);
    assert_eq!(
        net.node.get_account(&FAUCET).unwrap(),
        source.get_account(&FAUCET).unwrap()
    );
    assert_eq!(net.metrics.chain.transactions_executed.get(), 8);
}
